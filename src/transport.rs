use crate::app::ports::RecordSink;
use crate::capture::{dump_request, payload_digest};
use crate::config::TransportConfig;
use crate::error::{CaptureError, DeliveryError};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response, StatusCode, Version};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Outbound transport that buffers requests into a stream instead of sending them.
///
/// `execute` answers with a synthetic `202 Accepted` as soon as the stream has
/// taken the payload; the destination only sees the request when it is replayed.
#[derive(Clone)]
pub struct CaptureTransport {
    sink: Arc<dyn RecordSink>,
    stream_name: String,
    debug: bool,
}

impl CaptureTransport {
    pub fn new(sink: Arc<dyn RecordSink>, config: &TransportConfig) -> Self {
        Self {
            sink,
            stream_name: config.stream_name.clone(),
            debug: config.debug,
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, DeliveryError> {
        let version = request.version();
        match self.submit(&request).await {
            Ok(()) => Ok(synthetic_response(StatusCode::ACCEPTED, version)),
            Err(source) => {
                warn!(stream = %self.stream_name, uri = %request.uri(), error = %source, "Capture failed");
                crate::metrics::capture::failed();
                Err(DeliveryError {
                    source,
                    response: synthetic_response(StatusCode::INTERNAL_SERVER_ERROR, version),
                })
            }
        }
    }

    async fn submit(&self, request: &Request<Bytes>) -> Result<(), CaptureError> {
        let dump = dump_request(request)?;
        let digest = payload_digest(&dump);
        let size = dump.len();
        if self.debug {
            debug!(payload_digest = %digest, "request dump\n{}", String::from_utf8_lossy(&dump));
        }

        let receipt = self
            .sink
            .put_record(&self.stream_name, dump)
            .await
            .map_err(|message| CaptureError::Submit {
                stream: self.stream_name.clone(),
                message,
            })?;
        if self.debug {
            debug!(
                stream = %self.stream_name,
                record_id = %receipt.record_id,
                encrypted = ?receipt.encrypted,
                payload_digest = %digest,
                "put record output"
            );
        }
        crate::metrics::capture::submitted(size);
        Ok(())
    }
}

fn synthetic_response(status: StatusCode, version: Version) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    *response.version_mut() = version;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

impl tower::Service<Request<Bytes>> for CaptureTransport {
    type Response = Response<Bytes>;
    type Error = DeliveryError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Bytes>, DeliveryError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::PutRecordReceipt;
    use async_trait::async_trait;
    use http::Method;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    struct MockSink {
        fail_with: Option<String>,
        records: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl MockSink {
        fn accepting() -> Self {
            Self {
                fail_with: None,
                records: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                records: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RecordSink for MockSink {
        async fn put_record(&self, stream_name: &str, data: Vec<u8>) -> Result<PutRecordReceipt, String> {
            if let Some(message) = &self.fail_with {
                return Err(message.clone());
            }
            self.records.lock().await.push((stream_name.to_string(), data));
            Ok(PutRecordReceipt {
                record_id: "rec-1".to_string(),
                encrypted: Some(false),
            })
        }
    }

    fn config() -> TransportConfig {
        TransportConfig {
            stream_name: "http-out".to_string(),
            region: None,
            debug: true,
        }
    }

    fn hello_request() -> Request<Bytes> {
        Request::builder()
            .method(Method::POST)
            .uri("http://example.com/hello")
            .version(Version::HTTP_10)
            .body(Bytes::from_static(b"hello\n"))
            .unwrap()
    }

    #[tokio::test]
    async fn accepted_response_echoes_version_and_submits_dump() {
        let sink = Arc::new(MockSink::accepting());
        let transport = CaptureTransport::new(sink.clone(), &config());

        let response = transport.execute(hello_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.version(), Version::HTTP_10);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");

        let records = sink.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "http-out");
        assert!(records[0].1.starts_with(b"POST http://example.com/hello HTTP/1.0\r\n"));
        assert!(records[0].1.ends_with(b"\r\n\r\nhello\n"));
    }

    #[tokio::test]
    async fn submit_failure_downgrades_to_server_error() {
        let transport = CaptureTransport::new(Arc::new(MockSink::failing("throttled")), &config());

        let err = transport.execute(hello_request()).await.unwrap_err();
        assert!(matches!(err.source, CaptureError::Submit { ref message, .. } if message == "throttled"));
        assert_eq!(err.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response.version(), Version::HTTP_10);
    }

    #[tokio::test]
    async fn serialization_failure_never_reaches_the_sink() {
        let sink = Arc::new(MockSink::accepting());
        let transport = CaptureTransport::new(sink.clone(), &config());
        let request = Request::builder().uri("/relative").body(Bytes::new()).unwrap();

        let err = transport.execute(request).await.unwrap_err();
        assert!(matches!(err.source, CaptureError::Serialize(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(sink.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn works_as_a_tower_service() {
        let sink = Arc::new(MockSink::accepting());
        let transport = CaptureTransport::new(sink.clone(), &config());

        let response = transport.oneshot(hello_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(sink.records.lock().await.len(), 1);
    }
}
