use crate::app::ports::{ExecutedResponse, HttpExecutor};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::Request;
use std::time::Duration;

/// Replays requests with reqwest.
///
/// Framing headers are dropped so the client can derive them; `Host` is kept
/// only when it differs from the URL authority.
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: Request<Bytes>) -> Result<ExecutedResponse, String> {
        let (parts, body) = request.into_parts();
        let url = parts.uri.to_string();

        let mut headers = parts.headers;
        let host_is_authority = headers.get(HOST).and_then(|h| h.to_str().ok())
            == parts.uri.authority().map(|a| a.as_str());
        if host_is_authority {
            headers.remove(HOST);
        }
        headers.remove(CONTENT_LENGTH);
        headers.remove(TRANSFER_ENCODING);

        let mut builder = self
            .client
            .request(parts.method, &url)
            .version(parts.version)
            .headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }
        let resp = builder.send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        // Drain so the connection can be reused.
        let _ = resp.bytes().await;
        Ok(ExecutedResponse { status })
    }
}
