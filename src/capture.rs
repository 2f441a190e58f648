//! Canonical wire serialization of an outgoing request.
//!
//! The request line is written in absolute-form so the destination scheme
//! survives the trip through the stream. `Content-Length` is always derived
//! from the buffered body and `Transfer-Encoding` is never emitted.

use crate::error::CaptureError;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{Method, Request, Uri, Version};
use sha2::{Digest, Sha256};

/// Serialize the complete request (request line, headers, body) into wire bytes.
pub fn dump_request(request: &Request<Bytes>) -> Result<Vec<u8>, CaptureError> {
    let uri = request.uri();
    let scheme = uri
        .scheme_str()
        .ok_or_else(|| CaptureError::Serialize(format!("request URI {} has no scheme", uri)))?;
    let authority = uri
        .authority()
        .ok_or_else(|| CaptureError::Serialize(format!("request URI {} has no host", uri)))?;
    // Userinfo never leaves the process.
    let host_port = match authority.port() {
        Some(port) => format!("{}:{}", authority.host(), port.as_str()),
        None => authority.host().to_string(),
    };
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let path = if path.is_empty() { "/" } else { path };

    let body = request.body();
    let mut out = Vec::with_capacity(256 + body.len());

    out.extend_from_slice(request.method().as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(scheme.as_bytes());
    out.extend_from_slice(b"://");
    out.extend_from_slice(host_port.as_bytes());
    out.extend_from_slice(path.as_bytes());
    out.extend_from_slice(match request.version() {
        Version::HTTP_10 => b" HTTP/1.0\r\n",
        _ => b" HTTP/1.1\r\n",
    });

    out.extend_from_slice(b"Host: ");
    match request.headers().get(HOST) {
        Some(host) => out.extend_from_slice(host.as_bytes()),
        None => out.extend_from_slice(host_port.as_bytes()),
    }
    out.extend_from_slice(b"\r\n");

    for (name, value) in request.headers() {
        if name == HOST || name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }

    if !body.is_empty() || expects_body(request.method()) {
        out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);

    Ok(out)
}

fn expects_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Convert a built reqwest request into a buffered `http::Request`.
///
/// Streaming bodies cannot be captured and are reported as serialization errors.
pub fn from_reqwest(request: reqwest::Request) -> Result<Request<Bytes>, CaptureError> {
    let uri: Uri = request
        .url()
        .as_str()
        .parse()
        .map_err(|e| CaptureError::Serialize(format!("invalid URL {}: {}", request.url(), e)))?;

    let body = match request.body() {
        Some(body) => match body.as_bytes() {
            Some(bytes) => Bytes::copy_from_slice(bytes),
            None => {
                return Err(CaptureError::Serialize(
                    "streaming request bodies cannot be captured".to_string(),
                ))
            }
        },
        None => Bytes::new(),
    };

    let mut builder = Request::builder()
        .method(request.method().clone())
        .uri(uri)
        .version(request.version());
    if let Some(headers) = builder.headers_mut() {
        headers.extend(request.headers().clone());
    }
    builder
        .body(body)
        .map_err(|e| CaptureError::Serialize(e.to_string()))
}

/// Short SHA-256 digest used to correlate a payload across capture and replay logs.
pub fn payload_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hex = hex::encode(hasher.finalize());
    hex[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_absolute_form_with_host_and_length() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://example.com/hello?x=1")
            .header("content-type", "text/plain")
            .body(Bytes::from_static(b"hello\n"))
            .unwrap();

        let dump = String::from_utf8(dump_request(&request).unwrap()).unwrap();
        assert_eq!(
            dump,
            "POST http://example.com/hello?x=1 HTTP/1.1\r\n\
             Host: example.com\r\n\
             content-type: text/plain\r\n\
             Content-Length: 6\r\n\
             \r\n\
             hello\n"
        );
    }

    #[test]
    fn get_without_body_has_no_content_length() {
        let request = Request::builder()
            .uri("https://example.com")
            .body(Bytes::new())
            .unwrap();
        let dump = String::from_utf8(dump_request(&request).unwrap()).unwrap();
        assert_eq!(dump, "GET https://example.com/ HTTP/1.1\r\nHost: example.com\r\n\r\n");
    }

    #[test]
    fn transfer_encoding_is_replaced_by_length() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("http://example.com/upload")
            .header("transfer-encoding", "chunked")
            .header("content-length", "999")
            .body(Bytes::from_static(b"abc"))
            .unwrap();
        let dump = String::from_utf8(dump_request(&request).unwrap()).unwrap();
        assert!(!dump.contains("transfer-encoding"));
        assert!(!dump.contains("999"));
        assert!(dump.contains("Content-Length: 3\r\n"));
    }

    #[test]
    fn userinfo_is_stripped_from_request_line_and_host() {
        let request = Request::builder()
            .uri("http://user:pw@example.com:8080/private")
            .body(Bytes::new())
            .unwrap();

        let dump = String::from_utf8(dump_request(&request).unwrap()).unwrap();
        assert!(dump.starts_with("GET http://example.com:8080/private HTTP/1.1\r\n"), "{}", dump);
        assert!(dump.contains("Host: example.com:8080\r\n"));
        assert!(!dump.contains("pw"));
    }

    #[test]
    fn relative_uri_is_a_serialization_error() {
        let request = Request::builder().uri("/only-a-path").body(Bytes::new()).unwrap();
        assert!(matches!(dump_request(&request), Err(CaptureError::Serialize(_))));
    }

    #[test]
    fn converts_reqwest_request() {
        let client = reqwest::Client::new();
        let request = client
            .post("http://example.com/hello")
            .header("x-trace", "1")
            .body("hello")
            .build()
            .unwrap();

        let converted = from_reqwest(request).unwrap();
        assert_eq!(converted.method(), Method::POST);
        assert_eq!(converted.uri(), "http://example.com/hello");
        assert_eq!(converted.headers()["x-trace"], "1");
        assert_eq!(converted.body().as_ref(), b"hello");
    }

    #[test]
    fn digest_is_stable_and_short() {
        assert_eq!(payload_digest(b"abc"), "ba7816bf8f01");
        assert_eq!(payload_digest(b"abc").len(), 12);
    }
}
