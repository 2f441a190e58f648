//! Reconstructs a live request from captured wire bytes.

use crate::error::RecordError;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{Method, Request, Uri, Version};

const MAX_HEADERS: usize = 128;

/// Parse a raw HTTP/1.x request into a request addressed at its original destination.
///
/// Absolute-form targets are used as-is; origin-form targets are resolved
/// against the `Host` header using `default_scheme`.
pub fn parse_request(data: &[u8], default_scheme: &str) -> Result<Request<Bytes>, RecordError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);
    let head_len = match parsed.parse(data) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Err(RecordError::Incomplete),
        Err(e) => return Err(RecordError::Head(e.to_string())),
    };

    let method = parsed
        .method
        .ok_or(RecordError::Incomplete)
        .and_then(|m| Method::from_bytes(m.as_bytes()).map_err(|e| RecordError::Head(e.to_string())))?;
    let target = parsed.path.ok_or(RecordError::Incomplete)?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut builder = Request::builder().method(method).version(version);
    let mut host = None;
    let mut content_length = None;
    let mut chunked = false;
    for header in parsed.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|_| RecordError::Header(header.name.to_string()))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|_| RecordError::Header(header.name.to_string()))?;

        if name == HOST {
            host = value.to_str().ok().map(str::to_string);
        } else if name == CONTENT_LENGTH {
            let len = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| RecordError::Header(header.name.to_string()))?;
            content_length = Some(len);
        } else if name == TRANSFER_ENCODING {
            chunked = value
                .to_str()
                .map(|v| v.to_ascii_lowercase().contains("chunked"))
                .unwrap_or(false);
        }
        builder = builder.header(name, value);
    }

    let uri = resolve_target(target, host.as_deref(), default_scheme)?;
    let rest = &data[head_len..];
    let body = if chunked {
        decode_chunked(rest)?
    } else {
        match content_length {
            Some(expected) if rest.len() < expected => {
                return Err(RecordError::Truncated {
                    expected,
                    actual: rest.len(),
                })
            }
            Some(expected) => Bytes::copy_from_slice(&rest[..expected]),
            None => Bytes::copy_from_slice(rest),
        }
    };

    builder
        .uri(uri)
        .body(body)
        .map_err(|e| RecordError::Head(e.to_string()))
}

fn resolve_target(target: &str, host: Option<&str>, default_scheme: &str) -> Result<Uri, RecordError> {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target
            .parse::<Uri>()
            .map_err(|_| RecordError::Target(target.to_string()));
    }
    if !target.starts_with('/') {
        return Err(RecordError::Target(target.to_string()));
    }
    let host = host
        .filter(|h| !h.is_empty())
        .ok_or_else(|| RecordError::MissingHost(target.to_string()))?;
    format!("{}://{}{}", default_scheme, host, target)
        .parse::<Uri>()
        .map_err(|_| RecordError::Target(target.to_string()))
}

fn decode_chunked(mut rest: &[u8]) -> Result<Bytes, RecordError> {
    let mut body = Vec::new();
    loop {
        let (size, consumed) = match httparse::parse_chunk_size(rest) {
            Ok(httparse::Status::Complete((consumed, size))) => {
                let size = usize::try_from(size)
                    .map_err(|_| RecordError::Chunked("chunk size out of range".to_string()))?;
                (size, consumed)
            }
            Ok(httparse::Status::Partial) => {
                return Err(RecordError::Chunked("incomplete chunk size".to_string()))
            }
            Err(_) => return Err(RecordError::Chunked("invalid chunk size".to_string())),
        };
        rest = &rest[consumed..];
        if size == 0 {
            // Trailers, if any, are dropped.
            return Ok(Bytes::from(body));
        }
        let end = size
            .checked_add(2)
            .filter(|end| *end <= rest.len())
            .ok_or_else(|| RecordError::Chunked("chunk shorter than declared".to_string()))?;
        if &rest[size..end] != b"\r\n" {
            return Err(RecordError::Chunked("chunk not terminated by CRLF".to_string()));
        }
        body.extend_from_slice(&rest[..size]);
        rest = &rest[end..];
    }
}
