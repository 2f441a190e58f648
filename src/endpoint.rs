//! Delivery endpoint core: authenticate, decode, replay and report.
//!
//! `DeliveryEndpoint::handle` maps one callback invocation to an HTTP status
//! and a response envelope without touching the network itself; the actual
//! request execution goes through the injected `HttpExecutor` and the write
//! happens in `server`.

use crate::app::ports::HttpExecutor;
use crate::capture::payload_digest;
use crate::config::{CredentialPolicy, EndpointConfig};
use crate::constants::*;
use crate::envelope::{CommonAttributes, DeliveryBatch, DeliveryRequest, DeliveryResponse, ResponseBuilder};
use crate::error::ReplayError;
use crate::record::parse_request;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One incoming callback, as seen by the core.
#[derive(Debug, Clone)]
pub struct DeliveryCall {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub status: StatusCode,
    pub response: DeliveryResponse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub replayed: usize,
    pub skipped: usize,
}

/// Terminal failure detected before any record is replayed.
#[derive(Debug)]
struct Rejection {
    status: StatusCode,
    reason: &'static str,
    message: String,
}

pub struct DeliveryEndpoint {
    executor: Arc<dyn HttpExecutor>,
    access_key: String,
    policy: CredentialPolicy,
    default_scheme: String,
    max_body_bytes: Option<usize>,
}

impl DeliveryEndpoint {
    pub fn new(executor: Arc<dyn HttpExecutor>, config: &EndpointConfig) -> Self {
        Self {
            executor,
            access_key: config.access_key.clone(),
            policy: config.credential_policy,
            default_scheme: config.default_scheme.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn credential_policy(&self) -> CredentialPolicy {
        self.policy
    }

    pub fn max_body_bytes(&self) -> Option<usize> {
        self.max_body_bytes
    }

    pub async fn handle(&self, call: DeliveryCall) -> DeliveryOutcome {
        let request_id = header_str(&call.headers, REQUEST_ID_HEADER).unwrap_or_default();
        let mut builder = ResponseBuilder::new(request_id);

        let status = match self.process(&call, &mut builder).await {
            Ok(summary) => {
                debug!(replayed = summary.replayed, skipped = summary.skipped, "Batch processed");
                StatusCode::OK
            }
            Err(rejection) => {
                crate::metrics::delivery::rejected(rejection.reason);
                builder.fail(rejection.message);
                rejection.status
            }
        };

        // Single finalize step for every exit path.
        let response = builder.finish();
        if !response.error_message.is_empty() {
            error!(
                request_id = %response.request_id,
                status = status.as_u16(),
                "error:{}",
                response.error_message
            );
        }
        DeliveryOutcome { status, response }
    }

    async fn process(&self, call: &DeliveryCall, builder: &mut ResponseBuilder) -> Result<ReplaySummary, Rejection> {
        if call.method != Method::POST {
            return Err(Rejection {
                status: StatusCode::METHOD_NOT_ALLOWED,
                reason: "method",
                message: POST_REQUIRED_MESSAGE.to_string(),
            });
        }
        if !self.authenticate(&call.headers) {
            return Err(Rejection {
                status: StatusCode::BAD_REQUEST,
                reason: "access_key",
                message: INVALID_ACCESS_KEY_MESSAGE.to_string(),
            });
        }

        let batch = decode_batch(call)?;
        crate::metrics::delivery::batch_received(batch.request.records.len());
        if !batch.metadata.is_empty() {
            debug!(request_id = %batch.request.request_id, metadata = ?batch.metadata, "Common attributes");
        }

        match self.replay(&batch).await {
            Ok(summary) => Ok(summary),
            Err((summary, e)) => {
                crate::metrics::delivery::replay_failed();
                builder.fail(e.to_string());
                Ok(summary)
            }
        }
    }

    fn authenticate(&self, headers: &HeaderMap) -> bool {
        let supplied = header_str(headers, ACCESS_KEY_HEADER).unwrap_or_default();
        !self.policy.rejects(&self.access_key, &supplied)
    }

    /// Replay records in order. Malformed records are skipped; the first real
    /// delivery failure stops the batch.
    pub async fn replay(&self, batch: &DeliveryBatch) -> Result<ReplaySummary, (ReplaySummary, ReplayError)> {
        let mut summary = ReplaySummary::default();

        for (index, record) in batch.request.records.iter().enumerate() {
            let digest = payload_digest(&record.data);
            let request = match parse_request(&record.data, &self.default_scheme) {
                Ok(request) => request,
                Err(e) => {
                    warn!(index, payload_digest = %digest, error = %e, "failed to read request. skip");
                    crate::metrics::delivery::record_skipped();
                    summary.skipped += 1;
                    continue;
                }
            };

            let url = request.uri().to_string();
            let response = match self.executor.execute(request).await {
                Ok(response) => response,
                Err(e) => return Err((summary, ReplayError::Execute(e))),
            };
            let status = response.status.as_u16();
            if status >= 400 {
                return Err((summary, ReplayError::Status { url, status }));
            }

            info!(index, payload_digest = %digest, url = %url, status, "succeeded request");
            crate::metrics::delivery::record_replayed();
            summary.replayed += 1;
        }

        Ok(summary)
    }
}

fn decode_batch(call: &DeliveryCall) -> Result<DeliveryBatch, Rejection> {
    let request: DeliveryRequest = serde_json::from_slice(&call.body).map_err(|e| Rejection {
        status: StatusCode::BAD_REQUEST,
        reason: "body",
        message: format!("failed to decode request body: {}", e),
    })?;

    let metadata = match header_str(&call.headers, COMMON_ATTRIBUTES_HEADER) {
        Some(value) => match CommonAttributes::from_header(&value) {
            Ok(attrs) => attrs.common_attributes,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed common attributes header");
                Default::default()
            }
        },
        None => Default::default(),
    };

    Ok(DeliveryBatch { request, metadata })
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
