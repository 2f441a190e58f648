//! Envelopes exchanged with the Firehose HTTP endpoint delivery callback.
//!
//! See the JSON schemas under `schemas/` for the wire shape.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// One buffered record: the captured request bytes, base64 on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Record {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// Body of a single delivery callback invocation.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// Value of the common-attributes header; metadata attached once per invocation.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommonAttributes {
    #[serde(default)]
    pub common_attributes: HashMap<String, String>,
}

impl CommonAttributes {
    pub fn from_header(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

/// A decoded batch: the request body plus the per-invocation metadata.
#[derive(Debug, Clone, Default)]
pub struct DeliveryBatch {
    pub request: DeliveryRequest,
    pub metadata: HashMap<String, String>,
}

/// Reply to a single delivery callback invocation.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub request_id: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        self.error_message.is_empty()
    }
}

/// Accumulates the response along every branch of a callback; `finish` stamps it.
#[derive(Debug)]
pub struct ResponseBuilder {
    request_id: String,
    error_message: String,
}

impl ResponseBuilder {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            error_message: String::new(),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = message.into();
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn finish(self) -> DeliveryResponse {
        DeliveryResponse {
            request_id: self.request_id,
            timestamp: now_millis(),
            error_message: self.error_message,
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
