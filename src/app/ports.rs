use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, StatusCode};

/// Buffered-stream submission: one opaque payload per call, addressed by stream name.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn put_record(&self, stream_name: &str, data: Vec<u8>) -> Result<PutRecordReceipt, String>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutRecordReceipt {
    pub record_id: String,
    pub encrypted: Option<bool>,
}

/// The real network call used when a captured request is replayed.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: Request<Bytes>) -> Result<ExecutedResponse, String>;
}

#[derive(Clone, Debug)]
pub struct ExecutedResponse {
    pub status: StatusCode,
}
