use crate::app::ports::{PutRecordReceipt, RecordSink};
use async_trait::async_trait;
use aws_sdk_firehose::error::DisplayErrorContext;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;

/// Submits captured requests with Firehose `PutRecord`.
///
/// Batching, retries and delivery to the HTTP endpoint are the stream's job.
#[derive(Clone)]
pub struct FirehoseSink {
    client: aws_sdk_firehose::Client,
}

impl FirehoseSink {
    /// Build a client from the default AWS credential chain.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self::new(aws_sdk_firehose::Client::new(&sdk_config))
    }

    pub fn new(client: aws_sdk_firehose::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSink for FirehoseSink {
    async fn put_record(&self, stream_name: &str, data: Vec<u8>) -> Result<PutRecordReceipt, String> {
        let record = Record::builder()
            .data(Blob::new(data))
            .build()
            .map_err(|e| e.to_string())?;

        let output = self
            .client
            .put_record()
            .delivery_stream_name(stream_name)
            .record(record)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(&e).to_string())?;

        Ok(PutRecordReceipt {
            record_id: output.record_id().to_string(),
            encrypted: output.encrypted(),
        })
    }
}
