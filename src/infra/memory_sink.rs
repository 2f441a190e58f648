use crate::app::ports::{PutRecordReceipt, RecordSink};
use crate::envelope::{now_millis, DeliveryRequest, Record};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct BufferedRecord {
    pub stream_name: String,
    pub data: Vec<u8>,
}

/// In-memory stream for development/testing.
///
/// `drain_batch` plays the part of the stream flushing a buffer to the
/// delivery endpoint.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<BufferedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<BufferedRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Remove every buffered record for `stream_name` and wrap them in a delivery request.
    pub fn drain_batch(&self, stream_name: &str, request_id: &str) -> DeliveryRequest {
        let mut drained = Vec::new();
        if let Ok(mut records) = self.records.lock() {
            let (matching, rest): (Vec<_>, Vec<_>) = records
                .drain(..)
                .partition(|r| r.stream_name == stream_name);
            *records = rest;
            drained = matching.into_iter().map(|r| Record::new(r.data)).collect();
        }
        DeliveryRequest {
            request_id: request_id.to_string(),
            timestamp: now_millis(),
            records: drained,
        }
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn put_record(&self, stream_name: &str, data: Vec<u8>) -> Result<PutRecordReceipt, String> {
        let mut records = self.records.lock().map_err(|e| e.to_string())?;
        records.push(BufferedRecord {
            stream_name: stream_name.to_string(),
            data,
        });
        Ok(PutRecordReceipt {
            record_id: format!("memory-{}", records.len()),
            encrypted: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_only_takes_the_named_stream() {
        let sink = MemorySink::new();
        sink.put_record("a", b"one".to_vec()).await.unwrap();
        sink.put_record("b", b"two".to_vec()).await.unwrap();
        sink.put_record("a", b"three".to_vec()).await.unwrap();

        let batch = sink.drain_batch("a", "batch-1");
        assert_eq!(batch.request_id, "batch-1");
        assert_eq!(batch.records, vec![Record::new(b"one".to_vec()), Record::new(b"three".to_vec())]);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].stream_name, "b");
    }
}
