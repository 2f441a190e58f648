use crate::app::ports::{PutRecordReceipt, RecordSink};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// One line of the capture log.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CapturedLine {
    pub stream_name: String,
    pub captured_at: i64,
    /// Base64, same encoding the delivery callback uses for `records[].data`.
    pub data: String,
}

/// Appends captured records to a local NDJSON file, one record per line.
pub struct NdjsonSink {
    path: PathBuf,
    // Serializes appends from concurrent captures
    lock: Mutex<u64>,
}

impl NdjsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(0),
        }
    }

    fn append(&self, line: &CapturedLine) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(line)?)?;
        Ok(())
    }
}

#[async_trait]
impl RecordSink for NdjsonSink {
    async fn put_record(&self, stream_name: &str, data: Vec<u8>) -> Result<PutRecordReceipt, String> {
        let mut written = self.lock.lock().await;
        let line = CapturedLine {
            stream_name: stream_name.to_string(),
            captured_at: Utc::now().timestamp_millis(),
            data: STANDARD.encode(&data),
        };
        self.append(&line).map_err(|e| e.to_string())?;
        *written += 1;
        Ok(PutRecordReceipt {
            record_id: format!("{}:{}", self.path.display(), *written),
            encrypted: None,
        })
    }
}
