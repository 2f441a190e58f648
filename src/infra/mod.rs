#[cfg(feature = "firehose")]
pub mod firehose_sink;
pub mod http_executor;
pub mod memory_sink;
pub mod ndjson_sink;

#[cfg(feature = "firehose")]
pub use firehose_sink::FirehoseSink;
pub use http_executor::ReqwestExecutor;
pub use memory_sink::MemorySink;
pub use ndjson_sink::NdjsonSink;
