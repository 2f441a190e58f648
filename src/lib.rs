//! Capture outgoing HTTP requests into a buffered stream and replay them later.
//!
//! The capture side (`transport`) serializes a request to wire bytes, hands them
//! to a `RecordSink` and answers immediately with a synthetic `202`. The
//! delivery side (`endpoint` + `server`) is the stream's HTTP callback: it
//! decodes each batch and replays the records against their destinations.

pub mod app;
pub mod capture;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod record;
pub mod server;
pub mod transport;

pub use endpoint::{DeliveryCall, DeliveryEndpoint, DeliveryOutcome};
pub use transport::CaptureTransport;
