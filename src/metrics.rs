//! Relay metrics
//!
//! Counters for both halves of the relay. Without an installed recorder every
//! call below is a no-op, so library code can record unconditionally.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once and return a handle for in-process rendering.
pub fn install_recorder() -> Option<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_all();
            info!("Prometheus recorder installed");
            Some(HANDLE.get_or_init(|| handle).clone())
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

fn describe_all() {
    ::metrics::describe_counter!(
        "relay_capture_submitted_total",
        "Captured requests accepted by the stream"
    );
    ::metrics::describe_counter!(
        "relay_capture_failed_total",
        "Captured requests that failed to serialize or submit"
    );
    ::metrics::describe_histogram!(
        "relay_capture_payload_bytes",
        "Size of captured request payloads"
    );
    ::metrics::describe_counter!(
        "relay_delivery_batches_total",
        "Delivery callbacks that reached record replay"
    );
    ::metrics::describe_histogram!(
        "relay_delivery_batch_records",
        "Records per delivery batch"
    );
    ::metrics::describe_counter!(
        "relay_delivery_rejected_total",
        "Delivery callbacks rejected before replay"
    );
    ::metrics::describe_counter!("relay_records_replayed_total", "Records replayed successfully");
    ::metrics::describe_counter!("relay_records_skipped_total", "Malformed records skipped");
    ::metrics::describe_counter!("relay_replay_failed_total", "Batches stopped by a replay failure");
}

pub mod capture {
    pub fn submitted(payload_bytes: usize) {
        ::metrics::counter!("relay_capture_submitted_total").increment(1);
        ::metrics::histogram!("relay_capture_payload_bytes").record(payload_bytes as f64);
    }

    pub fn failed() {
        ::metrics::counter!("relay_capture_failed_total").increment(1);
    }
}

pub mod delivery {
    pub fn batch_received(records: usize) {
        ::metrics::counter!("relay_delivery_batches_total").increment(1);
        ::metrics::histogram!("relay_delivery_batch_records").record(records as f64);
    }

    pub fn rejected(reason: &'static str) {
        ::metrics::counter!("relay_delivery_rejected_total", "reason" => reason).increment(1);
    }

    pub fn record_replayed() {
        ::metrics::counter!("relay_records_replayed_total").increment(1);
    }

    pub fn record_skipped() {
        ::metrics::counter!("relay_records_skipped_total").increment(1);
    }

    pub fn replay_failed() {
        ::metrics::counter!("relay_replay_failed_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NameRecorder {
        described: Mutex<BTreeSet<String>>,
        registered: Mutex<BTreeSet<String>>,
    }

    impl NameRecorder {
        fn describe(&self, key: KeyName) {
            self.described.lock().unwrap().insert(key.as_str().to_string());
        }

        fn register(&self, key: &Key) {
            self.registered.lock().unwrap().insert(key.name().to_string());
        }
    }

    impl Recorder for NameRecorder {
        fn describe_counter(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.describe(key);
        }

        fn describe_gauge(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.describe(key);
        }

        fn describe_histogram(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.describe(key);
        }

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.register(key);
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            self.register(key);
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.register(key);
            Histogram::noop()
        }
    }

    #[test]
    fn every_recorded_metric_is_described() {
        let recorder = NameRecorder::default();
        ::metrics::with_local_recorder(&recorder, || {
            describe_all();
            capture::submitted(10);
            capture::failed();
            delivery::batch_received(3);
            delivery::rejected("method");
            delivery::record_replayed();
            delivery::record_skipped();
            delivery::replay_failed();
        });

        let described = recorder.described.lock().unwrap();
        let registered = recorder.registered.lock().unwrap();
        assert!(registered.contains("relay_delivery_batch_records"));
        let missing: Vec<_> = registered.difference(&described).collect();
        assert!(missing.is_empty(), "undescribed metrics: {:?}", missing);
    }
}
