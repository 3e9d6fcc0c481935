//! API request accounting
//!
//! Every outbound cloud call is counted once, and failed calls once more,
//! labelled by provider and service. The recorder is built once by the
//! process and handed to the clients; nothing here reads global state
//! other than the `metrics` recorder that the binary installs.

use metrics::{counter, describe_counter};

pub const API_REQUESTS_TOTAL: &str = "osmachine_api_requests_total";
pub const API_FAILED_REQUESTS_TOTAL: &str = "osmachine_api_failed_requests_total";

/// Sink for per-call request/failure counts
pub trait ApiRecorder: Send + Sync {
    fn record_request(&self, provider: &str, service: &str);

    fn record_failure(&self, provider: &str, service: &str);
}

/// Recorder backed by the `metrics` facade
#[derive(Debug)]
pub struct MetricsRecorder {
    _private: (),
}

impl MetricsRecorder {
    pub fn new() -> Self {
        describe_counter!(API_REQUESTS_TOTAL, "Total number of cloud API requests");
        describe_counter!(
            API_FAILED_REQUESTS_TOTAL,
            "Total number of failed cloud API requests"
        );
        Self { _private: () }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRecorder for MetricsRecorder {
    fn record_request(&self, provider: &str, service: &str) {
        counter!(
            API_REQUESTS_TOTAL,
            "provider" => provider.to_string(),
            "service" => service.to_string()
        )
        .increment(1);
    }

    fn record_failure(&self, provider: &str, service: &str) {
        counter!(
            API_FAILED_REQUESTS_TOTAL,
            "provider" => provider.to_string(),
            "service" => service.to_string()
        )
        .increment(1);
    }
}

/// Recorder that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl ApiRecorder for NoopRecorder {
    fn record_request(&self, _provider: &str, _service: &str) {}

    fn record_failure(&self, _provider: &str, _service: &str) {}
}
