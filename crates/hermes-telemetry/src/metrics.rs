//! Metrics recorded by Hermes pipelines.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! the host process installs a recorder.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_requests_total` | Counter | `operation`, `status` | Requests through a pipeline |
//! | `hermes_request_duration_seconds` | Histogram | `operation` | Pipeline latency |
//! | `hermes_errors_total` | Counter | `operation`, `code` | Errors seen by the reporting stage |
//! | `hermes_negotiated_total` | Counter | `mime` | Response types chosen by negotiation |
//! | `hermes_auth_outcomes_total` | Counter | `stage`, `outcome` | Claims/user/scopes extraction outcomes |
//! | `hermes_scope_denials_total` | Counter | `operation` | Requests rejected by the scope guard |

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Registers descriptions for all Hermes metrics with the installed recorder.
pub fn describe_metrics() {
    describe_counter!("hermes_requests_total", "Requests processed by a pipeline");
    describe_histogram!(
        "hermes_request_duration_seconds",
        "Pipeline processing time in seconds"
    );
    describe_counter!("hermes_errors_total", "Errors observed by the reporting stage");
    describe_counter!("hermes_negotiated_total", "Response media types chosen");
    describe_counter!(
        "hermes_auth_outcomes_total",
        "Authentication extraction outcomes by stage"
    );
    describe_counter!(
        "hermes_scope_denials_total",
        "Requests rejected for missing scopes"
    );
}

/// Records a completed request.
pub fn record_request(operation: &str, status_code: u16, duration: Duration) {
    counter!(
        "hermes_requests_total",
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "hermes_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records an error seen by the reporting stage.
pub fn record_error(operation: &str, code: &'static str) {
    counter!(
        "hermes_errors_total",
        "operation" => operation.to_string(),
        "code" => code
    )
    .increment(1);
}

/// Records the response type negotiation chose.
pub fn record_negotiated(mime: &str) {
    counter!("hermes_negotiated_total", "mime" => mime.to_string()).increment(1);
}

/// Records an authentication extraction outcome.
pub fn record_auth_outcome(stage: &'static str, outcome: &'static str) {
    counter!(
        "hermes_auth_outcomes_total",
        "stage" => stage,
        "outcome" => outcome
    )
    .increment(1);
}

/// Records a scope-guard rejection.
pub fn record_scope_denial(operation: &str) {
    counter!(
        "hermes_scope_denials_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
