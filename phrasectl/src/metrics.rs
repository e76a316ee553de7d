//! Transformer metrics.
//!
//! Recorded through the [`metrics`] facade. When `enable_metrics` is set, the recorder installed
//! by `axum-prometheus` picks them up and `/internal/metrics` renders them next to the HTTP
//! metrics; otherwise the calls are no-ops.

use std::time::Duration;

use crate::transformer::ToolFailure;

pub const TRANSFORMS_TOTAL: &str = "phrasectl_transforms_total";
pub const TRANSFORM_DURATION_SECONDS: &str = "phrasectl_transform_duration_seconds";

/// Outcome label for a finished invocation.
pub fn outcome_label<T>(result: &Result<T, ToolFailure>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(failure) => failure.kind(),
    }
}

/// Count one invocation of `transformer` and record how long it took.
pub fn record_transform(transformer: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(TRANSFORMS_TOTAL, "transformer" => transformer, "outcome" => outcome).increment(1);
    metrics::histogram!(TRANSFORM_DURATION_SECONDS, "transformer" => transformer).record(elapsed.as_secs_f64());
}
