//! Metrics collection and Prometheus export.
//!
//! Installs the Prometheus recorder and renders it for the /metrics endpoint.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    // A concurrent initializer may have won; its handle is equivalent.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// Count one record operation by name and outcome
/// (`ok`, `not_found`, `conflict`, `unavailable`, `error`).
pub fn record_operation(operation: &'static str, outcome: &'static str) {
    counter!(
        "record_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
