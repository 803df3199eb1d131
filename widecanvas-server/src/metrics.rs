//! Prometheus metrics for widecanvas-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const LINK_SAVES_TOTAL: &str = "widecanvas_link_saves_total";
const LINK_RESOLUTIONS_TOTAL: &str = "widecanvas_link_resolutions_total";
const CONVERSIONS_TOTAL: &str = "widecanvas_conversions_total";
const VALIDATION_FAILURES_TOTAL: &str = "widecanvas_validation_failures_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a link update.
pub fn record_link_save(success: bool) {
    counter!(LINK_SAVES_TOTAL, "success" => success.to_string()).increment(1);
}

/// Record a public page lookup.
///
/// # Arguments
///
/// * `route` - "link" or "app"
/// * `found` - Whether a record was served
pub fn record_link_resolution(route: &'static str, found: bool) {
    let outcome = if found { "found" } else { "not_found" };
    counter!(
        LINK_RESOLUTIONS_TOTAL,
        "route" => route,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a conversion request.
///
/// # Arguments
///
/// * `framework` - Target framework identifier
/// * `success` - Whether the upstream produced code
pub fn record_conversion(framework: &str, success: bool) {
    counter!(
        CONVERSIONS_TOTAL,
        "framework" => framework.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (preview_id, app_name, html, etc.)
pub fn record_validation_failure(validation_type: &'static str) {
    counter!(VALIDATION_FAILURES_TOTAL, "type" => validation_type).increment(1);
}
