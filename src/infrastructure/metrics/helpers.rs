//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DEFAULT_TEMPLATES_SEEDED_TOTAL, DEFAULT_TEMPLATES_SKIPPED_TOTAL, LOCALE_FALLBACKS_TOTAL,
    MIGRATION_PARTIAL_WRITES_TOTAL, STORE_OPERATIONS_TOTAL, STORE_OPERATION_LATENCY,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording backend operation metrics
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a finished backend operation
    pub fn record(backend: &str, operation: &str, success: bool, latency_secs: f64) {
        let outcome = if success { "success" } else { "error" };
        STORE_OPERATIONS_TOTAL
            .with_label_values(&[backend, operation, outcome])
            .inc();
        STORE_OPERATION_LATENCY
            .with_label_values(&[backend, operation])
            .observe(latency_secs);
    }
}

/// Helper struct for facade level metrics
pub struct FacadeMetrics;

impl FacadeMetrics {
    /// Record a lookup answered from the default locale
    pub fn record_locale_fallback(channel: &str) {
        LOCALE_FALLBACKS_TOTAL.with_label_values(&[channel]).inc();
    }

    /// Record default templates added for a tenant
    pub fn record_seeded(channel: &str, count: usize) {
        DEFAULT_TEMPLATES_SEEDED_TOTAL
            .with_label_values(&[channel])
            .inc_by(count as u64);
    }

    /// Record a default template that was already present
    pub fn record_seed_skipped(backend: &str, channel: &str) {
        DEFAULT_TEMPLATES_SKIPPED_TOTAL
            .with_label_values(&[backend, channel])
            .inc();
    }
}

/// Helper struct for migration backend metrics
pub struct MigrationMetrics;

impl MigrationMetrics {
    /// Record a write that reached only the database
    pub fn record_partial_write(operation: &str) {
        MIGRATION_PARTIAL_WRITES_TOTAL
            .with_label_values(&[operation])
            .inc();
    }
}
