//! Prometheus metrics for the template store.
//!
//! - Backend operation counts and latency, labelled by backend and operation
//! - Locale fallbacks per channel
//! - Default template seeding per channel
//! - Partial writes of the migration backend

mod helpers;

pub use helpers::{encode_metrics, FacadeMetrics, MigrationMetrics, StoreMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_template_store";

lazy_static! {
    // ============================================================================
    // Backend Metrics
    // ============================================================================

    /// Backend operations by outcome
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_operations_total", METRIC_PREFIX),
        "Total template store operations",
        &["backend", "operation", "outcome"]
    ).unwrap();

    /// Backend operation latency
    pub static ref STORE_OPERATION_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_operation_latency_seconds", METRIC_PREFIX),
        "Template store operation latency in seconds",
        &["backend", "operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Facade Metrics
    // ============================================================================

    /// Lookups served from the channel default locale
    pub static ref LOCALE_FALLBACKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_locale_fallbacks_total", METRIC_PREFIX),
        "Total template lookups that fell back to the default locale",
        &["channel"]
    ).unwrap();

    /// Default templates written while seeding a tenant
    pub static ref DEFAULT_TEMPLATES_SEEDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_default_templates_seeded_total", METRIC_PREFIX),
        "Total default templates added while seeding tenants",
        &["channel"]
    ).unwrap();

    /// Default templates skipped because they already existed
    pub static ref DEFAULT_TEMPLATES_SKIPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_default_templates_skipped_total", METRIC_PREFIX),
        "Total default templates skipped because they already existed",
        &["backend", "channel"]
    ).unwrap();

    // ============================================================================
    // Migration Metrics
    // ============================================================================

    /// Writes applied to the database but not replicated to the registry
    pub static ref MIGRATION_PARTIAL_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_migration_partial_writes_total", METRIC_PREFIX),
        "Total writes that reached the database but failed on the registry",
        &["operation"]
    ).unwrap();
}
