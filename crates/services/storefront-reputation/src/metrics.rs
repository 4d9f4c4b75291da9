use prometheus::{register_histogram, register_int_counter, register_int_counter_vec, opts};
use prometheus::{Histogram, IntCounter, IntCounterVec};
use lazy_static::lazy_static;
use storefront_types::SourceKind;

lazy_static! {
    pub static ref SOURCE_ATTEMPTS_TOTAL: IntCounterVec =
        register_int_counter_vec!(
            opts!("storefront_reputation_source_attempts_total", "Attempts made against each reputation source"),
            &["source"]
        ).unwrap();

    pub static ref SOURCE_FAILURES_TOTAL: IntCounterVec =
        register_int_counter_vec!(
            opts!("storefront_reputation_source_failures_total", "Source attempts that failed or returned unusable data"),
            &["source", "reason"]
        ).unwrap();

    pub static ref RESOLUTIONS_TOTAL: IntCounterVec =
        register_int_counter_vec!(
            opts!("storefront_reputation_resolutions_total", "Completed resolutions by resulting provenance"),
            &["source_kind"]
        ).unwrap();

    pub static ref STATIC_FALLBACK_TOTAL: IntCounter =
        register_int_counter!(
            opts!("storefront_reputation_static_fallback_total", "Resolutions where every source failed")
        ).unwrap();

    pub static ref RESOLUTION_DURATION_SECONDS: Histogram =
        register_histogram!(
            "storefront_reputation_resolution_duration_seconds",
            "Time taken by one pass over the fallback chain",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0]
        ).unwrap();

    pub static ref POLL_TICKS_SKIPPED_TOTAL: IntCounter =
        register_int_counter!(
            opts!("storefront_reputation_poll_ticks_skipped_total", "Refresh ticks skipped because a resolution was still in flight")
        ).unwrap();

    pub static ref SDK_SCRIPT_LOADS_TOTAL: IntCounter =
        register_int_counter!(
            opts!("storefront_reputation_sdk_script_loads_total", "SDK script injections performed")
        ).unwrap();
}

pub fn record_source_attempt(kind: SourceKind) {
    SOURCE_ATTEMPTS_TOTAL.with_label_values(&[kind.as_str()]).inc();
}

pub fn record_source_failure(kind: SourceKind, reason: &str) {
    SOURCE_FAILURES_TOTAL
        .with_label_values(&[kind.as_str(), reason])
        .inc();
}

/// Record the outcome of a resolution pass.
pub fn record_resolution(kind: SourceKind, duration_secs: f64) {
    RESOLUTIONS_TOTAL.with_label_values(&[kind.as_str()]).inc();
    RESOLUTION_DURATION_SECONDS.observe(duration_secs);
    if kind == SourceKind::StaticFallback {
        STATIC_FALLBACK_TOTAL.inc();
    }
}

pub fn record_skipped_tick() {
    POLL_TICKS_SKIPPED_TOTAL.inc();
}

pub fn record_sdk_script_load() {
    SDK_SCRIPT_LOADS_TOTAL.inc();
}
