//! Metrics/tracing hooks.
//!
//! Key/value events only; the binary decides where they go by installing a
//! subscriber.

#[cfg(feature = "tracing")]
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::INFO, "eodflow", event);
    let _enter = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_event: &str, _key_values: &[(&str, String)]) { /* no-op */
}

/// Flatten run counters into metric key/values.
pub fn stats_kv(stats: &eodflow_core::manifest::RunStats) -> Vec<(&'static str, String)> {
    vec![
        ("records", stats.records.to_string()),
        ("failed", stats.failed.to_string()),
        ("synthesized", stats.synthesized.to_string()),
        ("output_rows", stats.output_rows.to_string()),
    ]
}
