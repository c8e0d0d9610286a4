//! Edit accuracy and latency summaries.

use std::collections::BTreeMap;

/// Percentage of attempted edits that were applied, or `None` before any attempt.
pub fn edit_accuracy(attempts: u32, applied: u32) -> Option<f64> {
    if attempts == 0 {
        return None;
    }
    Some(100.0 * f64::from(applied) / f64::from(attempts))
}

/// `"model_ms=12ms, sandbox_ms=40ms"`, or `"no data"` when empty.
pub fn format_latency_breakdown(breakdown: &BTreeMap<String, u64>) -> String {
    if breakdown.is_empty() {
        return "no data".to_string();
    }
    breakdown
        .iter()
        .map(|(stage, ms)| format!("{stage}={ms}ms"))
        .collect::<Vec<_>>()
        .join(", ")
}
