// Utility functions for recommendation-engine

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Case-insensitive substring match in either direction.
///
/// Blank strings never match.
pub fn fuzzy_contains(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Case-insensitive containment of `needle` in `haystack`; blank needles never match.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

/// Fractional age in days, clamped at zero for timestamps in the future.
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - created_at).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}
