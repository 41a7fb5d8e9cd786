//! Display formatting for parcel attributes
//!
//! Provides consistent cell rendering for terminal tables and map popups.
//! Missing values render as a sentinel rather than an empty string so a reader
//! can tell "no data" from "empty text".

/// Placeholder for an absent text or score value
pub const MISSING: &str = "—";

/// Placeholder for an absent enrichment value (highway data not computed)
pub const NOT_AVAILABLE: &str = "N/A";

/// Render optional text, `—` when absent
///
/// # Examples
///
/// ```
/// use parcel_common::format::format_text;
///
/// assert_eq!(format_text(Some("ACME LLC")), "ACME LLC");
/// assert_eq!(format_text(None), "—");
/// ```
pub fn format_text(value: Option<&str>) -> String {
    value.map_or_else(|| MISSING.to_string(), str::to_string)
}

/// Render an optional number with two decimals, `—` when absent
///
/// # Examples
///
/// ```
/// use parcel_common::format::format_number;
///
/// assert_eq!(format_number(Some(12.5)), "12.50");
/// assert_eq!(format_number(None), "—");
/// ```
pub fn format_number(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{:.2}", v))
}

/// Render an optional integer, `—` when absent
pub fn format_count(value: Option<u32>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Render an enrichment-derived value, `N/A` when enrichment has not supplied it
pub fn format_enriched(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.2}", v))
}

/// Render a yes/no flag, `—` when absent
pub fn format_flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => MISSING.to_string(),
    }
}

/// Truncate text to `max_chars` characters, marking the cut with `…`
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}
