//! Utility functions and helpers

use chrono::{NaiveDate, NaiveDateTime};

/// Round a quantity to two decimal places for report output
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generate a unique entity ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Format a datetime in the ISO-8601 form used on every wire and cache surface
pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse a datetime from the formats callers actually send.
///
/// Accepts full ISO-8601 (`2024-01-15T10:30:00`), the space-separated
/// variant, and a bare date (interpreted as midnight).
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}
