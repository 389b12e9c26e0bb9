//! Record shapes stored under `items/{key}` and `users/{key}`.
//!
//! Records are read leniently: a field with the wrong JSON type is treated
//! as absent instead of failing the whole record.

mod item;
mod user;

pub use item::{FormField, ItemDraft, ItemForm, ItemRecord, ValidationError};
pub use user::UserRecord;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::status::ItemStatus;

/// Shown wherever an optional value is absent
pub const NOT_AVAILABLE: &str = "N/A";

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<ItemStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(ItemStatus::from_code),
        _ => None,
    })
}

/// Read a stored timestamp: RFC 3339 text or epoch milliseconds
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Calendar date of a stored timestamp, `"N/A"` when absent or unreadable
pub fn display_date(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// The value itself, or `"N/A"`
pub fn or_not_available(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}
