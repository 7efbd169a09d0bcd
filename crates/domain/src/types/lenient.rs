//! Tolerant field decoders for documents written by other clients.
//!
//! Remote documents may have been produced by older builds or by hand edits:
//! counters stored as floats or strings, dates in `Date.toDateString()` form,
//! difficulty tags outside the known set. Each helper maps anything it cannot
//! interpret to `None` so the applier falls back to the local value instead
//! of failing the whole load.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{DailyFocus, TaskDifficulty};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%a %b %d %Y", "%Y/%m/%d"];

/// Parse a calendar date from the formats clients have historically written.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Interpret a JSON value as a non-negative counter.
///
/// Negative numbers clamp to zero, fractional numbers truncate, numeric
/// strings are accepted. Everything else is `None`.
pub fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_i64().map(|_| 0))
            .or_else(|| number.as_f64().and_then(float_to_count)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>().ok().or_else(|| text.parse::<f64>().ok().and_then(float_to_count))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_count(value: f64) -> Option<u64> {
    if !value.is_finite() {
        return None;
    }
    if value <= 0.0 {
        return Some(0);
    }
    Some(value.trunc().min(u64::MAX as f64) as u64)
}

pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_date))
}

pub fn difficulty<'de, D>(deserializer: D) -> Result<Option<TaskDifficulty>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(|tag| tag.parse().ok()))
}

pub fn optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(count_from_value))
}

pub fn optional_small_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(count_from_value)
        .map(|count| u32::try_from(count).unwrap_or(u32::MAX)))
}

pub fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_bool))
}

pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|value| match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text
            .parse::<i64>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.timestamp_millis())),
        _ => None,
    }))
}

pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        Value::String(text) => Some(text),
        _ => None,
    }))
}

/// Decode an array, dropping elements that do not fit `T`.
pub fn optional_items<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => {
            Some(items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect())
        }
        _ => None,
    })
}

/// Decode a nested object, treating a malformed one as absent.
pub fn optional_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Decode the calendar history map. Entries whose key is not a date are
/// dropped; missing counters inside an entry default to zero.
pub fn daily_focus<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<NaiveDate, DailyFocus>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Object(entries)) = raw else {
        return Ok(None);
    };

    let history = entries
        .into_iter()
        .filter_map(|(key, entry)| {
            let day = parse_date(&key)?;
            let focus_time = entry.get("focusTime").and_then(count_from_value).unwrap_or(0);
            let distractions = entry.get("distractions").and_then(count_from_value).unwrap_or(0);
            Some((day, DailyFocus { focus_time, distractions }))
        })
        .collect();
    Ok(Some(history))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_iso_and_legacy_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 10, 14);
        assert_eq!(parse_date("2024-10-14"), expected);
        assert_eq!(parse_date("Mon Oct 14 2024"), expected);
        assert_eq!(parse_date("2024-10-14T08:30:00Z"), expected);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("   "), None);
    }

    #[test]
    fn counters_coalesce_odd_encodings() {
        assert_eq!(count_from_value(&json!(42)), Some(42));
        assert_eq!(count_from_value(&json!(-3)), Some(0));
        assert_eq!(count_from_value(&json!(12.9)), Some(12));
        assert_eq!(count_from_value(&json!("17")), Some(17));
        assert_eq!(count_from_value(&json!(null)), None);
        assert_eq!(count_from_value(&json!(true)), None);
        assert_eq!(count_from_value(&json!("lots")), None);
    }
}
