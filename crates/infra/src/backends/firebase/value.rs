//! Firestore typed-value codec
//!
//! The REST API wraps every value in a single-key object naming its type
//! (`{"integerValue": "42"}`). Integers travel as decimal strings.

use serde_json::{json, Map, Number, Value};
use tracing::debug;

/// Wrap a plain JSON value.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                json!({ "integerValue": int.to_string() })
            } else if let Some(uint) = number.as_u64() {
                json!({ "integerValue": uint.to_string() })
            } else {
                json!({ "doubleValue": number.as_f64().unwrap_or_default() })
            }
        }
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            if values.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Encode the top-level fields of a document.
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter().map(|(key, value)| (key.clone(), encode(value))).collect()
}

/// Unwrap a typed value.
///
/// Anything that is not a well-formed typed value decodes to `Null`, so one
/// bad field leaves that field at its local value instead of failing the
/// whole document.
pub fn decode(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|typed| typed.iter().next()) else {
        debug!(%value, "Ignoring malformed Firestore value");
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.as_bool().map_or(Value::Null, Value::Bool),
        "integerValue" => decode_integer(inner),
        "doubleValue" => decode_double(inner),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            inner.as_str().map_or(Value::Null, |text| Value::String(text.to_string()))
        }
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let items = inner.get("values").and_then(Value::as_array);
            Value::Array(items.map_or_else(Vec::new, |items| items.iter().map(decode).collect()))
        }
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            Value::Object(fields.map_or_else(Map::new, decode_fields))
        }
        other => {
            debug!(kind = other, "Ignoring unsupported Firestore value type");
            Value::Null
        }
    }
}

/// Decode the `fields` object of a document.
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter().map(|(key, value)| (key.clone(), decode(value))).collect()
}

fn decode_integer(inner: &Value) -> Value {
    let number = match inner {
        Value::String(text) => text
            .parse::<i64>()
            .map(Number::from)
            .or_else(|_| text.parse::<u64>().map(Number::from))
            .ok(),
        Value::Number(number) if !number.is_f64() => Some(number.clone()),
        _ => None,
    };
    number.map_or(Value::Null, Value::Number)
}

fn decode_double(inner: &Value) -> Value {
    inner
        .as_f64()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}
