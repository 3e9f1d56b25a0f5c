//! Encoding and decoding of [`Value`] parameters.
//!
//! The wire format is JSON. JSON is not self-describing enough to tell the
//! variants apart on its own (`3` could be an integer or a float), so
//! decoding tries the variants in a fixed priority order:
//!
//! ```text
//! bool -> integer -> float -> string -> string map -> list of values
//! ```
//!
//! - A number decodes as [`Value::Int`] when it is integral and fits `i64`.
//!   Numbers written with a fraction or exponent decode as [`Value::Float`],
//!   as do integral numbers outside the `i64` range.
//! - An object decodes as [`Value::StringMap`] only if every value is a
//!   string. Nested objects are not supported.
//! - `null` never decodes.
//!
//! With these rules `decode(encode(v)) == v` holds for every value that
//! encodes successfully.

use std::collections::BTreeMap;

use serde_json::Value as Json;
use thiserror::Error;

use crate::objects::Value;

/// Errors raised while turning a value into its wire form.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The value's shape is outside the supported set.
    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    /// The encoded JSON could not be written out.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reading a value back from its wire form.
#[derive(Debug, Error)]
pub enum DecodingError {
    /// The data matched none of the supported variants.
    #[error("corrupt parameter data: {0}")]
    CorruptData(String),

    /// The bytes were not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a value into its JSON form.
///
/// Fails with [`EncodingError::UnsupportedType`] for non-finite floats,
/// which JSON cannot represent.
pub fn encode(value: &Value) -> Result<Json, EncodingError> {
    let json = match value {
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => Json::from(*v),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(Json::Number)
            .ok_or_else(|| EncodingError::UnsupportedType(format!("non-finite float {v}")))?,
        Value::String(v) => Json::String(v.clone()),
        Value::StringMap(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Json::String(v.clone())))
                .collect(),
        ),
        Value::List(items) => Json::Array(items.iter().map(encode).collect::<Result<_, _>>()?),
    };
    Ok(json)
}

/// Decode a JSON value using the fixed variant priority.
pub fn decode(raw: Json) -> Result<Value, DecodingError> {
    from_json(raw).map_err(DecodingError::CorruptData)
}

/// Encode a value straight to JSON bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>, EncodingError> {
    let json = encode(value)?;
    Ok(serde_json::to_vec(&json)?)
}

/// Decode a value from JSON bytes.
pub fn from_slice(bytes: &[u8]) -> Result<Value, DecodingError> {
    let raw: Json = serde_json::from_slice(bytes)?;
    decode(raw)
}

/// Shared shape check behind [`decode`] and `Value::try_from`.
///
/// The error string describes the offending shape; callers wrap it in the
/// error type that fits their side of the boundary.
pub(crate) fn from_json(raw: Json) -> Result<Value, String> {
    if let Some(v) = raw.as_bool() {
        return Ok(Value::Bool(v));
    }
    if let Some(v) = raw.as_i64() {
        return Ok(Value::Int(v));
    }
    if let Some(v) = raw.as_f64() {
        return Ok(Value::Float(v));
    }

    match raw {
        Json::String(v) => Ok(Value::String(v)),
        Json::Object(map) => {
            let mut entries = BTreeMap::new();
            for (key, value) in map {
                match value {
                    Json::String(s) => {
                        entries.insert(key, s);
                    }
                    other => {
                        return Err(format!(
                            "map entry `{key}` holds {}, only strings are supported",
                            json_kind(&other)
                        ));
                    }
                }
            }
            Ok(Value::StringMap(entries))
        }
        Json::Array(items) => items
            .into_iter()
            .map(from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(format!("{} is not a supported value", json_kind(&other))),
    }
}

fn json_kind(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "a list",
        Json::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_values() -> Vec<Value> {
        let mut map = BTreeMap::new();
        map.insert("plan".to_string(), "pro".to_string());
        map.insert("region".to_string(), "eu".to_string());

        vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(0),
            Value::Int(-42),
            Value::Int(i64::MAX),
            Value::Int(i64::MIN),
            Value::Float(1.0),
            Value::Float(-0.5),
            Value::Float(std::f64::consts::PI),
            Value::Float(1e-300),
            Value::String(String::new()),
            Value::String("hello".to_string()),
            Value::StringMap(map.clone()),
            Value::StringMap(BTreeMap::new()),
            Value::List(vec![]),
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::String("x".to_string()),
                Value::StringMap(map),
                Value::List(vec![Value::Bool(true)]),
            ]),
        ]
    }

    #[test]
    fn test_round_trip_in_memory() {
        for value in sample_values() {
            let encoded = encode(&value).unwrap();
            assert_eq!(decode(encoded).unwrap(), value);
        }
    }

    #[test]
    fn test_round_trip_through_bytes() {
        for value in sample_values() {
            let bytes = to_vec(&value).unwrap();
            assert_eq!(from_slice(&bytes).unwrap(), value, "bytes: {:?}", String::from_utf8_lossy(&bytes));
        }
    }

    #[test]
    fn test_integral_float_stays_float() {
        let bytes = to_vec(&Value::Float(3.0)).unwrap();
        assert_eq!(bytes, b"3.0");
        assert_eq!(from_slice(&bytes).unwrap(), Value::Float(3.0));
    }

    #[test]
    fn test_decode_priority_for_numbers() {
        assert_eq!(decode(json!(7)).unwrap(), Value::Int(7));
        assert_eq!(decode(json!(7.25)).unwrap(), Value::Float(7.25));
        // Integral but outside i64: the integer attempt fails first.
        assert_eq!(decode(json!(u64::MAX)).unwrap(), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn test_decode_rejects_null_and_nested_maps() {
        assert!(matches!(decode(json!(null)), Err(DecodingError::CorruptData(_))));
        assert!(matches!(
            decode(json!({"a": {"b": "c"}})),
            Err(DecodingError::CorruptData(_))
        ));
        assert!(matches!(
            decode(json!({"a": 1})),
            Err(DecodingError::CorruptData(_))
        ));
        assert!(matches!(
            decode(json!([1, null])),
            Err(DecodingError::CorruptData(_))
        ));
    }

    #[test]
    fn test_from_slice_invalid_json() {
        assert!(matches!(from_slice(b"{not json"), Err(DecodingError::Json(_))));
    }

    #[test]
    fn test_encode_non_finite_float_fails() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                encode(&Value::Float(v)),
                Err(EncodingError::UnsupportedType(_))
            ));
        }
        let nested = Value::List(vec![Value::Int(1), Value::Float(f64::NAN)]);
        assert!(matches!(encode(&nested), Err(EncodingError::UnsupportedType(_))));
    }
}
