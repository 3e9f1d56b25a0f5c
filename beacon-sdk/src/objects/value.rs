//! Event parameter values.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{self, EncodingError};

/// A single event parameter.
///
/// This is a closed set: anything that does not fit one of these variants
/// is rejected at the boundary (see [`Value::try_from`] for dynamic input
/// and [`codec`] for the wire rules).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A flat map of strings. Values of other shapes are not allowed inside.
    StringMap(BTreeMap<String, String>),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::StringMap(_) => "string_map",
            Value::List(_) => "list",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            // serde_json would silently write `null` for these.
            Value::Float(v) if !v.is_finite() => Err(S::Error::custom(
                EncodingError::UnsupportedType(format!("non-finite float {v}")),
            )),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::StringMap(v) => v.serialize(serializer),
            Value::List(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        codec::decode(raw).map_err(serde::de::Error::custom)
    }
}

/// Dynamic input boundary: accepts exactly the supported shapes.
impl TryFrom<serde_json::Value> for Value {
    type Error = EncodingError;

    fn try_from(raw: serde_json::Value) -> Result<Self, Self::Error> {
        codec::from_json(raw).map_err(EncodingError::UnsupportedType)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(v: BTreeMap<String, String>) -> Self {
        Value::StringMap(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_try_from_supported_shapes() {
        assert_eq!(Value::try_from(json!(true)).unwrap(), Value::Bool(true));
        assert_eq!(Value::try_from(json!(12)).unwrap(), Value::Int(12));
        assert_eq!(Value::try_from(json!(0.5)).unwrap(), Value::Float(0.5));
        assert_eq!(Value::try_from(json!("a")).unwrap(), Value::from("a"));

        let map = Value::try_from(json!({"k": "v"})).unwrap();
        let Value::StringMap(map) = map else {
            panic!("expected a string map");
        };
        assert_eq!(map.get("k").map(String::as_str), Some("v"));

        assert_eq!(
            Value::try_from(json!([1, "two"])).unwrap(),
            Value::List(vec![Value::Int(1), Value::from("two")])
        );
    }

    #[test]
    fn test_try_from_unsupported_shapes() {
        for raw in [json!(null), json!({"k": 1}), json!({"k": {"n": "v"}}), json!([null])] {
            let err = Value::try_from(raw).unwrap_err();
            assert!(matches!(err, EncodingError::UnsupportedType(_)));
        }
    }

    #[test]
    fn test_serialize_rejects_nan() {
        assert!(serde_json::to_string(&Value::Float(f64::NAN)).is_err());
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn test_serde_round_trip_in_struct() {
        let params: BTreeMap<String, Value> = [
            ("count".to_string(), Value::Int(3)),
            ("ratio".to_string(), Value::Float(0.25)),
            ("ok".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&params).unwrap();
        let back: BTreeMap<String, Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::from(1i64).kind(), "int");
        assert_eq!(Value::List(vec![]).kind(), "list");
    }
}
