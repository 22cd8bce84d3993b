//! Attribute values stored in a session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A session attribute value.
///
/// Application types with no native variant are carried as [`AttributeValue::Opaque`]
/// bytes. The bytes are owned by the application and replicated verbatim; the
/// [`AttributeValue::opaque_json`] and [`AttributeValue::decode_json`] helpers give
/// any `serde` type a JSON encoding inside that envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Opaque(Vec<u8>),
}

impl AttributeValue {
    /// Wrap a serializable application value as JSON opaque bytes.
    pub fn opaque_json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_vec(value)
            .map(AttributeValue::Opaque)
            .map_err(Error::malformed)
    }

    /// Decode an opaque value written by [`AttributeValue::opaque_json`].
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            AttributeValue::Opaque(bytes) => serde_json::from_slice(bytes).map_err(Error::malformed),
            other => Err(Error::Serialization(format!(
                "expected opaque value, found {}",
                other.type_name()
            ))),
        }
    }

    /// Short name of the variant, used in logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "int",
            AttributeValue::Long(_) => "long",
            AttributeValue::Double(_) => "double",
            AttributeValue::String(_) => "string",
            AttributeValue::Opaque(_) => "opaque",
        }
    }

    /// Bit-for-bit equality: `NaN` matches itself and `0.0` does not match `-0.0`.
    pub fn is_identical(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Double(a), AttributeValue::Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; `Int` widens to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(n) => Some(i64::from(*n)),
            AttributeValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Opaque(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Long(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        AttributeValue::Opaque(v)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Cart {
        items: Vec<String>,
        total_cents: u64,
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(AttributeValue::from(1), AttributeValue::Int(1));
        assert_eq!(AttributeValue::from(1i64), AttributeValue::Long(1));
        assert_eq!(AttributeValue::from("x"), AttributeValue::String("x".into()));
        assert_eq!(AttributeValue::from(None::<i32>), AttributeValue::Null);
        assert_eq!(AttributeValue::from(Some(true)), AttributeValue::Bool(true));
    }

    #[test]
    fn test_int_widens_to_i64() {
        assert_eq!(AttributeValue::Int(7).as_i64(), Some(7));
        assert_eq!(AttributeValue::Long(7).as_i64(), Some(7));
        assert_eq!(AttributeValue::Double(7.0).as_i64(), None);
    }

    #[test]
    fn test_is_identical_compares_double_bits() {
        let nan = AttributeValue::Double(f64::NAN);
        assert!(nan.is_identical(&nan.clone()));
        assert!(!AttributeValue::Double(0.0).is_identical(&AttributeValue::Double(-0.0)));
        assert!(AttributeValue::Int(1).is_identical(&AttributeValue::Int(1)));
        assert!(!AttributeValue::Int(1).is_identical(&AttributeValue::Long(1)));
    }

    #[test]
    fn test_opaque_json_roundtrip() {
        let cart = Cart {
            items: vec!["book".into(), "pen".into()],
            total_cents: 1299,
        };
        let value = AttributeValue::opaque_json(&cart).unwrap();
        assert_eq!(value.type_name(), "opaque");
        let decoded: Cart = value.decode_json().unwrap();
        assert_eq!(decoded, cart);
    }

    #[test]
    fn test_decode_json_rejects_non_opaque() {
        let err = AttributeValue::Int(1).decode_json::<Cart>().unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_serde_representation() {
        let json = serde_json::to_string(&AttributeValue::Int(3)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":3}"#);
        let json = serde_json::to_string(&AttributeValue::Null).unwrap();
        assert_eq!(json, r#"{"type":"null"}"#);
    }
}
