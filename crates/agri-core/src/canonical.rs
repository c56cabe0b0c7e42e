//! # Canonical Bytes for Digests
//!
//! `CanonicalBytes` is the sole construction path for bytes that feed a
//! digest: journal event links and the committed-state root.
//!
//! ## Invariant
//!
//! The inner field is private. The only constructor is
//! [`CanonicalBytes::new`], which rejects floats and then serializes with
//! `serde_jcs` (RFC 8785: sorted keys, compact separators). Any function
//! that needs canonical bytes takes `&CanonicalBytes`, so a digest over a
//! non-canonical serialization cannot be written by accident.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization of a float-free value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, or `SerializationFailed` if serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_compact_output() {
        let data = serde_json::json!({"z": 1, "m": {"b": 2, "a": 1}, "a": [3, 2, 1]});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"a":[3,2,1],"m":{"a":1,"b":2},"z":1}"#);
    }

    #[test]
    fn test_float_rejection() {
        let data = serde_json::json!({"temperature": 21.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 21.5),
            other => panic!("Expected FloatRejected, got: {other:?}"),
        }
    }

    #[test]
    fn test_nested_float_rejection() {
        let data = serde_json::json!({"readings": [{"humidity": 0.5}]});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn test_negative_integers_accepted() {
        let data = serde_json::json!({"temperature": -1250});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"temperature":-1250}"#);
    }
}
