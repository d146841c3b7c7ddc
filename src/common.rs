use serde::Serialize;
use serde_bytes::ByteBuf;
use serde_cbor::Value;

use crate::{header_map::HeaderMap, protected::Protected};

/// The four-element array shared by the single-recipient COSE messages:
/// `[protected, unprotected, payload, tag]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct CoseInner(
    pub(crate) Protected,
    pub(crate) HeaderMap,
    pub(crate) ByteBuf,
    pub(crate) ByteBuf,
);

/// Reasons a CBOR value is not a `[bstr, map, bstr, bstr]` array.
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("expected an array of 4 items, found: {0}")]
    NotAnArrayOf4(&'static str),
    #[error("expected {expected} for the {field}")]
    UnexpectedItem {
        field: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Header(#[from] crate::header_map::Error),
}

impl TryFrom<Value> for CoseInner {
    type Error = StructureError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut items = match value {
            Value::Array(items) if items.len() == 4 => items,
            Value::Array(_) => return Err(StructureError::NotAnArrayOf4("array of another length")),
            v => return Err(StructureError::NotAnArrayOf4(kind(&v))),
        };

        // Remove items in reverse order to avoid shifts.
        let tag = match items.remove(3) {
            Value::Bytes(b) => b,
            _ => return Err(unexpected("tag", "bstr")),
        };
        let payload = match items.remove(2) {
            Value::Bytes(b) => b,
            _ => return Err(unexpected("payload", "bstr")),
        };
        let unprotected = match items.remove(1) {
            Value::Map(m) => HeaderMap::try_from(m)?,
            _ => return Err(unexpected("unprotected headers", "map")),
        };
        let protected = match items.remove(0) {
            Value::Bytes(b) => Protected::from_bytes(b)?,
            _ => return Err(unexpected("protected headers", "bstr")),
        };

        Ok(CoseInner(
            protected,
            unprotected,
            ByteBuf::from(payload),
            ByteBuf::from(tag),
        ))
    }
}

fn unexpected(field: &'static str, expected: &'static str) -> StructureError {
    StructureError::UnexpectedItem { field, expected }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Integer(_) => "int",
        Value::Float(_) => "float",
        Value::Bytes(_) => "bstr",
        Value::Text(_) => "tstr",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Tag(_, _) => "tag",
        _ => "unknown",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode(hex: &str) -> Result<CoseInner, StructureError> {
        let value: Value = serde_cbor::from_slice(&hex::decode(hex).unwrap()).unwrap();
        CoseInner::try_from(value)
    }

    #[test]
    fn decodes_four_items() {
        let inner = decode("8443a10105a1044231314474657374420102").unwrap();
        assert_eq!(inner.0.get_i(1), Some(&Value::Integer(5)));
        assert_eq!(inner.1.get_i(4), Some(&Value::Bytes(b"11".to_vec())));
        assert_eq!(inner.2.as_slice(), b"test");
        assert_eq!(inner.3.as_slice(), &[1, 2]);
    }

    #[test]
    fn encodes_as_a_plain_array() {
        let inner = decode("8443a10105a1044231314474657374420102").unwrap();
        assert_eq!(
            hex::encode(serde_cbor::to_vec(&inner).unwrap()),
            "8443a10105a1044231314474657374420102"
        );
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(matches!(
            decode("8340a04474657374"),
            Err(StructureError::NotAnArrayOf4(_))
        ));
        assert!(matches!(decode("01"), Err(StructureError::NotAnArrayOf4("int"))));
        // Unwrapped protected map.
        assert!(matches!(
            decode("84a10105a04474657374420102"),
            Err(StructureError::UnexpectedItem { field: "protected headers", .. })
        ));
        // Detached (nil) payload.
        assert!(matches!(
            decode("8440a0f6420102"),
            Err(StructureError::UnexpectedItem { field: "payload", .. })
        ));
        // Protected bytes that are not a map.
        assert!(matches!(
            decode("844183a04474657374420102"),
            Err(StructureError::Header(_))
        ));
    }
}
