use serde::{Deserialize, Serialize};
use serde_cbor::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Deref;

use crate::algorithm::Algorithm;

pub mod headers;

/// Representation of a COSE header label, restricted to integer and text values
/// per [RFC-8152#Section3](https://datatracker.ietf.org/doc/html/rfc8152#section-3).
///
/// Labels sort in canonical CBOR order (RFC-7049#Section3.9), so a [`HeaderMap`]
/// always serializes to the same bytes regardless of insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "Value", into = "Value")]
pub enum Key {
    Integer(i128),
    Text(String),
}

/// Errors that can occur when building or parsing COSE headers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to decode protected headers: {0}")]
    HeaderDecodeError(serde_cbor::Error),
    #[error("invalid header label: {0}")]
    InvalidLabel(String),
    #[error("unable to parse header value: {0}")]
    UnableToParseHeader(serde_cbor::Error),
}

/// COSE headers.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct HeaderMap(BTreeMap<Key, Value>);

/// A header parameter with a fixed label and a typed value.
pub trait Header: Into<Value> + TryFrom<Value, Error = serde_cbor::Error> {
    fn key() -> Key;
}

impl Key {
    // Major type first, then encoded length, then bytes.
    fn canonical_rank(&self) -> (u8, u128, &[u8]) {
        match self {
            Key::Integer(i) if *i >= 0 => (0, *i as u128, &[]),
            Key::Integer(i) => (1, (-1 - *i) as u128, &[]),
            Key::Text(s) => (3, s.len() as u128, s.as_bytes()),
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_rank().cmp(&other.canonical_rank())
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Value {
        match key {
            Key::Text(k) => Value::Text(k),
            Key::Integer(k) => Value::Integer(k),
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(Key::Text(s)),
            Value::Integer(i) => Ok(Key::Integer(i)),
            invalid_key_type => Err(Error::InvalidLabel(format!("{:?}", invalid_key_type))),
        }
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key::Text(key)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key::Text(key.to_string())
    }
}

impl From<i128> for Key {
    fn from(key: i128) -> Self {
        Key::Integer(key)
    }
}

impl HeaderMap {
    /// Insert a defined COSE header parameter.
    /// Returns an error if the previous value found cannot be parsed
    /// into the expected header structure.
    pub fn insert_header<T: Header>(&mut self, header: T) -> Result<Option<T>, Error> {
        match self.0.insert(T::key(), header.into()) {
            None => Ok(None),
            Some(v) => v
                .try_into()
                .map_or_else(|e| Err(Error::UnableToParseHeader(e)), |h| Ok(Some(h))),
        }
    }

    /// Retrieve a defined COSE header parameter.
    /// N.B. This method clones the underlying data.
    pub fn get_header<T: Header>(&self) -> Result<Option<T>, Error> {
        match self.0.get(&T::key()) {
            None => Ok(None),
            Some(v) => v
                .clone()
                .try_into()
                .map_or_else(|e| Err(Error::UnableToParseHeader(e)), |h| Ok(Some(h))),
        }
    }

    /// Insert a header with a given key.
    pub fn insert<T: Into<Key>>(&mut self, key: T, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Insert a header with an integer label.
    pub fn insert_i<L: Into<i128>>(&mut self, label: L, value: Value) -> Option<Value> {
        self.0.insert(Key::Integer(label.into()), value)
    }

    /// Insert a header with a text label.
    pub fn insert_t<L: Into<String>>(&mut self, label: L, value: Value) -> Option<Value> {
        self.0.insert(Key::Text(label.into()), value)
    }

    /// Retrieve a header value with a given key.
    pub fn get<T: Into<Key>>(&self, key: T) -> Option<&Value> {
        self.0.get(&key.into())
    }

    /// Retrieve a header value with an integer label.
    pub fn get_i<L: Into<i128>>(&self, label: L) -> Option<&Value> {
        self.0.get(&Key::Integer(label.into()))
    }

    /// Retrieve a header value with a text label.
    pub fn get_t<L: Into<String>>(&self, label: L) -> Option<&Value> {
        self.0.get(&Key::Text(label.into()))
    }

    /// Remove a defined COSE header parameter.
    /// Returns an error if the removed value cannot be parsed into
    /// the expected header structure.
    pub fn remove_header<T: Header>(&mut self) -> Result<Option<T>, Error> {
        match self.0.remove(&T::key()) {
            None => Ok(None),
            Some(v) => v
                .try_into()
                .map_or_else(|e| Err(Error::UnableToParseHeader(e)), |h| Ok(Some(h))),
        }
    }

    /// Remove a header value with a given key.
    pub fn remove<T: Into<Key>>(&mut self, key: T) -> Option<Value> {
        self.0.remove(&key.into())
    }

    /// Translate header parameters given by name into their registered form.
    ///
    /// Text labels such as `"alg"` or `"kid"` become their integer labels, an
    /// algorithm given by its registered name becomes its integer identifier and
    /// a text key ID becomes its UTF-8 bytes. Anything unrecognised is kept as is.
    pub fn normalize(self) -> HeaderMap {
        self.into_iter()
            .map(|(key, value)| {
                let key = match key {
                    Key::Text(name) => match headers::label_for_name(&name) {
                        Some(label) => Key::Integer(label),
                        None => Key::Text(name),
                    },
                    key => key,
                };
                let value = match (&key, value) {
                    (Key::Integer(headers::ALG), Value::Text(name)) => {
                        match name.parse::<Algorithm>() {
                            Ok(alg) => alg.into(),
                            Err(_) => Value::Text(name),
                        }
                    }
                    (Key::Integer(headers::KID), Value::Text(kid)) => Value::Bytes(kid.into_bytes()),
                    (_, value) => value,
                };
                (key, value)
            })
            .collect()
    }
}

impl AsRef<BTreeMap<Key, Value>> for HeaderMap {
    fn as_ref(&self) -> &BTreeMap<Key, Value> {
        &self.0
    }
}

impl Deref for HeaderMap {
    type Target = BTreeMap<Key, Value>;

    fn deref(&self) -> &BTreeMap<Key, Value> {
        &self.0
    }
}

impl FromIterator<(Key, Value)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (Key, Value)>>(iter: T) -> Self {
        Self(BTreeMap::from_iter(iter))
    }
}

impl TryFrom<BTreeMap<Value, Value>> for HeaderMap {
    type Error = Error;

    fn try_from(m: BTreeMap<Value, Value>) -> Result<Self, Self::Error> {
        m.into_iter()
            .map(|(k, v)| Ok((Key::try_from(k)?, v)))
            .collect()
    }
}

impl From<BTreeMap<Key, Value>> for HeaderMap {
    fn from(m: BTreeMap<Key, Value>) -> Self {
        Self(m)
    }
}

impl IntoIterator for HeaderMap {
    type Item = (Key, Value);

    type IntoIter = <BTreeMap<Key, Value> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_sort_canonically() {
        let mut keys = vec![
            Key::Text("kid".into()),
            Key::Integer(-1),
            Key::Integer(24),
            Key::Text("a".into()),
            Key::Integer(1),
            Key::Integer(-25),
            Key::Integer(4),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::Integer(1),
                Key::Integer(4),
                Key::Integer(24),
                Key::Integer(-1),
                Key::Integer(-25),
                Key::Text("a".into()),
                Key::Text("kid".into()),
            ]
        );
    }

    #[test]
    fn encoding_ignores_insertion_order() {
        let mut first = HeaderMap::default();
        first.insert_t("z", Value::Integer(3));
        first.insert_i(4, Value::Bytes(b"11".to_vec()));
        first.insert_i(1, Value::Integer(5));

        let mut second = HeaderMap::default();
        second.insert_i(1, Value::Integer(5));
        second.insert_t("z", Value::Integer(3));
        second.insert_i(4, Value::Bytes(b"11".to_vec()));

        let first = serde_cbor::to_vec(&first).unwrap();
        assert_eq!(first, serde_cbor::to_vec(&second).unwrap());
        assert_eq!(hex::encode(first), "a3010504423131617a03");
    }

    #[test]
    fn normalize_translates_names() {
        let mut header_map = HeaderMap::default();
        header_map.insert_t("alg", Value::Text("SHA-256".into()));
        header_map.insert_t("kid", Value::Text("our-secret".into()));
        header_map.insert_t("custom", Value::Integer(7));

        let normalized = header_map.normalize();
        assert_eq!(normalized.get_i(1), Some(&Value::Integer(5)));
        assert_eq!(
            normalized.get_i(4),
            Some(&Value::Bytes(b"our-secret".to_vec()))
        );
        assert_eq!(normalized.get_t("custom"), Some(&Value::Integer(7)));
        assert!(normalized.get_t("alg").is_none());
    }

    #[test]
    fn normalize_keeps_unknown_algorithm_names() {
        let mut header_map = HeaderMap::default();
        header_map.insert_i(1, Value::Text("Unknown".into()));
        let normalized = header_map.normalize();
        assert_eq!(normalized.get_i(1), Some(&Value::Text("Unknown".into())));
    }

    #[test]
    fn non_text_or_integer_labels_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert(Value::Bytes(vec![1]), Value::Integer(1));
        assert!(matches!(
            HeaderMap::try_from(map),
            Err(Error::InvalidLabel(_))
        ));
    }
}
