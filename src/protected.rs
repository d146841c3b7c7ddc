use crate::header_map::{Error, HeaderMap};
use serde::{
    de::{self, Error as DeError},
    ser,
};
use serde_cbor::Value;
use std::ops::Deref;

/// Protected headers, together with the bytes they occupy in the `COSE_Mac0`.
///
/// The wire bytes are whatever was written or received. The bytes fed to the
/// `MAC_structure` are [`Protected::canonical_bytes`], where an empty header map
/// is a zero-length byte string (RFC-8152#Section3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Protected {
    header_map: HeaderMap,
    bytes: Vec<u8>,
}

impl Protected {
    /// Encode `header_map` as a CBOR map, `a0` when it is empty.
    pub fn from_header(header_map: HeaderMap) -> Result<Self, serde_cbor::Error> {
        let bytes = serde_cbor::to_vec(&header_map)?;
        Ok(Self { header_map, bytes })
    }

    /// Parse the protected bucket of a received message.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let header_map = if bytes.is_empty() {
            HeaderMap::default()
        } else {
            serde_cbor::from_slice(&bytes).map_err(Error::HeaderDecodeError)?
        };
        Ok(Self { header_map, bytes })
    }

    /// The bytes as they appear on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The canonical encoding of the parsed header map, independent of how the
    /// sender happened to encode it.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        encode(&self.header_map)
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.header_map
    }
}

fn encode(header_map: &HeaderMap) -> Result<Vec<u8>, serde_cbor::Error> {
    if header_map.is_empty() {
        Ok(vec![])
    } else {
        serde_cbor::to_vec(header_map)
    }
}

impl ser::Serialize for Protected {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        s.serialize_bytes(&self.bytes)
    }
}

impl<'de> de::Deserialize<'de> for Protected {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        match <Value as de::Deserialize>::deserialize(d)? {
            Value::Bytes(bytes) => Protected::from_bytes(bytes).map_err(D::Error::custom),
            v => Err(D::Error::custom(format!(
                "expected byte str, found: {:?}",
                v
            ))),
        }
    }
}

impl TryFrom<HeaderMap> for Protected {
    type Error = serde_cbor::Error;

    fn try_from(h: HeaderMap) -> Result<Self, Self::Error> {
        Protected::from_header(h)
    }
}

impl AsRef<HeaderMap> for Protected {
    fn as_ref(&self) -> &HeaderMap {
        &self.header_map
    }
}

impl Deref for Protected {
    type Target = HeaderMap;

    fn deref(&self) -> &HeaderMap {
        &self.header_map
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn empty_bytes_are_an_empty_map() {
        let protected = Protected::from_bytes(vec![]).unwrap();
        assert!(protected.is_empty());
        assert!(protected.canonical_bytes().unwrap().is_empty());
    }

    #[test]
    fn empty_map_is_written_as_a_map() {
        let protected = Protected::from_header(HeaderMap::default()).unwrap();
        assert_eq!(protected.as_bytes(), &[0xa0]);
        assert_eq!(serde_cbor::to_vec(&protected).unwrap(), vec![0x41, 0xa0]);
        assert!(protected.canonical_bytes().unwrap().is_empty());
    }

    #[test]
    fn default_is_a_zero_length_bstr() {
        let protected = Protected::default();
        assert!(protected.is_empty());
        assert_eq!(serde_cbor::to_vec(&protected).unwrap(), vec![0x40]);
    }

    #[test]
    fn explicit_empty_map_parses_as_empty() {
        let protected = Protected::from_bytes(vec![0xa0]).unwrap();
        assert!(protected.is_empty());
        assert!(protected.canonical_bytes().unwrap().is_empty());
    }

    #[test]
    fn parses_algorithm_header() {
        let protected = Protected::from_bytes(hex::decode("a10105").unwrap()).unwrap();
        assert_eq!(protected.get_i(1), Some(&Value::Integer(5)));
        assert_eq!(hex::encode(protected.canonical_bytes().unwrap()), "a10105");
    }

    #[test]
    fn canonical_bytes_ignore_wire_encoding() {
        // {1: 5} with the value encoded in a needlessly long form.
        let protected = Protected::from_bytes(hex::decode("a1011805").unwrap()).unwrap();
        assert_eq!(protected.as_bytes(), hex::decode("a1011805").unwrap());
        assert_eq!(hex::encode(protected.canonical_bytes().unwrap()), "a10105");
    }

    #[test]
    fn rejects_non_map_bytes() {
        for bytes in ["83010203", "ff", "a101", "a10105ff"] {
            assert!(
                matches!(
                    Protected::from_bytes(hex::decode(bytes).unwrap()),
                    Err(Error::HeaderDecodeError(_))
                ),
                "{}",
                bytes
            );
        }
    }

    #[test]
    fn deserializes_from_bstr_only() {
        let bytes = hex::decode("43a10105").unwrap();
        let protected: Protected = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(protected.get_i(1), Some(&Value::Integer(5)));

        let not_bstr = hex::decode("a10105").unwrap();
        let mut d = serde_cbor::Deserializer::from_slice(&not_bstr);
        assert!(Protected::deserialize(&mut d).is_err());
    }
}
