use crate::header_map::{Header, Key};
use serde::de::Error as _;
use serde_cbor::Value;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

pub(crate) mod primitive;

pub use primitive::{Aes128CbcMac, Aes256CbcMac, HmacSha256, HmacSha384, HmacSha512};

/// Every MAC algorithm known to the registry, in IANA value order.
pub const REGISTRY: [Algorithm; 8] = [
    Algorithm::HMAC_256_64,
    Algorithm::HMAC_256_256,
    Algorithm::HMAC_384_384,
    Algorithm::HMAC_512_512,
    Algorithm::AES_MAC_128_64,
    Algorithm::AES_MAC_256_64,
    Algorithm::AES_MAC_128_128,
    Algorithm::AES_MAC_256_128,
];

/// COSE MAC algorithms from the
/// [IANA COSE Algorithms registry](https://www.iana.org/assignments/cose/cose.xhtml#algorithms).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub enum Algorithm {
    HMAC_256_64,
    HMAC_256_256,
    HMAC_384_384,
    HMAC_512_512,
    AES_MAC_128_64,
    AES_MAC_256_64,
    AES_MAC_128_128,
    AES_MAC_256_128,
}

/// An algorithm identifier as it appears in a header: either the IANA integer
/// or a name. The form it was given in is kept so that errors can report it verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlgorithmId {
    Numeric(i64),
    Named(String),
}

/// Key length an algorithm accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyLength {
    Any,
    Exact(usize),
}

/// The function computing the tag of an algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    HmacSha256,
    HmacSha384,
    HmacSha512,
    CbcMacAes128,
    CbcMacAes256,
}

/// Errors that can occur when resolving an algorithm or preparing its key.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown algorithm, {0}")]
    UnknownAlgorithm(AlgorithmId),
    #[error("invalid key length for {algorithm}: expected {expected}, received {actual} bytes")]
    InvalidKeyLength {
        algorithm: Algorithm,
        expected: KeyLength,
        actual: usize,
    },
    #[error("algorithm identifier must be an integer or a text string, found: {0}")]
    MalformedAlgorithm(String),
}

/// Result with error type: [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Find the registry entry for an algorithm identifier.
pub fn lookup(id: &AlgorithmId) -> Result<Algorithm> {
    let found = match id {
        AlgorithmId::Numeric(value) => REGISTRY
            .iter()
            .find(|alg| i64::from(alg.value()) == *value),
        AlgorithmId::Named(name) => REGISTRY
            .iter()
            .find(|alg| alg.registered_name() == name || alg.name() == name),
    };
    found
        .copied()
        .ok_or_else(|| Error::UnknownAlgorithm(id.clone()))
}

impl Algorithm {
    /// Name of the algorithm according to the IANA COSE Algorithms registry.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::HMAC_256_64 => "HMAC 256/64",
            Algorithm::HMAC_256_256 => "HMAC 256/256",
            Algorithm::HMAC_384_384 => "HMAC 384/384",
            Algorithm::HMAC_512_512 => "HMAC 512/512",
            Algorithm::AES_MAC_128_64 => "AES-MAC 128/64",
            Algorithm::AES_MAC_256_64 => "AES-MAC 256/64",
            Algorithm::AES_MAC_128_128 => "AES-MAC 128/128",
            Algorithm::AES_MAC_256_128 => "AES-MAC 256/128",
        }
    }

    /// Name under which the algorithm may be given in a header instead of its
    /// integer value.
    pub fn registered_name(&self) -> &'static str {
        match self {
            Algorithm::HMAC_256_64 => "SHA-256_64",
            Algorithm::HMAC_256_256 => "SHA-256",
            Algorithm::HMAC_384_384 => "SHA-384",
            Algorithm::HMAC_512_512 => "SHA-512",
            Algorithm::AES_MAC_128_64 => "AES-MAC-128/64",
            Algorithm::AES_MAC_256_64 => "AES-MAC-256/64",
            Algorithm::AES_MAC_128_128 => "AES-MAC-128/128",
            Algorithm::AES_MAC_256_128 => "AES-MAC-256/128",
        }
    }

    /// Description of the algorithm according to the IANA COSE Algorithms registry.
    pub fn description(&self) -> &'static str {
        match self {
            Algorithm::HMAC_256_64 => "HMAC w/ SHA-256 truncated to 64 bits",
            Algorithm::HMAC_256_256 => "HMAC w/ SHA-256",
            Algorithm::HMAC_384_384 => "HMAC w/ SHA-384",
            Algorithm::HMAC_512_512 => "HMAC w/ SHA-512",
            Algorithm::AES_MAC_128_64 => "AES-MAC 128-bit key, 64-bit tag",
            Algorithm::AES_MAC_256_64 => "AES-MAC 256-bit key, 64-bit tag",
            Algorithm::AES_MAC_128_128 => "AES-MAC 128-bit key, 128-bit tag",
            Algorithm::AES_MAC_256_128 => "AES-MAC 256-bit key, 128-bit tag",
        }
    }

    /// CBOR representation of the algorithm according to the IANA COSE Algorithms registry.
    pub fn value(&self) -> i32 {
        match self {
            Algorithm::HMAC_256_64 => 4,
            Algorithm::HMAC_256_256 => 5,
            Algorithm::HMAC_384_384 => 6,
            Algorithm::HMAC_512_512 => 7,
            Algorithm::AES_MAC_128_64 => 14,
            Algorithm::AES_MAC_256_64 => 15,
            Algorithm::AES_MAC_128_128 => 25,
            Algorithm::AES_MAC_256_128 => 26,
        }
    }

    /// Key length required by the algorithm. HMAC keys of any length are
    /// accepted (RFC-2104 hashes or pads them); AES keys must match the cipher.
    pub fn key_length(&self) -> KeyLength {
        match self {
            Algorithm::HMAC_256_64
            | Algorithm::HMAC_256_256
            | Algorithm::HMAC_384_384
            | Algorithm::HMAC_512_512 => KeyLength::Any,
            Algorithm::AES_MAC_128_64 | Algorithm::AES_MAC_128_128 => KeyLength::Exact(16),
            Algorithm::AES_MAC_256_64 | Algorithm::AES_MAC_256_128 => KeyLength::Exact(32),
        }
    }

    /// Length in bytes of the tag carried in the `COSE_Mac0`.
    pub fn tag_length(&self) -> usize {
        match self {
            Algorithm::HMAC_256_64 | Algorithm::AES_MAC_128_64 | Algorithm::AES_MAC_256_64 => 8,
            Algorithm::AES_MAC_128_128 | Algorithm::AES_MAC_256_128 => 16,
            Algorithm::HMAC_256_256 => 32,
            Algorithm::HMAC_384_384 => 48,
            Algorithm::HMAC_512_512 => 64,
        }
    }

    pub fn primitive(&self) -> Primitive {
        match self {
            Algorithm::HMAC_256_64 | Algorithm::HMAC_256_256 => Primitive::HmacSha256,
            Algorithm::HMAC_384_384 => Primitive::HmacSha384,
            Algorithm::HMAC_512_512 => Primitive::HmacSha512,
            Algorithm::AES_MAC_128_64 | Algorithm::AES_MAC_128_128 => Primitive::CbcMacAes128,
            Algorithm::AES_MAC_256_64 | Algorithm::AES_MAC_256_128 => Primitive::CbcMacAes256,
        }
    }

    /// Check that `key` can be used with this algorithm.
    pub fn check_key(&self, key: &[u8]) -> Result<()> {
        match self.key_length() {
            KeyLength::Exact(expected) if key.len() != expected => Err(Error::InvalidKeyLength {
                algorithm: *self,
                expected: self.key_length(),
                actual: key.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Compute the tag over `data`, truncated to [`Self::tag_length`].
    pub fn compute_tag(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        self.check_key(key)?;
        primitive::compute_tag(*self, key, data)
    }

    /// Check `tag` against the tag of `data` in constant time.
    ///
    /// Returns `Ok(false)` if the tag is inauthentic, including when it has the
    /// wrong length.
    pub fn verify_tag(&self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        primitive::verify_tag(*self, key, data, tag)
    }
}

impl TryFrom<i32> for Algorithm {
    type Error = Error;

    fn try_from(i: i32) -> Result<Self, Self::Error> {
        lookup(&AlgorithmId::Numeric(i.into()))
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&AlgorithmId::Named(s.to_string()))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Header for Algorithm {
    fn key() -> Key {
        Key::Integer(crate::header_map::headers::ALG)
    }
}

impl From<Algorithm> for Value {
    fn from(value: Algorithm) -> Self {
        Value::Integer(value.value().into())
    }
}

impl TryFrom<Value> for Algorithm {
    type Error = serde_cbor::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        AlgorithmId::try_from(&value)
            .and_then(|id| lookup(&id))
            .map_err(serde_cbor::Error::custom)
    }
}

impl TryFrom<&Value> for AlgorithmId {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(i) => i64::try_from(*i)
                .map(AlgorithmId::Numeric)
                .map_err(|_| Error::MalformedAlgorithm(i.to_string())),
            Value::Text(name) => Ok(AlgorithmId::Named(name.clone())),
            v => Err(Error::MalformedAlgorithm(format!("{:?}", v))),
        }
    }
}

impl From<Algorithm> for AlgorithmId {
    fn from(alg: Algorithm) -> Self {
        AlgorithmId::Numeric(alg.value().into())
    }
}

impl From<i64> for AlgorithmId {
    fn from(value: i64) -> Self {
        AlgorithmId::Numeric(value)
    }
}

impl From<&str> for AlgorithmId {
    fn from(name: &str) -> Self {
        AlgorithmId::Named(name.to_string())
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlgorithmId::Numeric(value) => write!(f, "{}", value),
            AlgorithmId::Named(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for KeyLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyLength::Any => write!(f, "any length"),
            KeyLength::Exact(n) => write!(f, "{} bytes", n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_round_trips_values_and_names() {
        for alg in REGISTRY {
            assert_eq!(lookup(&AlgorithmId::from(alg)).unwrap(), alg);
            assert_eq!(alg.registered_name().parse::<Algorithm>().unwrap(), alg);
            assert_eq!(alg.name().parse::<Algorithm>().unwrap(), alg);
            assert_eq!(Algorithm::try_from(alg.value()).unwrap(), alg);
        }
    }

    #[test]
    fn unknown_numeric_identifier_is_reported_verbatim() {
        let err = lookup(&AlgorithmId::Numeric(-999)).unwrap_err();
        assert_eq!(err.to_string(), "Unknown algorithm, -999");
    }

    #[test]
    fn unknown_named_identifier_is_reported_verbatim() {
        let err = lookup(&"Unknown".into()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown algorithm, Unknown");
    }

    #[test]
    fn non_mac_algorithms_are_unknown() {
        // ES256 and A128GCM are registered COSE algorithms but not MACs.
        for value in [-7, 1] {
            assert!(matches!(
                lookup(&AlgorithmId::Numeric(value)),
                Err(Error::UnknownAlgorithm(AlgorithmId::Numeric(v))) if v == value
            ));
        }
    }

    #[test]
    fn identifier_from_header_value() {
        assert_eq!(
            AlgorithmId::try_from(&Value::Integer(5)).unwrap(),
            AlgorithmId::Numeric(5)
        );
        assert_eq!(
            AlgorithmId::try_from(&Value::Text("SHA-256".into())).unwrap(),
            AlgorithmId::Named("SHA-256".into())
        );
        assert!(matches!(
            AlgorithmId::try_from(&Value::Bytes(vec![5])),
            Err(Error::MalformedAlgorithm(_))
        ));
        assert!(matches!(
            AlgorithmId::try_from(&Value::Integer(i128::from(i64::MAX) + 1)),
            Err(Error::MalformedAlgorithm(_))
        ));
    }

    #[test]
    fn aes_keys_must_match_the_cipher() {
        assert!(Algorithm::AES_MAC_128_64.check_key(&[0; 16]).is_ok());
        let err = Algorithm::AES_MAC_256_128.check_key(&[0; 16]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidKeyLength {
                algorithm: Algorithm::AES_MAC_256_128,
                expected: KeyLength::Exact(32),
                actual: 16,
            }
        ));
        assert!(Algorithm::HMAC_512_512.check_key(b"short").is_ok());
    }

    #[test]
    fn header_value_is_the_integer_identifier() {
        assert_eq!(Value::from(Algorithm::HMAC_384_384), Value::Integer(6));
        assert_eq!(
            Algorithm::try_from(Value::Text("AES-MAC-256/64".into())).unwrap(),
            Algorithm::AES_MAC_256_64
        );
        assert!(Algorithm::try_from(Value::Integer(-7)).is_err());
    }
}
