//! Standard COSE headers for convenience, as specified in the
//! [COSE Header Parameters registry](https://www.iana.org/assignments/cose/cose.xhtml).
use super::{Header, Key};
use serde::de::Error as _;
use serde_cbor::Value;

pub const ALG: i128 = 1;
pub const CRIT: i128 = 2;
pub const CONTENT_TYPE: i128 = 3;
pub const KID: i128 = 4;
pub const IV: i128 = 5;
pub const PARTIAL_IV: i128 = 6;
pub const COUNTER_SIGNATURE: i128 = 7;
pub const EPHEMERAL_KEY: i128 = -1;
pub const STATIC_KEY: i128 = -2;
pub const STATIC_KEY_ID: i128 = -3;
pub const PARTY_U_NONCE: i128 = -22;

/// Integer label of a header parameter given by its name.
pub fn label_for_name(name: &str) -> Option<i128> {
    Some(match name {
        "alg" => ALG,
        "crit" => CRIT,
        "content_type" | "ctyp" => CONTENT_TYPE,
        "kid" => KID,
        "IV" => IV,
        "Partial_IV" => PARTIAL_IV,
        "counter_signature" => COUNTER_SIGNATURE,
        "ephemeral_key" => EPHEMERAL_KEY,
        "static_key" => STATIC_KEY,
        "static_key_id" => STATIC_KEY_ID,
        "partyUNonce" => PARTY_U_NONCE,
        _ => return None,
    })
}

/// Defines a header whose value is a byte string.
macro_rules! define_bytes_header {
    ($(#[$meta:meta])* $name:ident, $label:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name(pub Vec<u8>);

        impl $name {
            pub fn new(value: impl Into<Vec<u8>>) -> $name {
                $name(value.into())
            }
        }

        impl Header for $name {
            fn key() -> Key {
                Key::Integer($label)
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::Bytes(value.0)
            }
        }

        impl TryFrom<Value> for $name {
            type Error = serde_cbor::Error;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::Bytes(bytes) => Ok($name(bytes)),
                    _ => Err(serde_cbor::Error::custom(concat!(
                        "invalid ",
                        stringify!($name),
                        " value"
                    ))),
                }
            }
        }
    };
}

define_bytes_header!(
    /// Key ID header.
    KeyId,
    KID
);
define_bytes_header!(
    /// Full initialization vector header.
    Iv,
    IV
);
define_bytes_header!(
    /// Partial initialization vector header.
    PartialIv,
    PARTIAL_IV
);

/// Content type header: a CoAP content format or a media type string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentType {
    CoapFormat(u16),
    MediaType(String),
}

impl Header for ContentType {
    fn key() -> Key {
        Key::Integer(CONTENT_TYPE)
    }
}

impl From<ContentType> for Value {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::CoapFormat(format) => Value::Integer(format.into()),
            ContentType::MediaType(media_type) => Value::Text(media_type),
        }
    }
}

impl TryFrom<Value> for ContentType {
    type Error = serde_cbor::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(i) => u16::try_from(i)
                .map(ContentType::CoapFormat)
                .map_err(|_| serde_cbor::Error::custom("content format out of range")),
            Value::Text(t) => Ok(ContentType::MediaType(t)),
            _ => Err(serde_cbor::Error::custom("invalid ContentType value")),
        }
    }
}
