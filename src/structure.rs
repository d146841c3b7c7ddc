//! The `MAC_structure` of [RFC-8152#Section6.3](https://datatracker.ietf.org/doc/html/rfc8152#section-6.3).
use serde_bytes::Bytes;

/// Context string of a `COSE_Mac0`.
pub const MAC0_CONTEXT: &str = "MAC0";

/// Everything authenticated by the tag of a `COSE_Mac0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacContext<'a> {
    pub protected: &'a [u8],
    pub external_aad: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> MacContext<'a> {
    pub fn new(protected: &'a [u8], external_aad: Option<&'a [u8]>, payload: &'a [u8]) -> Self {
        Self {
            protected,
            external_aad: external_aad.unwrap_or_default(),
            payload,
        }
    }

    /// Encode `["MAC0", protected, external_aad, payload]`, the bytes the tag is
    /// computed over.
    pub fn to_be_maced(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(&(
            MAC0_CONTEXT,
            Bytes::new(self.protected),
            Bytes::new(self.external_aad),
            Bytes::new(self.payload),
        ))
    }
}
