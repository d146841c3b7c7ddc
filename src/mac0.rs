use crate::algorithm::{self, Algorithm, AlgorithmId};
use crate::common::{CoseInner, StructureError};
use crate::header_map::{self, headers, HeaderMap};
use crate::protected::Protected;
use crate::structure::MacContext;
use log::{debug, trace, warn};
use serde::{
    de::{self, Error as DeError},
    ser, Deserialize, Serialize,
};
use serde_bytes::ByteBuf;
use serde_cbor::{tags::Tagged, Value};
use std::fmt;
use zeroize::ZeroizeOnDrop;

/// CBOR tag of a `COSE_Mac0` (RFC-8152#Section2).
pub const COSE_MAC0_TAG: u64 = 17;

/// COSE_Mac0 implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct CoseMac0 {
    tagged: bool,
    inner: CoseInner,
}

/// Headers supplied when creating a `COSE_Mac0`. An absent bucket is encoded
/// the same as an empty one.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    pub protected: Option<HeaderMap>,
    pub unprotected: Option<HeaderMap>,
}

/// The holder of the symmetric key a `COSE_Mac0` is created for.
///
/// The key is zeroed when the recipient is dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Recipient {
    key: Vec<u8>,
}

/// How the protected headers are written into the `COSE_Mac0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeMode {
    /// Write the protected headers as a CBOR map, `a0` when there are none.
    #[default]
    Full,
    /// Write a zero-length byte string whatever the protected headers are.
    /// The protected headers still select the algorithm, but the tag is
    /// computed over an empty protected bucket, as a verifier will see it.
    Empty,
}

/// Options for [`create`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub encodep: EncodeMode,
    pub excludetag: bool,
}

/// Errors that can occur when creating, parsing or verifying a `COSE_Mac0`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing algorithm: no `alg` in the protected or unprotected headers")]
    MissingAlgorithm,
    #[error("conflicting algorithm: the protected and unprotected headers disagree on `alg`")]
    ConflictingAlgorithm,
    #[error("no recipient to take the key from")]
    NoRecipient,
    #[error("Unexpected cbor tag, '{0}'")]
    UnexpectedCborTag(u64),
    #[error("unable to deserialize COSE_Mac0: {0}")]
    StructuralDecodeError(String),
    #[error("Tag mismatch")]
    TagMismatch,
    #[error("unable to serialize COSE_Mac0 protected headers: {0}")]
    UnableToSerializeProtected(serde_cbor::Error),
    #[error("unable to serialize COSE_Mac0 MAC structure: {0}")]
    UnableToSerializeMacStructure(serde_cbor::Error),
    #[error("unable to serialize COSE_Mac0: {0}")]
    UnableToSerialize(serde_cbor::Error),
    #[error(transparent)]
    Algorithm(#[from] algorithm::Error),
    #[error(transparent)]
    Header(#[from] header_map::Error),
}

impl From<StructureError> for Error {
    fn from(value: StructureError) -> Self {
        match value {
            StructureError::Header(e) => Error::Header(e),
            e => Error::StructuralDecodeError(e.to_string()),
        }
    }
}

/// Result with error type: [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Create a serialized `COSE_Mac0` for `payload`, keyed with the key of the
/// first recipient.
///
/// The algorithm is taken from the `alg` header, protected first.
///
/// # In the case of `AES-CBC-MAC`
///
/// ## Security Considerations, see [specs](https://datatracker.ietf.org/doc/html/rfc8152#section-9.2.1)
///
/// - A single key must only be used for messages of a fixed and known
///     length, unless the encoding being MACed includes the lengths, which
///     the `MAC_structure` does.
/// - The same key must not be used for both encryption and authentication.
/// - The IV is fixed to all zeros so that it cannot be modified.
pub fn create(
    headers: Headers,
    payload: &[u8],
    recipients: &[Recipient],
    external_aad: Option<&[u8]>,
    options: &Options,
) -> Result<Vec<u8>> {
    CoseMac0::create(headers, payload, recipients, external_aad, options)?.to_vec()
}

/// Parse and verify a serialized `COSE_Mac0`, returning its payload.
pub fn read(envelope: &[u8], key: &[u8], external_aad: Option<&[u8]>) -> Result<Vec<u8>> {
    let cose_mac0 = CoseMac0::from_slice(envelope)?;
    cose_mac0.verify(key, external_aad)?;
    Ok(cose_mac0.into_payload())
}

#[cfg(feature = "async")]
/// Asynchronous [`create`], for callers whose calling convention requires a future.
pub async fn create_async(
    headers: Headers,
    payload: &[u8],
    recipients: &[Recipient],
    external_aad: Option<&[u8]>,
    options: &Options,
) -> Result<Vec<u8>> {
    create(headers, payload, recipients, external_aad, options)
}

#[cfg(feature = "async")]
/// Asynchronous [`read`], for callers whose calling convention requires a future.
pub async fn read_async(
    envelope: &[u8],
    key: &[u8],
    external_aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    read(envelope, key, external_aad)
}

impl CoseMac0 {
    /// Compute the tag and assemble a `COSE_Mac0`.
    ///
    /// See [`create`].
    pub fn create(
        headers: Headers,
        payload: &[u8],
        recipients: &[Recipient],
        external_aad: Option<&[u8]>,
        options: &Options,
    ) -> Result<Self> {
        let protected = headers.protected.unwrap_or_default().normalize();
        let unprotected = headers.unprotected.unwrap_or_default().normalize();

        let algorithm = resolve_algorithm(&protected, &unprotected)?;
        let key = recipients.first().ok_or(Error::NoRecipient)?.key();
        algorithm.check_key(key)?;

        let protected = match options.encodep {
            EncodeMode::Full => {
                Protected::from_header(protected).map_err(Error::UnableToSerializeProtected)?
            }
            EncodeMode::Empty => {
                if !protected.is_empty() {
                    warn!("dropping protected headers from COSE_Mac0; they are not authenticated");
                }
                Protected::default()
            }
        };
        let canonical = protected
            .canonical_bytes()
            .map_err(Error::UnableToSerializeProtected)?;
        let to_be_maced = MacContext::new(&canonical, external_aad, payload)
            .to_be_maced()
            .map_err(Error::UnableToSerializeMacStructure)?;
        let tag = algorithm.compute_tag(key, &to_be_maced)?;
        debug!(
            "created COSE_Mac0 with {} ({:?} protected headers, tagged: {})",
            algorithm, options.encodep, !options.excludetag
        );

        Ok(Self {
            tagged: !options.excludetag,
            inner: CoseInner(
                protected,
                unprotected,
                ByteBuf::from(payload),
                ByteBuf::from(tag),
            ),
        })
    }

    /// Parse a `COSE_Mac0`, with or without its CBOR tag.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_cbor::from_slice(bytes)
            .map_err(|e| Error::StructuralDecodeError(e.to_string()))?;
        Self::try_from(value)
    }

    /// Serialize the `COSE_Mac0`, tagged with 17 unless it was created untagged.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_cbor::to_vec(self).map_err(Error::UnableToSerialize)
    }

    /// Verify that the tag of the `COSE_Mac0` is authentic.
    ///
    /// The `MAC_structure` is rebuilt from the canonical encoding of the parsed
    /// protected headers rather than from the bytes on the wire.
    pub fn verify(&self, key: &[u8], external_aad: Option<&[u8]>) -> Result<()> {
        let algorithm = resolve_algorithm(self.protected(), self.unprotected())?;
        let protected = self
            .protected()
            .canonical_bytes()
            .map_err(Error::UnableToSerializeProtected)?;
        let to_be_maced = MacContext::new(&protected, external_aad, self.payload())
            .to_be_maced()
            .map_err(Error::UnableToSerializeMacStructure)?;

        if algorithm.verify_tag(key, &to_be_maced, self.tag())? {
            trace!("COSE_Mac0 tag verified with {}", algorithm);
            Ok(())
        } else {
            debug!("COSE_Mac0 tag did not verify with {}", algorithm);
            Err(Error::TagMismatch)
        }
    }

    /// Retrieve the protected headers.
    pub fn protected(&self) -> &Protected {
        &self.inner.0
    }

    /// Retrieve the unprotected headers.
    pub fn unprotected(&self) -> &HeaderMap {
        &self.inner.1
    }

    /// Retrieve the payload.
    pub fn payload(&self) -> &[u8] {
        &self.inner.2
    }

    /// Retrieve the tag.
    pub fn tag(&self) -> &[u8] {
        &self.inner.3
    }

    /// Whether the `COSE_Mac0` is serialized with CBOR tag 17.
    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// Take the payload, consuming the `COSE_Mac0`.
    pub fn into_payload(self) -> Vec<u8> {
        self.inner.2.into_vec()
    }
}

/// Find the algorithm named by the `alg` header.
fn resolve_algorithm(protected: &HeaderMap, unprotected: &HeaderMap) -> Result<Algorithm> {
    let value = match (protected.get_i(headers::ALG), unprotected.get_i(headers::ALG)) {
        (Some(p), Some(u)) if p != u => return Err(Error::ConflictingAlgorithm),
        (Some(value), _) | (None, Some(value)) => value,
        (None, None) => return Err(Error::MissingAlgorithm),
    };
    let id = AlgorithmId::try_from(value)?;
    let algorithm = algorithm::lookup(&id)?;
    trace!("resolved algorithm identifier {} to {}", id, algorithm);
    Ok(algorithm)
}

impl TryFrom<Value> for CoseMac0 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let (tagged, value) = match value {
            Value::Tag(COSE_MAC0_TAG, inner) => (true, *inner),
            Value::Tag(tag, _) => return Err(Error::UnexpectedCborTag(tag)),
            value => (false, value),
        };
        Ok(Self {
            tagged,
            inner: CoseInner::try_from(value)?,
        })
    }
}

impl ser::Serialize for CoseMac0 {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        if self.tagged {
            Tagged::<&CoseInner>::new(Some(COSE_MAC0_TAG), &self.inner)
        } else {
            Tagged::<&CoseInner>::new(None, &self.inner)
        }
        .serialize(s)
    }
}

impl<'de> de::Deserialize<'de> for CoseMac0 {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        CoseMac0::try_from(Value::deserialize(d)?).map_err(D::Error::custom)
    }
}

impl Headers {
    pub fn new(protected: Option<HeaderMap>, unprotected: Option<HeaderMap>) -> Self {
        Self {
            protected,
            unprotected,
        }
    }
}

impl Recipient {
    pub fn new<K: Into<Vec<u8>>>(key: K) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Recipient")
            .field("key", &format_args!("[{} bytes]", self.key.len()))
            .finish()
    }
}

impl Options {
    /// Set how the protected headers are written.
    pub fn encodep(mut self, encodep: EncodeMode) -> Self {
        self.encodep = encodep;
        self
    }

    /// Leave out the outer CBOR tag 17.
    pub fn excludetag(mut self) -> Self {
        self.excludetag = true;
        self
    }
}
