//! Cbor Object Signing and Encryption (COSE), MACed with a single recipient.
//!
//! Pure rust implementation of `COSE_Mac0` from [RFC-8152](https://www.rfc-editor.org/info/rfc8152),
//! using RustCrypto's `hmac` and `cbc-mac` crates as the MAC backend.

/// COSE MAC algorithms.
#[allow(non_camel_case_types)]
pub mod algorithm;
mod common;
pub mod header_map;
/// Implementation of COSE_Mac0.
pub mod mac0;
mod protected;
pub mod structure;

pub use algorithm::Algorithm;
pub use header_map::HeaderMap;
pub use mac0::{create, read, CoseMac0, EncodeMode, Headers, Options, Recipient};
pub use protected::Protected;

#[cfg(feature = "async")]
pub use mac0::{create_async, read_async};
