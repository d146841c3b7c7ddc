//! `HMAC` and `AES-CBC-MAC` backends, see
//! [RFC-8152#Section9](https://datatracker.ietf.org/doc/html/rfc8152#section-9).
use super::{Algorithm, Error, Primitive, Result};
use aes::{Aes128, Aes256};
use cbc_mac::CbcMac;
use digest::{KeyInit, Mac};
use hmac::Hmac;
use sha2::{Sha256, Sha384, Sha512};

pub type HmacSha256 = Hmac<Sha256>;
pub type HmacSha384 = Hmac<Sha384>;
pub type HmacSha512 = Hmac<Sha512>;

/// `CbcMac` runs with an all-zero IV and pads the final block with zeros, as
/// RFC-8152#Section9.2 requires.
pub type Aes128CbcMac = CbcMac<Aes128>;
pub type Aes256CbcMac = CbcMac<Aes256>;

pub(crate) fn compute_tag(algorithm: Algorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match algorithm.primitive() {
        Primitive::HmacSha256 => compute::<HmacSha256>(algorithm, key, data),
        Primitive::HmacSha384 => compute::<HmacSha384>(algorithm, key, data),
        Primitive::HmacSha512 => compute::<HmacSha512>(algorithm, key, data),
        Primitive::CbcMacAes128 => compute::<Aes128CbcMac>(algorithm, key, data),
        Primitive::CbcMacAes256 => compute::<Aes256CbcMac>(algorithm, key, data),
    }
}

pub(crate) fn verify_tag(
    algorithm: Algorithm,
    key: &[u8],
    data: &[u8],
    tag: &[u8],
) -> Result<bool> {
    // verify_truncated_left accepts any prefix of the full output, so the
    // truncation length has to be enforced here.
    if tag.len() != algorithm.tag_length() {
        return Ok(false);
    }
    match algorithm.primitive() {
        Primitive::HmacSha256 => verify::<HmacSha256>(algorithm, key, data, tag),
        Primitive::HmacSha384 => verify::<HmacSha384>(algorithm, key, data, tag),
        Primitive::HmacSha512 => verify::<HmacSha512>(algorithm, key, data, tag),
        Primitive::CbcMacAes128 => verify::<Aes128CbcMac>(algorithm, key, data, tag),
        Primitive::CbcMacAes256 => verify::<Aes256CbcMac>(algorithm, key, data, tag),
    }
}

fn keyed<M: Mac + KeyInit>(algorithm: Algorithm, key: &[u8], data: &[u8]) -> Result<M> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| Error::InvalidKeyLength {
        algorithm,
        expected: algorithm.key_length(),
        actual: key.len(),
    })?;
    Mac::update(&mut mac, data);
    Ok(mac)
}

fn compute<M: Mac + KeyInit>(algorithm: Algorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mac = keyed::<M>(algorithm, key, data)?;
    let mut tag = mac.finalize().into_bytes().to_vec();
    tag.truncate(algorithm.tag_length());
    Ok(tag)
}

fn verify<M: Mac + KeyInit>(
    algorithm: Algorithm,
    key: &[u8],
    data: &[u8],
    tag: &[u8],
) -> Result<bool> {
    let mac = keyed::<M>(algorithm, key, data)?;
    Ok(mac.verify_truncated_left(tag).is_ok())
}
