//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Failure to verify a signed token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is not of the form <payload>.<signature>")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
}

/// 32 bytes from the OS RNG
pub fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    secret
}

/// URL-safe base64 without padding
pub fn to_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn from_base64url(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(s)
}

/// HMAC-SHA256 of `data`
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // HMAC accepts keys of any length, so `new_from_slice` cannot fail here.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Sha256::digest(data).into(),
    };
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// `<payload>.<base64url(hmac(payload))>`
pub fn sign_token(key: &[u8], payload: &str) -> String {
    format!("{payload}.{}", to_base64url(&hmac_sha256(key, payload.as_bytes())))
}

/// Check a token produced by [`sign_token`] and return its payload
pub fn verify_token<'a>(key: &[u8], token: &'a str) -> Result<&'a str, TokenError> {
    let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
    if payload.is_empty() {
        return Err(TokenError::Malformed);
    }
    let signature = from_base64url(signature).map_err(|_| TokenError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::BadSignature)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    Ok(payload)
}

/// Lowercase hex SHA-1, as required by the image host's request signatures
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}
