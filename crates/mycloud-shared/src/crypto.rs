//! Sealing of the persisted session token.
//!
//! The stored value is `base64(nonce || XChaCha20-Poly1305(json(token)))`
//! under a key derived from the configured secret with BLAKE3.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{KDF_CONTEXT_TOKEN_KEY, NONCE_SIZE};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; 32];

/// Encrypt `plaintext` under a fresh random nonce; the nonce leads the output.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut sealed = vec![0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut sealed);

    let ciphertext = XChaCha20Poly1305::new(key.into())
        .encrypt(XNonce::from_slice(&sealed), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Inverse of [`encrypt`]. Fails on truncated, tampered or foreign data.
pub fn decrypt(key: &SymmetricKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    XChaCha20Poly1305::new(key.into())
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

// BLAKE3 KDF with domain separation
pub fn derive_token_key(secret: &str) -> SymmetricKey {
    blake3::derive_key(KDF_CONTEXT_TOKEN_KEY, secret.as_bytes())
}

/// Seal a session token for local persistence.
///
/// The token is JSON-encoded, encrypted and base64-encoded so the stored
/// value is a single printable string.
pub fn seal_token(key: &SymmetricKey, token: &str) -> Result<String, CryptoError> {
    let json = serde_json::to_vec(token).map_err(|_| CryptoError::Payload)?;
    let sealed = encrypt(key, &json)?;
    Ok(BASE64.encode(sealed))
}

/// Reverse of [`seal_token`].
pub fn open_token(key: &SymmetricKey, sealed: &str) -> Result<String, CryptoError> {
    let data = BASE64
        .decode(sealed.trim())
        .map_err(|_| CryptoError::Encoding)?;
    let json = decrypt(key, &data)?;
    serde_json::from_slice(&json).map_err(|_| CryptoError::Payload)
}
