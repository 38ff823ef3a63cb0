//! Web Push payload encryption ("aesgcm" content encoding, single record).
//!
//! The push service encrypts each notification for exactly one subscriber
//! using the legacy draft encoding Mastodon still speaks:
//!
//! ```text
//! ecdh_secret = ECDH-P256(server_private, sender_ephemeral_public).x
//! ikm   = HKDF(salt: auth_secret, ecdh_secret).expand("Content-Encoding: auth" || 0x00, 32)
//! ctx   = "P-256" || 0x00 || len(receiver_pub) || receiver_pub || len(sender_pub) || sender_pub
//! cek   = HKDF(salt: salt, ikm).expand("Content-Encoding: aesgcm" || 0x00 || ctx, 16)
//! nonce = HKDF(salt: salt, ikm).expand("Content-Encoding: nonce"  || 0x00 || ctx, 12)
//! ```
//!
//! The ciphertext is one AES-128-GCM record with the 16-byte tag at the end;
//! the decrypted record starts with a 2-byte big-endian pad length followed
//! by that many zero bytes. One message, one record: inputs that would need
//! multi-record framing fail closed.
//!
//! Rust guideline compliant 2026-02

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use hkdf::Hkdf;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::RelayError;

/// GCM authentication tag size.
const TAG_SIZE: usize = 16;
/// AES-128-GCM content encryption key size.
const KEY_SIZE: usize = 16;
/// GCM nonce size (96 bits).
const NONCE_SIZE: usize = 12;
/// Expected per-message salt length.
const SALT_SIZE: usize = 16;
/// Expected shared auth secret length.
const AUTH_SECRET_SIZE: usize = 16;
/// Pad-length prefix at the start of each plaintext record.
const PAD_PREFIX_SIZE: usize = 2;
/// Largest ciphertext a single record may carry (record size plus tag).
const MAX_CIPHERTEXT_SIZE: usize = 4096 + TAG_SIZE;

/// The encrypted push payload and every input needed to decrypt it.
///
/// `shared_secret` and `private_key` come from server-held configuration;
/// the rest from the untrusted request. Consumed once per request; key
/// material is zeroized on drop and the Debug output carries lengths only.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptedPayload {
    /// 16-byte shared authentication secret.
    pub shared_secret: Vec<u8>,
    /// Server's 32-byte P-256 private scalar.
    pub private_key: Vec<u8>,
    /// Sender's ephemeral public key (uncompressed SEC1 point).
    pub sender_public_key: Vec<u8>,
    /// 16-byte per-message salt.
    pub salt: Vec<u8>,
    /// Ciphertext with the trailing GCM tag.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("shared_secret_len", &self.shared_secret.len())
            .field("private_key_len", &self.private_key.len())
            .field("sender_public_key_len", &self.sender_public_key.len())
            .field("salt_len", &self.salt.len())
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Decrypts the payload, returning the plaintext message.
///
/// Tag mismatch and every structural mismatch (bad point, wrong lengths,
/// oversize record, malformed padding) fail with `CryptoFailure`; plaintext
/// is never partially returned.
pub fn decrypt(payload: &EncryptedPayload) -> Result<String, RelayError> {
    if payload.salt.len() != SALT_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            payload.salt.len()
        )));
    }
    if payload.shared_secret.len() != AUTH_SECRET_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "auth secret must be {AUTH_SECRET_SIZE} bytes, got {}",
            payload.shared_secret.len()
        )));
    }
    if payload.data.len() < TAG_SIZE + PAD_PREFIX_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "ciphertext too short ({} bytes)",
            payload.data.len()
        )));
    }
    if payload.data.len() > MAX_CIPHERTEXT_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "ciphertext exceeds a single record ({} bytes)",
            payload.data.len()
        )));
    }

    let secret = SecretKey::from_slice(&payload.private_key).map_err(|_| {
        RelayError::CryptoFailure("server private key is not a valid P-256 scalar".to_string())
    })?;
    let sender = PublicKey::from_sec1_bytes(&payload.sender_public_key).map_err(|_| {
        RelayError::CryptoFailure("sender public key point decode failed".to_string())
    })?;

    let ecdh_secret = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), sender.as_affine());
    let receiver_public = secret.public_key().to_encoded_point(false);

    let (key, nonce) = derive_key_and_nonce(
        ecdh_secret.raw_secret_bytes().as_slice(),
        &payload.shared_secret,
        &payload.salt,
        receiver_public.as_bytes(),
        &payload.sender_public_key,
    )?;

    let cipher = Aes128Gcm::new_from_slice(&key).expect("valid key length");
    let record = cipher
        .decrypt(Nonce::from_slice(&nonce), payload.data.as_ref())
        .map_err(|_| RelayError::CryptoFailure("authentication tag mismatch".to_string()))?;

    let plaintext = strip_padding(&record)?;
    Ok(String::from_utf8_lossy(&plaintext).into_owned())
}

/// The encrypt direction of the same scheme.
///
/// Takes the subscriber's public key, the shared auth secret, the sender's
/// (ephemeral) private scalar, a caller-chosen 16-byte salt, and prepends
/// `pad_len` zero bytes of padding. Returns ciphertext with the trailing
/// tag. Used to produce replay fixtures and by the round-trip tests.
pub fn encrypt(
    receiver_public_key: &[u8],
    auth_secret: &[u8],
    sender_private_key: &[u8],
    salt: &[u8],
    plaintext: &[u8],
    pad_len: usize,
) -> Result<Vec<u8>, RelayError> {
    if salt.len() != SALT_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }
    if auth_secret.len() != AUTH_SECRET_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "auth secret must be {AUTH_SECRET_SIZE} bytes, got {}",
            auth_secret.len()
        )));
    }

    let sender_secret = SecretKey::from_slice(sender_private_key).map_err(|_| {
        RelayError::CryptoFailure("sender private key is not a valid P-256 scalar".to_string())
    })?;
    let receiver = PublicKey::from_sec1_bytes(receiver_public_key).map_err(|_| {
        RelayError::CryptoFailure("receiver public key point decode failed".to_string())
    })?;

    let ecdh_secret =
        p256::ecdh::diffie_hellman(sender_secret.to_nonzero_scalar(), receiver.as_affine());
    let sender_public = sender_secret.public_key().to_encoded_point(false);

    let (key, nonce) = derive_key_and_nonce(
        ecdh_secret.raw_secret_bytes().as_slice(),
        auth_secret,
        salt,
        receiver_public_key,
        sender_public.as_bytes(),
    )?;

    let mut record = Vec::with_capacity(PAD_PREFIX_SIZE + pad_len + plaintext.len());
    record.extend_from_slice(&(pad_len as u16).to_be_bytes());
    record.resize(PAD_PREFIX_SIZE + pad_len, 0);
    record.extend_from_slice(plaintext);
    if record.len() > MAX_CIPHERTEXT_SIZE - TAG_SIZE {
        return Err(RelayError::CryptoFailure(format!(
            "message exceeds a single record ({} bytes)",
            record.len()
        )));
    }

    let cipher = Aes128Gcm::new_from_slice(&key).expect("valid key length");
    cipher
        .encrypt(Nonce::from_slice(&nonce), record.as_ref())
        .map_err(|_| RelayError::CryptoFailure("encryption failed".to_string()))
}

/// Runs the two-stage HKDF-SHA256 derivation shared by both directions.
fn derive_key_and_nonce(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    salt: &[u8],
    receiver_public: &[u8],
    sender_public: &[u8],
) -> Result<([u8; KEY_SIZE], [u8; NONCE_SIZE]), RelayError> {
    let hk = Hkdf::<Sha256>::new(Some(auth_secret), ecdh_secret);
    let mut ikm = [0u8; 32];
    hk.expand(b"Content-Encoding: auth\0", &mut ikm)
        .map_err(|e| RelayError::CryptoFailure(format!("hkdf auth expand failed: {e}")))?;

    let context = key_context(receiver_public, sender_public);
    let hk = Hkdf::<Sha256>::new(Some(salt), &ikm);

    let mut key = [0u8; KEY_SIZE];
    hk.expand(&encoding_info(b"aesgcm", &context), &mut key)
        .map_err(|e| RelayError::CryptoFailure(format!("hkdf key expand failed: {e}")))?;

    let mut nonce = [0u8; NONCE_SIZE];
    hk.expand(&encoding_info(b"nonce", &context), &mut nonce)
        .map_err(|e| RelayError::CryptoFailure(format!("hkdf nonce expand failed: {e}")))?;

    ikm.zeroize();
    Ok((key, nonce))
}

/// `"P-256" || 0x00 || len || receiver_pub || len || sender_pub`, lengths as
/// 16-bit network order. Binds both public keys into the derivation.
fn key_context(receiver_public: &[u8], sender_public: &[u8]) -> Vec<u8> {
    let mut context =
        Vec::with_capacity(6 + 2 + receiver_public.len() + 2 + sender_public.len());
    context.extend_from_slice(b"P-256\0");
    context.extend_from_slice(&(receiver_public.len() as u16).to_be_bytes());
    context.extend_from_slice(receiver_public);
    context.extend_from_slice(&(sender_public.len() as u16).to_be_bytes());
    context.extend_from_slice(sender_public);
    context
}

/// `"Content-Encoding: " || encoding || 0x00 || context`.
fn encoding_info(encoding: &[u8], context: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(18 + encoding.len() + 1 + context.len());
    info.extend_from_slice(b"Content-Encoding: ");
    info.extend_from_slice(encoding);
    info.push(0);
    info.extend_from_slice(context);
    info
}

/// Strips and validates the record's pad-length prefix and zero padding.
fn strip_padding(record: &[u8]) -> Result<Vec<u8>, RelayError> {
    if record.len() < PAD_PREFIX_SIZE {
        return Err(RelayError::CryptoFailure(
            "record shorter than its padding prefix".to_string(),
        ));
    }
    let pad_len = u16::from_be_bytes([record[0], record[1]]) as usize;
    let rest = &record[PAD_PREFIX_SIZE..];
    if pad_len > rest.len() {
        return Err(RelayError::CryptoFailure(format!(
            "padding length {pad_len} exceeds record"
        )));
    }
    if rest[..pad_len].iter().any(|&b| b != 0) {
        return Err(RelayError::CryptoFailure(
            "non-zero padding bytes".to_string(),
        ));
    }
    Ok(rest[pad_len..].to_vec())
}
