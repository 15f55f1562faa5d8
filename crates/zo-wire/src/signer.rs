//! Identity and session keys, and the two signature shapes.
//!
//! Security notes:
//! - Decoded private-key bytes live in `Zeroizing` buffers.
//! - Keys are loaded once at startup; the session key rotates with the
//!   session. Never log key material.
//!
//! The venue's verifier distinguishes the two shapes exactly:
//! `user_sign` signs the lower-case hex encoding of the framed message,
//! `session_sign` signs the framed message bytes. Confusing the two, or
//! signing the payload without its varint prefix, is rejected as a
//! signature-verification failure.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroizing;

/// Ed25519 signatures are fixed-width.
pub const SIGNATURE_LEN: usize = 64;

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Failed to decode base58 key: {0}")]
    Base58(String),

    #[error("Unsupported key length: {0} bytes (expected 32-byte seed or 64-byte keypair)")]
    Length(usize),
}

/// Long-lived identity key, used only for session creation.
pub struct IdentityKey {
    key: SigningKey,
}

impl IdentityKey {
    /// Load from a base58-encoded private key. Accepts either a
    /// 32-byte seed or the 64-byte seed‖pubkey keypair layout wallets
    /// export.
    pub fn from_base58(encoded: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| KeyError::Base58(e.to_string()))?,
        );
        let mut seed = Zeroizing::new([0u8; 32]);
        match bytes.len() {
            32 | 64 => seed.copy_from_slice(&bytes[..32]),
            n => return Err(KeyError::Length(n)),
        }
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    /// Public key bytes for the create_session message.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// User-sign shape: sign the lower-case hex encoding of the framed
    /// message.
    pub fn user_sign(&self, framed: &[u8]) -> [u8; SIGNATURE_LEN] {
        let hex_message = hex::encode(framed);
        self.key.sign(hex_message.as_bytes()).to_bytes()
    }
}

impl std::fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never expose key material, even in debug output
        f.debug_struct("IdentityKey").finish_non_exhaustive()
    }
}

/// Ephemeral per-session keypair.
pub struct SessionKeypair {
    key: SigningKey,
}

impl SessionKeypair {
    /// Generate a fresh keypair from the OS RNG. A new keypair per
    /// session avoids DUPLICATE_SESSION rejections on re-create.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Session-sign shape: sign the framed message bytes directly.
    pub fn session_sign(&self, framed: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.key.sign(framed).to_bytes()
    }
}

impl Clone for SessionKeypair {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

impl std::fmt::Debug for SessionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeypair").finish_non_exhaustive()
    }
}

/// Seal a framed message into the final wire frame: `M ‖ sig`.
pub fn seal_frame(mut framed: Vec<u8>, signature: [u8; SIGNATURE_LEN]) -> Vec<u8> {
    framed.extend_from_slice(&signature);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::{frame_payload, sealed_frame_len};
    use ed25519_dalek::Verifier;

    fn test_identity() -> IdentityKey {
        // deterministic test seed, not a real key
        let seed = [7u8; 32];
        let encoded = bs58::encode(seed).into_string();
        IdentityKey::from_base58(&encoded).unwrap()
    }

    #[test]
    fn test_identity_from_64_byte_keypair_encoding() {
        let seed = [9u8; 32];
        let key = SigningKey::from_bytes(&seed);
        let mut keypair = Vec::with_capacity(64);
        keypair.extend_from_slice(&seed);
        keypair.extend_from_slice(&key.verifying_key().to_bytes());
        let encoded = bs58::encode(&keypair).into_string();

        let identity = IdentityKey::from_base58(&encoded).unwrap();
        assert_eq!(identity.public_key_bytes(), key.verifying_key().to_bytes());
    }

    #[test]
    fn test_identity_rejects_odd_lengths() {
        let encoded = bs58::encode([1u8; 31]).into_string();
        assert!(matches!(
            IdentityKey::from_base58(&encoded),
            Err(KeyError::Length(31))
        ));
    }

    #[test]
    fn test_identity_rejects_bad_base58() {
        assert!(matches!(
            IdentityKey::from_base58("not-base58-0OIl"),
            Err(KeyError::Base58(_))
        ));
    }

    #[test]
    fn test_user_sign_covers_hex_of_framed_message() {
        let identity = test_identity();
        let framed = frame_payload(b"create-session-payload");
        let sig_bytes = identity.user_sign(&framed);
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        // verifies against hex(M), not M itself
        let hex_message = hex::encode(&framed);
        assert!(identity
            .verifying_key()
            .verify(hex_message.as_bytes(), &sig)
            .is_ok());
        assert!(identity.verifying_key().verify(&framed, &sig).is_err());
    }

    #[test]
    fn test_session_sign_covers_framed_message_raw() {
        let session = SessionKeypair::generate();
        let framed = frame_payload(b"place-order-payload");
        let sig_bytes = session.session_sign(&framed);
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        assert!(session.verifying_key().verify(&framed, &sig).is_ok());
        let hex_message = hex::encode(&framed);
        assert!(session
            .verifying_key()
            .verify(hex_message.as_bytes(), &sig)
            .is_err());
    }

    #[test]
    fn test_sealed_frame_layout() {
        let session = SessionKeypair::generate();
        for payload_len in [0usize, 1, 17, 127, 128, 300] {
            let payload = vec![0x5a; payload_len];
            let framed = frame_payload(&payload);
            let sig = session.session_sign(&framed);
            let sealed = seal_frame(framed, sig);
            assert_eq!(sealed.len(), sealed_frame_len(payload_len));
        }
    }

    /// A conforming verifier checks that the varint prefix equals the
    /// payload length before checking the signature.
    fn mock_venue_verify(frame: &[u8], key: &VerifyingKey, session_shape: bool) -> bool {
        if frame.len() < SIGNATURE_LEN {
            return false;
        }
        let (message, sig_bytes) = frame.split_at(frame.len() - SIGNATURE_LEN);
        let Ok((declared_len, consumed)) = crate::varint::decode_uvarint(message, 0) else {
            return false;
        };
        if declared_len as usize != message.len() - consumed {
            return false;
        }
        let sig = ed25519_dalek::Signature::from_bytes(sig_bytes.try_into().unwrap());
        let verified = if session_shape {
            key.verify(message, &sig)
        } else {
            key.verify(hex::encode(message).as_bytes(), &sig)
        };
        verified.is_ok()
    }

    #[test]
    fn test_mock_verifier_accepts_conforming_frame() {
        let session = SessionKeypair::generate();
        let payload = [0xabu8; 17];
        let framed = frame_payload(&payload);
        assert_eq!(framed[0], 0x11);
        let sealed = seal_frame(framed.clone(), session.session_sign(&framed));
        assert!(mock_venue_verify(&sealed, &session.verifying_key(), true));
    }

    #[test]
    fn test_mock_verifier_rejects_mislabelled_prefix_even_if_resigned() {
        let session = SessionKeypair::generate();
        let payload = [0xabu8; 17];
        let mut framed = frame_payload(&payload);
        assert_eq!(framed[0], 0x11);

        // claim 16 payload bytes while carrying 17, and re-sign the
        // tampered message with the same key
        framed[0] = 0x10;
        let sig = session.session_sign(&framed);
        let sealed = seal_frame(framed, sig);
        assert!(!mock_venue_verify(&sealed, &session.verifying_key(), true));
    }

    #[test]
    fn test_mock_verifier_rejects_shape_confusion() {
        // user-sign frame presented to a session-shape verifier
        let identity = test_identity();
        let framed = frame_payload(&[0x01u8; 17]);
        let sealed = seal_frame(framed, identity.user_sign(&frame_payload(&[0x01u8; 17])));
        assert!(!mock_venue_verify(&sealed, &identity.verifying_key(), true));
        assert!(mock_venue_verify(&sealed, &identity.verifying_key(), false));
    }
}
