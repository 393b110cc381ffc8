//! Ed25519-backed implementation of the opaque verification seam.
//!
//! The beacon only ever verifies already-aggregated group signatures, so a
//! single-signature scheme is enough at this seam; producing the aggregate
//! is the signing collaborators' concern.

use crate::traits::ThresholdVerifier;
use crate::types::{GroupPublicKey, SignatureBytes};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Verifies group signatures as Ed25519 over the canonical payload bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl ThresholdVerifier for Ed25519Verifier {
    fn verify(
        &self,
        public_key: &GroupPublicKey,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> bool {
        let Ok(key_bytes) = <&[u8; 32]>::try_from(public_key.as_bytes()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature.as_bytes()) else {
            return false;
        };
        verifying_key.verify(message, &signature).is_ok()
    }
}
