//! Capability seams to the beacon's external collaborators.
//!
//! The protocol consumes block production, staking, and threshold
//! cryptography exclusively through these traits; no component holds a
//! concrete collaborator.

use crate::types::{DkgResult, GroupPublicKey, ParticipantId, SignatureBytes};

/// Current block height, monotonic non-decreasing, externally driven.
///
/// Pure read with no side effects. All waiting in the protocol is expressed
/// as height comparisons over this value, never as sleeping.
pub trait ClockSource: Send + Sync {
    fn current_height(&self) -> u64;
}

/// An external staking contract: who has how much at stake.
///
/// Backends must be explicitly authorized with the staking gate before the
/// protocol will consult them.
pub trait StakingBackend: Send + Sync {
    /// Stable identifier for authorization and logging.
    fn id(&self) -> &str;

    /// Current stake of `participant`, zero if unknown.
    fn stake_of(&self, participant: &ParticipantId) -> u64;

    /// Snapshot of all participants known to this backend.
    fn stakers(&self) -> Vec<ParticipantId>;
}

/// Opaque threshold-signature verification capability.
///
/// The signature scheme's algebra is not this crate's concern; a signature
/// either verifies under a group public key and message or it does not.
pub trait ThresholdVerifier: Send + Sync {
    fn verify(
        &self,
        public_key: &GroupPublicKey,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> bool;
}

/// Opaque fraud-proof verification for the post-submission challenge window.
///
/// If a proof verifies against an accepted result, that result is voided and
/// its group never activates.
pub trait FraudProofVerifier: Send + Sync {
    fn verify(&self, result: &DkgResult, proof: &[u8]) -> bool;
}
