//! # Beacon Testkit
//!
//! Deterministic test doubles for the beacon's collaborator seams: a
//! manually driven clock, a static staking backend, seeded ed25519 group
//! signers compatible with the production verifier, and fraud-proof doubles
//! for the challenge path.

use beacon_core::{
    BeaconConfig, ClockSource, DkgPhaseTable, DkgResult, FraudProofVerifier, GroupPublicKey,
    ParticipantId, SignatureBytes, StakingBackend,
};
use ed25519_dalek::{Signer, SigningKey};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Block-height clock driven by the test, never by time.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn at(height: u64) -> Self {
        ManualClock {
            height: AtomicU64::new(height),
        }
    }

    pub fn advance(&self, blocks: u64) {
        self.height.fetch_add(blocks, Ordering::SeqCst);
    }

    pub fn set(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn current_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}

/// Fixed stake table standing in for a staking contract.
pub struct StaticStakingBackend {
    name: String,
    stakes: BTreeMap<ParticipantId, u64>,
}

impl StaticStakingBackend {
    pub fn new(name: impl Into<String>, stakes: BTreeMap<ParticipantId, u64>) -> Self {
        StaticStakingBackend {
            name: name.into(),
            stakes,
        }
    }

    /// `count` participants with tags `0..count`, all staked at `stake`.
    pub fn uniform(name: impl Into<String>, count: u8, stake: u64) -> Self {
        Self::new(
            name,
            (0..count).map(|tag| (participant(tag), stake)).collect(),
        )
    }
}

impl StakingBackend for StaticStakingBackend {
    fn id(&self) -> &str {
        &self.name
    }

    fn stake_of(&self, participant: &ParticipantId) -> u64 {
        self.stakes.get(participant).copied().unwrap_or(0)
    }

    fn stakers(&self) -> Vec<ParticipantId> {
        self.stakes.keys().copied().collect()
    }
}

/// Stand-in for a group's aggregated threshold key: a single seeded ed25519
/// keypair whose signatures the production `Ed25519Verifier` accepts.
pub struct GroupSigner {
    signing_key: SigningKey,
}

impl GroupSigner {
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let key_bytes: [u8; 32] = rng.gen();
        GroupSigner {
            signing_key: SigningKey::from_bytes(&key_bytes),
        }
    }

    pub fn public_key(&self) -> GroupPublicKey {
        GroupPublicKey(self.signing_key.verifying_key().to_bytes().to_vec())
    }

    pub fn sign(&self, message: &[u8]) -> SignatureBytes {
        SignatureBytes(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

/// Fraud-proof double that accepts every proof.
pub struct AcceptAllFraudProofs;

impl FraudProofVerifier for AcceptAllFraudProofs {
    fn verify(&self, _result: &DkgResult, _proof: &[u8]) -> bool {
        true
    }
}

/// Fraud-proof double that rejects every proof.
pub struct RejectAllFraudProofs;

impl FraudProofVerifier for RejectAllFraudProofs {
    fn verify(&self, _result: &DkgResult, _proof: &[u8]) -> bool {
        false
    }
}

/// Participant with a recognizable single-byte tag.
pub fn participant(tag: u8) -> ParticipantId {
    ParticipantId::from_bytes([tag; 32])
}

/// The original deployment constants, with a genesis pair wired to
/// [`genesis_signer`].
pub fn test_config() -> BeaconConfig {
    BeaconConfig {
        group_size: 5,
        group_threshold: 3,
        timeout_initial: 4,
        timeout_submission: 4,
        timeout_challenge: 4,
        result_publication_block_step: 3,
        active_groups_threshold: 5,
        group_active_time: 300,
        relay_request_timeout: 10,
        minimum_stake: 200_000,
        genesis_seed: b"31415926535897932384626433832795".to_vec(),
        genesis_group_public_key: genesis_signer().public_key(),
        phase_table: DkgPhaseTable::default(),
    }
}

/// The signer holding the genesis group's key.
pub fn genesis_signer() -> GroupSigner {
    GroupSigner::from_seed(0x67656e65736973)
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{Ed25519Verifier, ThresholdVerifier};

    #[test]
    fn manual_clock_advances_monotonically() {
        let clock = ManualClock::at(10);
        assert_eq!(clock.current_height(), 10);
        clock.advance(5);
        assert_eq!(clock.current_height(), 15);
    }

    #[test]
    fn group_signer_is_deterministic_and_verifier_compatible() {
        let a = GroupSigner::from_seed(42);
        let b = GroupSigner::from_seed(42);
        assert_eq!(a.public_key(), b.public_key());
        let signature = a.sign(b"entry payload");
        assert!(Ed25519Verifier.verify(&a.public_key(), b"entry payload", &signature));
    }

    #[test]
    fn test_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }
}
