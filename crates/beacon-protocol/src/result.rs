//! DKG result verification and the post-submission challenge window.
//!
//! A submitted result must land in its submitter's publication window, carry
//! a threshold of verifying co-signatures, and exclude disqualified members
//! from its signer set. Acceptance opens a challenge window; only an
//! unchallenged result registers a group.

use crate::dkg::DkgRound;
use beacon_core::{
    payload, BeaconConfig, BeaconError, BlockHeight, DkgResult, FraudProofVerifier,
    ParticipantId, Result, ThresholdVerifier,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// An accepted result waiting out its challenge window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResult {
    pub result: DkgResult,
    pub submitter: ParticipantId,
    /// Selection-ordered candidate whose key this result finalizes.
    pub candidate: Vec<ParticipantId>,
    pub accept_height: BlockHeight,
    pub challenge_deadline: BlockHeight,
}

impl PendingResult {
    /// Whether the challenge window has elapsed without a successful fraud
    /// proof, making the result final.
    pub fn finalized(&self, height: BlockHeight) -> bool {
        height >= self.challenge_deadline
    }
}

/// Validates submitted results against phase, signature-count, and
/// membership rules.
#[derive(Debug, Clone)]
pub struct ResultVerifier {
    group_threshold: u32,
    result_publication_block_step: BlockHeight,
    timeout_challenge: BlockHeight,
}

impl ResultVerifier {
    pub fn new(config: &BeaconConfig) -> Self {
        ResultVerifier {
            group_threshold: config.group_threshold,
            result_publication_block_step: config.result_publication_block_step,
            timeout_challenge: config.timeout_challenge,
        }
    }

    /// First height at which `rank` holds the exclusive submission right.
    pub fn rank_window_opens_at(&self, round: &DkgRound, rank: usize) -> BlockHeight {
        round.result_submission_open_at() + rank as u64 * self.result_publication_block_step
    }

    /// Validate a result submission. On success returns the pending record
    /// whose challenge window the caller must track.
    pub fn submit_result(
        &self,
        round: &DkgRound,
        pending: Option<&PendingResult>,
        result: DkgResult,
        submitter: ParticipantId,
        verifier: &dyn ThresholdVerifier,
        height: BlockHeight,
    ) -> Result<PendingResult> {
        if let Some(pending) = pending {
            return Err(BeaconError::ResultAlreadyPending {
                challenge_deadline: pending.challenge_deadline,
            });
        }
        let rank = round
            .rank(&submitter)
            .ok_or(BeaconError::NotAMember {
                participant: submitter,
            })?;
        let open_at = self.rank_window_opens_at(round, rank);
        if height < open_at || round.expired(height) {
            return Err(BeaconError::WindowClosed {
                height,
                open_at,
                closed_at: round.abandon_height(),
            });
        }

        self.check_result(round, &result, verifier)?;

        let pending = PendingResult {
            result,
            submitter,
            candidate: round.candidate().to_vec(),
            accept_height: height,
            challenge_deadline: height + self.timeout_challenge,
        };
        info!(
            %submitter,
            rank,
            height,
            challenge_deadline = pending.challenge_deadline,
            "DKG result accepted, challenge window open"
        );
        Ok(pending)
    }

    fn check_result(
        &self,
        round: &DkgRound,
        result: &DkgResult,
        verifier: &dyn ThresholdVerifier,
    ) -> Result<()> {
        for signer in &result.signers {
            if round.rank(signer).is_none() {
                return Err(BeaconError::malformed_result(format!(
                    "signer {signer} is not a candidate member"
                )));
            }
            if result.disqualified.contains(signer) {
                return Err(BeaconError::DisqualifiedSigner {
                    participant: *signer,
                });
            }
        }
        if result.signers.len() < self.group_threshold as usize {
            return Err(BeaconError::TooFewSigners {
                signers: result.signers.len(),
                threshold: self.group_threshold,
            });
        }
        for extra in result.signatures.keys() {
            if !result.signers.contains(extra) {
                return Err(BeaconError::malformed_result(format!(
                    "signature from {extra} outside the signer set"
                )));
            }
        }

        let message = payload::dkg_result_payload(result)?;
        for signer in &result.signers {
            let signature = result.signatures.get(signer).ok_or_else(|| {
                BeaconError::malformed_result(format!("signer {signer} carries no signature"))
            })?;
            if !verifier.verify(&result.group_public_key, &message, signature) {
                return Err(BeaconError::InvalidSignature {
                    signer: Some(*signer),
                });
            }
        }
        Ok(())
    }

    /// Try to void a pending result with a fraud proof. `Ok(())` means the
    /// result is voided and its group must never activate.
    pub fn challenge(
        &self,
        pending: &PendingResult,
        proof: &[u8],
        fraud_verifier: &dyn FraudProofVerifier,
        height: BlockHeight,
    ) -> Result<()> {
        if pending.finalized(height) {
            return Err(BeaconError::WindowClosed {
                height,
                open_at: pending.accept_height,
                closed_at: pending.challenge_deadline,
            });
        }
        if !fraud_verifier.verify(&pending.result, proof) {
            return Err(BeaconError::malformed_result("fraud proof rejected"));
        }
        warn!(
            submitter = %pending.submitter,
            accept_height = pending.accept_height,
            height,
            "pending DKG result voided by fraud proof"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{DkgPhaseTable, GroupPublicKey, SignatureBytes};
    use std::collections::{BTreeMap, BTreeSet};

    struct AcceptAll;
    impl ThresholdVerifier for AcceptAll {
        fn verify(&self, _: &GroupPublicKey, _: &[u8], _: &SignatureBytes) -> bool {
            true
        }
    }

    struct RejectAll;
    impl ThresholdVerifier for RejectAll {
        fn verify(&self, _: &GroupPublicKey, _: &[u8], _: &SignatureBytes) -> bool {
            false
        }
    }

    struct ProofAlwaysValid;
    impl FraudProofVerifier for ProofAlwaysValid {
        fn verify(&self, _: &DkgResult, _: &[u8]) -> bool {
            true
        }
    }

    struct ProofNeverValid;
    impl FraudProofVerifier for ProofNeverValid {
        fn verify(&self, _: &DkgResult, _: &[u8]) -> bool {
            false
        }
    }

    fn participant(tag: u8) -> ParticipantId {
        ParticipantId::from_bytes([tag; 32])
    }

    fn config() -> BeaconConfig {
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
            genesis_seed: vec![3, 1, 4],
            genesis_group_public_key: GroupPublicKey(vec![0x1f; 32]),
            phase_table: DkgPhaseTable::default(),
        }
    }

    fn round() -> DkgRound {
        let candidate = (0..5).map(participant).collect();
        DkgRound::new(candidate, 100, DkgPhaseTable::default(), 15)
    }

    fn result_signed_by(signers: &[u8]) -> DkgResult {
        let signers: BTreeSet<ParticipantId> = signers.iter().map(|t| participant(*t)).collect();
        let signatures: BTreeMap<ParticipantId, SignatureBytes> = signers
            .iter()
            .map(|s| (*s, SignatureBytes(vec![0xaa; 64])))
            .collect();
        DkgResult {
            group_public_key: GroupPublicKey(vec![0x42; 32]),
            disqualified: BTreeSet::new(),
            inactive: BTreeSet::new(),
            signers,
            signatures,
        }
    }

    // Result window opens at 128; rank 0's sub-window starts there.

    #[test]
    fn accepts_a_well_formed_result_in_window() {
        let verifier = ResultVerifier::new(&config());
        let pending = verifier
            .submit_result(
                &round(),
                None,
                result_signed_by(&[0, 1, 2]),
                participant(0),
                &AcceptAll,
                128,
            )
            .unwrap();
        assert_eq!(pending.accept_height, 128);
        assert_eq!(pending.challenge_deadline, 132);
    }

    #[test]
    fn one_block_before_the_rank_window_is_rejected() {
        let verifier = ResultVerifier::new(&config());
        // Rank 2 opens at 128 + 2*3 = 134.
        let err = verifier
            .submit_result(
                &round(),
                None,
                result_signed_by(&[0, 1, 2]),
                participant(2),
                &AcceptAll,
                133,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BeaconError::WindowClosed {
                height: 133,
                open_at: 134,
                ..
            }
        ));
    }

    #[test]
    fn past_the_abandon_height_is_rejected() {
        let verifier = ResultVerifier::new(&config());
        let err = verifier
            .submit_result(
                &round(),
                None,
                result_signed_by(&[0, 1, 2]),
                participant(0),
                &AcceptAll,
                143,
            )
            .unwrap_err();
        assert!(matches!(err, BeaconError::WindowClosed { .. }));
    }

    #[test]
    fn too_few_signers_is_always_rejected() {
        let verifier = ResultVerifier::new(&config());
        let err = verifier
            .submit_result(
                &round(),
                None,
                result_signed_by(&[0, 1]),
                participant(0),
                &AcceptAll,
                128,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BeaconError::TooFewSigners {
                signers: 2,
                threshold: 3
            }
        ));
    }

    #[test]
    fn disqualified_members_cannot_cosign() {
        let verifier = ResultVerifier::new(&config());
        let mut result = result_signed_by(&[0, 1, 2]);
        result.disqualified.insert(participant(1));
        let err = verifier
            .submit_result(&round(), None, result, participant(0), &AcceptAll, 128)
            .unwrap_err();
        assert!(matches!(err, BeaconError::DisqualifiedSigner { .. }));
    }

    #[test]
    fn failing_signatures_reject_the_submission() {
        let verifier = ResultVerifier::new(&config());
        let err = verifier
            .submit_result(
                &round(),
                None,
                result_signed_by(&[0, 1, 2]),
                participant(0),
                &RejectAll,
                128,
            )
            .unwrap_err();
        assert!(matches!(err, BeaconError::InvalidSignature { .. }));
    }

    #[test]
    fn second_submission_while_pending_is_rejected() {
        let verifier = ResultVerifier::new(&config());
        let round = round();
        let pending = verifier
            .submit_result(
                &round,
                None,
                result_signed_by(&[0, 1, 2]),
                participant(0),
                &AcceptAll,
                128,
            )
            .unwrap();
        let err = verifier
            .submit_result(
                &round,
                Some(&pending),
                result_signed_by(&[0, 1, 2]),
                participant(1),
                &AcceptAll,
                131,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BeaconError::ResultAlreadyPending {
                challenge_deadline: 132
            }
        ));
    }

    #[test]
    fn valid_fraud_proof_voids_within_the_window() {
        let verifier = ResultVerifier::new(&config());
        let pending = verifier
            .submit_result(
                &round(),
                None,
                result_signed_by(&[0, 1, 2]),
                participant(0),
                &AcceptAll,
                128,
            )
            .unwrap();
        assert!(verifier
            .challenge(&pending, b"proof", &ProofAlwaysValid, 130)
            .is_ok());
        // Window closes at accept + timeout_challenge.
        let err = verifier
            .challenge(&pending, b"proof", &ProofAlwaysValid, 132)
            .unwrap_err();
        assert!(matches!(err, BeaconError::WindowClosed { .. }));
        // A proof that does not verify changes nothing.
        assert!(verifier
            .challenge(&pending, b"proof", &ProofNeverValid, 130)
            .is_err());
    }
}
