//! Core beacon data types.
//!
//! Everything here is plain serde data: identities, groups, DKG results, and
//! beacon entries. Protocol behavior lives in `beacon-protocol`; these types
//! only enforce their own structural invariants.

use crate::errors::{BeaconError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Block height. All protocol timing is expressed in heights, never wall-clock.
pub type BlockHeight = u64;

/// Opaque identity handle for a staked participant.
///
/// The beacon references participants by identity only; stake amounts are
/// read through the staking seam and never stored here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId([u8; 32]);

impl ParticipantId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ParticipantId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &hex::encode(self.0)[..8])
    }
}

/// Registration-order index of a group in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Opaque group public key (curve point bytes).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupPublicKey(pub Vec<u8>);

impl GroupPublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for GroupPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Opaque signature material.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureBytes(pub Vec<u8>);

impl SignatureBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A registered signing group.
///
/// Immutable once registered except for the `active` flag; groups are never
/// deleted so that historical entries stay verifiable against the group that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Ordered membership, fixed at registration (selection order).
    pub members: Vec<ParticipantId>,
    pub threshold: u32,
    pub public_key: GroupPublicKey,
    pub registration_height: BlockHeight,
    pub expiration_height: BlockHeight,
    pub active: bool,
}

impl Group {
    /// Invariant check: `threshold <= |members|`.
    pub fn validate(&self) -> Result<()> {
        if self.threshold as usize > self.members.len() {
            return Err(BeaconError::invalid_config(format!(
                "group threshold {} exceeds member count {}",
                self.threshold,
                self.members.len()
            )));
        }
        Ok(())
    }

    /// Whether the group's active window has elapsed at `height`.
    pub fn expired(&self, height: BlockHeight) -> bool {
        height >= self.expiration_height
    }
}

/// The seven messaging rounds of the phased key generation, plus the
/// result-submission window that follows them.
///
/// Messaging phases accept member contributions during their active
/// sub-window; the result-submission window accepts only a `DkgResult`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DkgPhase {
    EphemeralKeyGeneration,
    EphemeralKeyBroadcast,
    PolynomialCommitment,
    ShareDistribution,
    ShareVerification,
    Complaint,
    ComplaintResolution,
    ResultSubmission,
}

impl DkgPhase {
    /// Messaging phases, in protocol order.
    pub const MESSAGING: [DkgPhase; 7] = [
        DkgPhase::EphemeralKeyGeneration,
        DkgPhase::EphemeralKeyBroadcast,
        DkgPhase::PolynomialCommitment,
        DkgPhase::ShareDistribution,
        DkgPhase::ShareVerification,
        DkgPhase::Complaint,
        DkgPhase::ComplaintResolution,
    ];

    /// Index into the phase table, `None` for the result-submission window.
    pub fn table_index(&self) -> Option<usize> {
        Self::MESSAGING.iter().position(|p| p == self)
    }
}

impl fmt::Display for DkgPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DkgPhase::EphemeralKeyGeneration => "ephemeral-key-generation",
            DkgPhase::EphemeralKeyBroadcast => "ephemeral-key-broadcast",
            DkgPhase::PolynomialCommitment => "polynomial-commitment",
            DkgPhase::ShareDistribution => "share-distribution",
            DkgPhase::ShareVerification => "share-verification",
            DkgPhase::Complaint => "complaint",
            DkgPhase::ComplaintResolution => "complaint-resolution",
            DkgPhase::ResultSubmission => "result-submission",
        };
        f.write_str(name)
    }
}

/// Outcome of one DKG round, as submitted for verification.
///
/// Immutable once accepted. `signers` and `signatures` attest to the rest of
/// the payload; the bytes being attested are produced by
/// [`crate::payload::dkg_result_payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgResult {
    pub group_public_key: GroupPublicKey,
    /// Members disqualified during the protocol (misbehavior).
    pub disqualified: BTreeSet<ParticipantId>,
    /// Members that went silent during a messaging phase.
    pub inactive: BTreeSet<ParticipantId>,
    /// Members co-signing this result.
    pub signers: BTreeSet<ParticipantId>,
    pub signatures: BTreeMap<ParticipantId, SignatureBytes>,
}

/// One outstanding relay-entry request. The system serializes requests:
/// at most one of these exists at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEntryRequest {
    pub request_id: u64,
    pub previous_entry_value: Vec<u8>,
    pub seed: Vec<u8>,
    pub group_id: GroupId,
    pub request_height: BlockHeight,
    pub deadline_height: BlockHeight,
}

/// One published random value in the beacon's output sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconEntry {
    pub value: Vec<u8>,
    pub producing_group: GroupId,
    pub height: BlockHeight,
}
