//! Canonical, domain-separated signing payloads.
//!
//! Signers and verifiers must agree byte-for-byte on what gets signed, so
//! every payload is a domain tag followed by a bincode encoding of the
//! attested fields. The signer set and signature map of a result are not
//! part of its own payload.

use crate::errors::{BeaconError, Result};
use crate::types::{DkgResult, SignatureBytes};
use sha2::{Digest, Sha256};

const DKG_RESULT_TAG: &[u8] = b"BEACON_DKG_RESULT";
const RELAY_ENTRY_TAG: &[u8] = b"BEACON_RELAY_ENTRY";

/// The bytes each signer of a `DkgResult` attests to.
pub fn dkg_result_payload(result: &DkgResult) -> Result<Vec<u8>> {
    let attested = (
        &result.group_public_key,
        &result.disqualified,
        &result.inactive,
    );
    let encoded = bincode::serialize(&attested)
        .map_err(|e| BeaconError::malformed_result(e.to_string()))?;
    let mut payload = Vec::with_capacity(DKG_RESULT_TAG.len() + encoded.len());
    payload.extend_from_slice(DKG_RESULT_TAG);
    payload.extend_from_slice(&encoded);
    Ok(payload)
}

/// The exact message a group threshold-signs to produce a relay entry.
pub fn relay_entry_payload(previous_entry_value: &[u8], seed: &[u8]) -> Vec<u8> {
    let mut payload =
        Vec::with_capacity(RELAY_ENTRY_TAG.len() + 16 + previous_entry_value.len() + seed.len());
    payload.extend_from_slice(RELAY_ENTRY_TAG);
    payload.extend_from_slice(&(previous_entry_value.len() as u64).to_be_bytes());
    payload.extend_from_slice(previous_entry_value);
    payload.extend_from_slice(&(seed.len() as u64).to_be_bytes());
    payload.extend_from_slice(seed);
    payload
}

/// Beacon output value derived from an accepted group signature. Doubles as
/// the seed for the next round's group selection.
pub fn entry_value(signature: &SignatureBytes) -> Vec<u8> {
    Sha256::digest(signature.as_bytes()).to_vec()
}
