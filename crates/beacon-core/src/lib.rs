//! # Beacon Core
//!
//! Shared foundation for the threshold random beacon: data types, the
//! unified error type, configuration (including the explicit DKG phase
//! table), canonical signing payloads, and the capability traits through
//! which the protocol reaches its external collaborators.
//!
//! Protocol behavior lives in `beacon-protocol`; this crate holds no state
//! machines.

pub mod config;
pub mod crypto;
pub mod errors;
pub mod payload;
pub mod traits;
pub mod types;

pub use config::{BeaconConfig, DkgPhaseTable, PhaseTiming};
pub use crypto::Ed25519Verifier;
pub use errors::{BeaconError, ErrorCategory, Result};
pub use traits::{ClockSource, FraudProofVerifier, StakingBackend, ThresholdVerifier};
pub use types::{
    BeaconEntry, BlockHeight, DkgPhase, DkgResult, Group, GroupId, GroupPublicKey,
    ParticipantId, RelayEntryRequest, SignatureBytes,
};
