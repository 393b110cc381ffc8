//! Unified error type for beacon operations.
//!
//! Every externally invoked operation returns `Result<_, BeaconError>`; there
//! is no silent failure. Errors carry the height (and phase, where it means
//! something) at which they were raised so a caller can decide whether to
//! retry immediately or wait for a window to open.

use crate::types::{BlockHeight, DkgPhase, ParticipantId};
use serde::{Deserialize, Serialize};

/// How a failure should be treated by the caller.
///
/// No category is fatal: every failure leaves the state machine in a
/// well-defined state from which it makes forward progress once its deadline
/// passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Wrong phase or window for the action; retry within the correct window.
    ProtocolViolation,
    /// A specific submission failed its checks; round state unchanged,
    /// another eligible party may retry.
    ValidationFailure,
    /// Not enough participants or groups right now; retry later.
    ResourceExhaustion,
    /// Another round or submission is in flight; wait for it to resolve.
    ConcurrencyConflict,
    /// Rejected at initialization; not reachable from protocol calls.
    Configuration,
}

/// Unified error type for all beacon operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BeaconError {
    /// Action attempted in the wrong DKG phase.
    #[error("wrong phase at height {height}: expected {expected}, currently {current:?}")]
    WrongPhase {
        expected: DkgPhase,
        current: Option<DkgPhase>,
        height: BlockHeight,
    },

    /// The relevant submission window is not open at this height.
    #[error("window closed at height {height}: open [{open_at}, {closed_at})")]
    WindowClosed {
        height: BlockHeight,
        open_at: BlockHeight,
        closed_at: BlockHeight,
    },

    /// Caller is not a member of the candidate group.
    #[error("{participant} is not a candidate group member")]
    NotAMember { participant: ParticipantId },

    /// A signature failed verification.
    #[error("invalid signature{}", .signer.map(|s| format!(" from {s}")).unwrap_or_default())]
    InvalidSignature { signer: Option<ParticipantId> },

    /// A result carried fewer signers than the group threshold.
    #[error("{signers} signers below threshold {threshold}")]
    TooFewSigners { signers: usize, threshold: u32 },

    /// A disqualified member appeared in the signer set.
    #[error("disqualified member {participant} cannot co-sign")]
    DisqualifiedSigner { participant: ParticipantId },

    /// A member contributed twice in the same phase.
    #[error("{participant} already contributed in phase {phase}")]
    DuplicateContribution {
        participant: ParticipantId,
        phase: DkgPhase,
    },

    /// A submitted result is structurally inconsistent.
    #[error("malformed result: {message}")]
    MalformedResult { message: String },

    /// Fewer eligible participants than a group needs.
    #[error("eligible pool has {available} members, {required} required")]
    InsufficientPool { available: usize, required: usize },

    /// No group is available to serve a relay request.
    #[error("{active} active groups, {required} required")]
    InsufficientActiveGroups { active: usize, required: usize },

    /// A relay-entry request is already being served.
    #[error("request {request_id} already pending until height {deadline}")]
    RequestAlreadyPending {
        request_id: u64,
        deadline: BlockHeight,
    },

    /// A DKG result is already awaiting its challenge window.
    #[error("a result is already pending challenge until height {challenge_deadline}")]
    ResultAlreadyPending { challenge_deadline: BlockHeight },

    /// A DKG round is already in flight; at most one runs at a time.
    #[error("a DKG round started at height {started_at} is still running")]
    DkgRoundAlreadyRunning { started_at: BlockHeight },

    /// An entry was submitted with no request outstanding.
    #[error("no relay-entry request pending at height {height}")]
    NoPendingRequest { height: BlockHeight },

    /// A staking backend outside the authorized list was consulted.
    #[error("staking backend {backend:?} is not authorized")]
    UnauthorizedBackend { backend: String },

    /// Configuration failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl BeaconError {
    pub fn malformed_result(message: impl Into<String>) -> Self {
        Self::MalformedResult {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn unauthorized_backend(backend: impl Into<String>) -> Self {
        Self::UnauthorizedBackend {
            backend: backend.into(),
        }
    }

    /// The taxonomy bucket this error falls into.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::WrongPhase { .. } | Self::WindowClosed { .. } | Self::UnauthorizedBackend { .. } => {
                ErrorCategory::ProtocolViolation
            }
            Self::NotAMember { .. }
            | Self::InvalidSignature { .. }
            | Self::TooFewSigners { .. }
            | Self::DisqualifiedSigner { .. }
            | Self::DuplicateContribution { .. }
            | Self::MalformedResult { .. } => ErrorCategory::ValidationFailure,
            Self::InsufficientPool { .. } | Self::InsufficientActiveGroups { .. } => {
                ErrorCategory::ResourceExhaustion
            }
            Self::RequestAlreadyPending { .. }
            | Self::ResultAlreadyPending { .. }
            | Self::DkgRoundAlreadyRunning { .. }
            | Self::NoPendingRequest { .. } => ErrorCategory::ConcurrencyConflict,
            Self::InvalidConfig { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Standard Result type for beacon operations.
pub type Result<T> = std::result::Result<T, BeaconError>;
