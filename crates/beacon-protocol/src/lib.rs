//! # Beacon Protocol
//!
//! The two protocols at the heart of the threshold random beacon, plus their
//! supporting machinery:
//!
//! - **Group formation**: a staking gate snapshots the eligible population,
//!   a deterministic selector draws a candidate group, and a phased DKG
//!   state machine walks it through key generation; an accepted result
//!   survives a challenge window before the group activates in the registry.
//! - **Relay-entry production**: an active group is assigned a seed to
//!   threshold-sign; the verified signature becomes the next beacon entry
//!   and seeds the next selection.
//!
//! Everything is a pure function of `(previous state, call, current
//! height)`: no threads, no timers, no suspension. The [`beacon::Beacon`]
//! facade owns all state and sweeps height-expired rounds on every call.

pub mod beacon;
pub mod dkg;
pub mod registry;
pub mod relay;
pub mod result;
pub mod selection;
pub mod staking;

pub use beacon::{Beacon, BeaconHandle};
pub use dkg::{DkgRound, PhaseWindow};
pub use registry::GroupRegistry;
pub use relay::RelayEntryStateMachine;
pub use result::{PendingResult, ResultVerifier};
pub use selection::select_group;
pub use staking::{AdminToken, StakingGate};
