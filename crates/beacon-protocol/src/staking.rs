//! Staking gate: eligibility checks against authorized staking backends.
//!
//! The list of trusted backends is append-only and admin-gated; the protocol
//! never consults a backend outside it.

use beacon_core::{BeaconError, ParticipantId, Result, StakingBackend};
use std::sync::Arc;
use tracing::info;

/// Capability token required to authorize new staking backends.
///
/// The deployer constructs one alongside the gate and hands it to whoever
/// administers backend trust; holding the gate alone does not grant it.
#[derive(Debug)]
pub struct AdminToken {
    _private: (),
}

/// Answers "is participant P currently eligible?" against the authorized
/// backends.
pub struct StakingGate {
    backends: Vec<Arc<dyn StakingBackend>>,
}

impl StakingGate {
    /// Create an empty gate and the token that gates authorization.
    pub fn new() -> (Self, AdminToken) {
        (
            StakingGate {
                backends: Vec::new(),
            },
            AdminToken { _private: () },
        )
    }

    /// Append a backend to the trusted list. Append-only: there is no
    /// removal, matching the process-wide trust model.
    pub fn authorize_backend(&mut self, _admin: &AdminToken, backend: Arc<dyn StakingBackend>) {
        info!(backend = backend.id(), "staking backend authorized");
        self.backends.push(backend);
    }

    pub fn authorized_backends(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.id())
    }

    /// True iff some authorized backend reports at least `min_stake` for the
    /// participant. Fails when no backend has been authorized at all.
    pub fn is_eligible(&self, participant: &ParticipantId, min_stake: u64) -> Result<bool> {
        if self.backends.is_empty() {
            return Err(BeaconError::unauthorized_backend("<none>"));
        }
        Ok(self
            .backends
            .iter()
            .any(|b| b.stake_of(participant) >= min_stake))
    }

    /// Eligibility through one named backend. Rejects backends outside the
    /// authorized list.
    pub fn is_eligible_via(
        &self,
        backend_id: &str,
        participant: &ParticipantId,
        min_stake: u64,
    ) -> Result<bool> {
        let backend = self
            .backends
            .iter()
            .find(|b| b.id() == backend_id)
            .ok_or_else(|| BeaconError::unauthorized_backend(backend_id))?;
        Ok(backend.stake_of(participant) >= min_stake)
    }

    /// Deterministic snapshot of all eligible participants: union of the
    /// authorized backends' stakers, deduplicated and ordered by identity.
    pub fn eligible_pool(&self, min_stake: u64) -> Result<Vec<ParticipantId>> {
        if self.backends.is_empty() {
            return Err(BeaconError::unauthorized_backend("<none>"));
        }
        let mut pool: Vec<ParticipantId> = self
            .backends
            .iter()
            .flat_map(|b| b.stakers())
            .collect();
        pool.sort();
        pool.dedup();
        pool.retain(|p| {
            self.backends
                .iter()
                .any(|b| b.stake_of(p) >= min_stake)
        });
        Ok(pool)
    }
}
