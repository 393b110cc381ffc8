//! The beacon facade: the explicit, injectable state store.
//!
//! Owns the long-lived shared state (group registry, entry history) and the
//! transient per-round state (one optional DKG round, one optional pending
//! result, one relay request). Every externally triggered call first sweeps
//! height-expired state, so waiting is always a pure predicate over
//! `(stored height, current height)` and skipped checks lose nothing.
//!
//! Collaborators arrive as capability traits at construction; there are no
//! module-level singletons and no internal threads. Callers that need
//! cross-thread access wrap the facade in [`BeaconHandle`], which serializes
//! calls through a single-writer lock.

use crate::dkg::DkgRound;
use crate::registry::GroupRegistry;
use crate::relay::RelayEntryStateMachine;
use crate::result::{PendingResult, ResultVerifier};
use crate::selection::select_group;
use crate::staking::{AdminToken, StakingGate};
use beacon_core::{
    BeaconConfig, BeaconEntry, BeaconError, BlockHeight, ClockSource, DkgPhase, DkgResult,
    FraudProofVerifier, Group, GroupId, ParticipantId, RelayEntryRequest, Result,
    SignatureBytes, StakingBackend, ThresholdVerifier,
};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Beacon {
    config: BeaconConfig,
    clock: Arc<dyn ClockSource>,
    threshold_verifier: Arc<dyn ThresholdVerifier>,
    fraud_verifier: Arc<dyn FraudProofVerifier>,
    staking: StakingGate,
    registry: GroupRegistry,
    result_verifier: ResultVerifier,
    relay: RelayEntryStateMachine,
    /// Append-only public output history.
    entries: Vec<BeaconEntry>,
    /// At most one DKG round in flight.
    dkg: Option<DkgRound>,
    /// At most one result awaiting its challenge window.
    pending_result: Option<PendingResult>,
}

impl Beacon {
    /// Validate the configuration, seed the registry with the genesis group,
    /// and hand back the admin token gating staking-backend trust.
    pub fn new(
        config: BeaconConfig,
        clock: Arc<dyn ClockSource>,
        threshold_verifier: Arc<dyn ThresholdVerifier>,
        fraud_verifier: Arc<dyn FraudProofVerifier>,
    ) -> Result<(Self, AdminToken)> {
        config.validate()?;
        let (staking, admin) = StakingGate::new();
        let mut registry =
            GroupRegistry::new(config.group_active_time, config.active_groups_threshold);
        let genesis_height = clock.current_height();
        registry.register_genesis(config.genesis_group_public_key.clone(), genesis_height);
        info!(genesis_height, "beacon initialized with genesis group");
        let beacon = Beacon {
            result_verifier: ResultVerifier::new(&config),
            relay: RelayEntryStateMachine::new(config.relay_request_timeout),
            config,
            clock,
            threshold_verifier,
            fraud_verifier,
            staking,
            registry,
            entries: Vec::new(),
            dkg: None,
            pending_result: None,
        };
        Ok((beacon, admin))
    }

    pub fn authorize_staking_backend(
        &mut self,
        admin: &AdminToken,
        backend: Arc<dyn StakingBackend>,
    ) {
        self.staking.authorize_backend(admin, backend);
    }

    /// Sweep all height-expired state. Level-triggered: the next call that
    /// observes an expired height performs the abandonment, so there is no
    /// active timer anywhere.
    fn sweep(&mut self, height: BlockHeight) -> Option<RelayEntryRequest> {
        if let Some(pending) = &self.pending_result {
            if pending.finalized(height) {
                let pending = pending.clone();
                // Unchallenged past its window: the group goes active.
                // Invariants were checked at submission; registration can
                // only fail on them, and a failed registration discards the
                // result the same way a successful challenge would.
                let registered = self.registry.register_active(
                    pending.candidate,
                    self.config.group_threshold,
                    pending.result.group_public_key,
                    height,
                );
                if let Ok(id) = registered {
                    info!(group = %id, height, "DKG result finalized unchallenged");
                }
                self.pending_result = None;
            }
        }
        if let Some(round) = &self.dkg {
            if round.expired(height) {
                info!(
                    start_height = round.start_height(),
                    height,
                    "DKG round abandoned without a result"
                );
                self.dkg = None;
            }
        }
        self.registry.expire_groups(height);
        self.relay.check_timeout(height)
    }

    // ---- group formation --------------------------------------------------

    /// Select a fresh candidate group and open a DKG round for it, seeded by
    /// the latest beacon output.
    pub fn trigger_group_formation(&mut self) -> Result<&DkgRound> {
        let height = self.clock.current_height();
        self.sweep(height);
        if let Some(round) = &self.dkg {
            return Err(BeaconError::DkgRoundAlreadyRunning {
                started_at: round.start_height(),
            });
        }
        if let Some(pending) = &self.pending_result {
            return Err(BeaconError::ResultAlreadyPending {
                challenge_deadline: pending.challenge_deadline,
            });
        }
        let pool = self.staking.eligible_pool(self.config.minimum_stake)?;
        let seed = self.latest_entry_value();
        let candidate = select_group(&seed, &pool, self.config.group_size as usize)?;
        let round = DkgRound::new(
            candidate,
            height + self.config.timeout_initial,
            self.config.phase_table.clone(),
            self.config.result_abandon_offset(),
        );
        info!(
            start_height = round.start_height(),
            abandon_height = round.abandon_height(),
            "DKG round opened"
        );
        Ok(&*self.dkg.insert(round))
    }

    /// Record a member's contribution in the currently open DKG phase.
    pub fn submit_dkg_contribution(
        &mut self,
        participant: ParticipantId,
        phase: DkgPhase,
        contribution: Vec<u8>,
    ) -> Result<()> {
        let height = self.clock.current_height();
        self.sweep(height);
        let round = self.dkg.as_mut().ok_or(BeaconError::WrongPhase {
            expected: phase,
            current: None,
            height,
        })?;
        round.submit_contribution(participant, phase, contribution, height)
    }

    /// Submit a DKG result; acceptance opens its challenge window and closes
    /// the round (a voided result means a fresh selection next trigger).
    pub fn submit_dkg_result(
        &mut self,
        result: DkgResult,
        submitter: ParticipantId,
    ) -> Result<&PendingResult> {
        let height = self.clock.current_height();
        self.sweep(height);
        let round = self.dkg.as_ref().ok_or(BeaconError::WrongPhase {
            expected: DkgPhase::ResultSubmission,
            current: None,
            height,
        })?;
        let pending = self.result_verifier.submit_result(
            round,
            self.pending_result.as_ref(),
            result,
            submitter,
            self.threshold_verifier.as_ref(),
            height,
        )?;
        self.dkg = None;
        Ok(&*self.pending_result.insert(pending))
    }

    /// Submit a fraud proof against the pending result. Success voids it:
    /// the candidate group never activates.
    pub fn challenge_result(&mut self, proof: &[u8]) -> Result<()> {
        let height = self.clock.current_height();
        self.sweep(height);
        let pending = self
            .pending_result
            .as_ref()
            .ok_or_else(|| BeaconError::malformed_result("no result pending challenge"))?;
        self.result_verifier
            .challenge(pending, proof, self.fraud_verifier.as_ref(), height)?;
        self.pending_result = None;
        Ok(())
    }

    // ---- relay entries ----------------------------------------------------

    /// Open a relay-entry request for `seed`, assigning a signer group.
    pub fn request_entry(&mut self, seed: Vec<u8>) -> Result<RelayEntryRequest> {
        let height = self.clock.current_height();
        self.sweep(height);
        if self.registry.needs_group_formation(height) {
            debug!(
                active = self.registry.active_count(height),
                required = self.config.active_groups_threshold,
                "active group population below threshold"
            );
        }
        // Refuse before consulting the registry: a rejected request must
        // not consume a rotation turn.
        if let Some(pending) = self.relay.pending_request() {
            return Err(BeaconError::RequestAlreadyPending {
                request_id: pending.request_id,
                deadline: pending.deadline_height,
            });
        }
        let group = self.registry.select_signer_group(height)?.clone();
        let previous = self.latest_entry_value();
        self.relay.request_entry(previous, seed, &group, height)
    }

    /// Submit the assigned group's signature; success appends the next
    /// beacon entry, whose value seeds the next selection round.
    pub fn submit_entry(&mut self, signature: SignatureBytes) -> Result<BeaconEntry> {
        let height = self.clock.current_height();
        self.sweep(height);
        let group_id = match self.relay.pending_request() {
            Some(request) => request.group_id,
            None => return Err(BeaconError::NoPendingRequest { height }),
        };
        let group_key = self
            .registry
            .group(group_id)
            .map(|g| g.public_key.clone())
            .ok_or_else(|| BeaconError::malformed_result("assigned group missing"))?;
        let entry = self.relay.submit_entry(
            signature,
            &group_key,
            self.threshold_verifier.as_ref(),
            height,
        )?;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Explicit timeout check; any other call performs the same sweep.
    pub fn check_timeout(&mut self) -> Option<RelayEntryRequest> {
        let height = self.clock.current_height();
        self.sweep(height)
    }

    // ---- read-only queries ------------------------------------------------

    pub fn entries(&self) -> &[BeaconEntry] {
        &self.entries
    }

    pub fn latest_entry(&self) -> Option<&BeaconEntry> {
        self.entries.last()
    }

    /// The latest output value, or the genesis seed before any entry exists.
    /// This is both the next request's previous-entry value and the seed for
    /// the next group selection.
    pub fn latest_entry_value(&self) -> Vec<u8> {
        self.entries
            .last()
            .map(|e| e.value.clone())
            .unwrap_or_else(|| self.config.genesis_seed.clone())
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.registry.group(id)
    }

    pub fn groups(&self) -> &[Group] {
        self.registry.groups()
    }

    pub fn dkg_round(&self) -> Option<&DkgRound> {
        self.dkg.as_ref()
    }

    pub fn pending_result(&self) -> Option<&PendingResult> {
        self.pending_result.as_ref()
    }

    /// The DKG phase open right now, if a round is in flight.
    pub fn current_dkg_phase(&self) -> Option<DkgPhase> {
        self.dkg
            .as_ref()
            .and_then(|round| round.current_phase(self.clock.current_height()))
    }

    pub fn needs_group_formation(&self) -> bool {
        self.registry
            .needs_group_formation(self.clock.current_height())
    }

    pub fn pending_request(&self) -> Option<&RelayEntryRequest> {
        self.relay.pending_request()
    }
}

/// Single-writer wrapper matching the externally-enforced total order of
/// calls: one call is processed atomically at a time.
#[derive(Clone)]
pub struct BeaconHandle {
    inner: Arc<Mutex<Beacon>>,
}

impl BeaconHandle {
    pub fn new(beacon: Beacon) -> Self {
        BeaconHandle {
            inner: Arc::new(Mutex::new(beacon)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Beacon> {
        self.inner.lock()
    }
}
