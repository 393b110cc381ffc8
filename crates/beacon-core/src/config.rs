//! Beacon configuration.
//!
//! All parameters are recognized at initialization and validated up front.
//! The DKG phase table is explicit configuration rather than arithmetic
//! scattered across call sites: seven `(active_blocks, delay_blocks)` pairs,
//! any of which may be silent (both zero).

use crate::errors::{BeaconError, Result};
use crate::types::{BlockHeight, DkgPhase, GroupPublicKey};
use serde::{Deserialize, Serialize};

/// Timing of one messaging phase: an active sub-window during which
/// contributions are accepted, then a delay sub-window enforcing a floor on
/// message propagation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub active_blocks: u64,
    pub delay_blocks: u64,
}

impl PhaseTiming {
    pub const fn new(active_blocks: u64, delay_blocks: u64) -> Self {
        PhaseTiming {
            active_blocks,
            delay_blocks,
        }
    }

    /// A phase with no on-chain interaction at all.
    pub const fn silent() -> Self {
        PhaseTiming::new(0, 0)
    }

    pub fn total(&self) -> u64 {
        self.active_blocks + self.delay_blocks
    }
}

/// Per-phase timing for the seven messaging phases, indexed in protocol
/// order. The result-submission window opens once every entry has elapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DkgPhaseTable([PhaseTiming; 7]);

impl DkgPhaseTable {
    pub fn new(timings: [PhaseTiming; 7]) -> Self {
        DkgPhaseTable(timings)
    }

    pub fn timing(&self, phase: DkgPhase) -> Option<PhaseTiming> {
        phase.table_index().map(|i| self.0[i])
    }

    /// Height offset from round start at which `phase` opens.
    pub fn phase_offset(&self, phase: DkgPhase) -> u64 {
        let upto = phase.table_index().unwrap_or(self.0.len());
        self.0[..upto].iter().map(PhaseTiming::total).sum()
    }

    /// Total block budget of all messaging phases. The result-submission
    /// window opens this many blocks after the round starts.
    pub fn time_dkg(&self) -> u64 {
        self.phase_offset(DkgPhase::ResultSubmission)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DkgPhase, PhaseTiming)> + '_ {
        DkgPhase::MESSAGING.iter().zip(self.0.iter()).map(|(p, t)| (*p, *t))
    }
}

impl Default for DkgPhaseTable {
    /// All seven phases messaging with 3 active + 1 delay blocks each,
    /// for a 28-block total.
    fn default() -> Self {
        DkgPhaseTable([PhaseTiming::new(3, 1); 7])
    }
}

/// Full beacon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Number of members selected into each candidate group.
    pub group_size: u32,
    /// Signer count a DKG result must reach before acceptance.
    pub group_threshold: u32,
    /// Settling delay between a formation trigger and the first DKG phase.
    pub timeout_initial: BlockHeight,
    /// Blocks after the result window opens before an unsubmitted round is
    /// abandoned.
    pub timeout_submission: BlockHeight,
    /// Length of the post-acceptance challenge window.
    pub timeout_challenge: BlockHeight,
    /// Width of each submitter rank's exclusive result-submission sub-window.
    pub result_publication_block_step: BlockHeight,
    /// Active-group count below which new group formation is triggered.
    pub active_groups_threshold: u32,
    /// Blocks a group stays active past its registration.
    pub group_active_time: BlockHeight,
    /// Blocks a relay-entry request may stay unanswered.
    pub relay_request_timeout: BlockHeight,
    /// Stake floor for DKG eligibility.
    pub minimum_stake: u64,
    /// Seed for the very first entry, before any DKG has run.
    pub genesis_seed: Vec<u8>,
    /// Public key the bootstrap group signs under.
    pub genesis_group_public_key: GroupPublicKey,
    #[serde(default)]
    pub phase_table: DkgPhaseTable,
}

impl BeaconConfig {
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(BeaconError::invalid_config("group_size must be non-zero"));
        }
        if self.group_threshold == 0 || self.group_threshold > self.group_size {
            return Err(BeaconError::invalid_config(format!(
                "group_threshold {} must be in 1..={}",
                self.group_threshold, self.group_size
            )));
        }
        if self.timeout_initial == 0 {
            return Err(BeaconError::invalid_config(
                "timeout_initial must be non-zero",
            ));
        }
        if self.timeout_submission == 0 {
            return Err(BeaconError::invalid_config(
                "timeout_submission must be non-zero",
            ));
        }
        if self.timeout_challenge == 0 {
            return Err(BeaconError::invalid_config(
                "timeout_challenge must be non-zero",
            ));
        }
        if self.result_publication_block_step == 0 {
            return Err(BeaconError::invalid_config(
                "result_publication_block_step must be non-zero",
            ));
        }
        if self.relay_request_timeout == 0 {
            return Err(BeaconError::invalid_config(
                "relay_request_timeout must be non-zero",
            ));
        }
        if self.group_active_time == 0 {
            return Err(BeaconError::invalid_config(
                "group_active_time must be non-zero",
            ));
        }
        if self.genesis_seed.is_empty() {
            return Err(BeaconError::invalid_config("genesis_seed must be non-empty"));
        }
        if self.genesis_group_public_key.0.is_empty() {
            return Err(BeaconError::invalid_config(
                "genesis_group_public_key must be non-empty",
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: BeaconConfig = toml::from_str(raw)
            .map_err(|e| BeaconError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Height at which the whole result round is abandoned, relative to the
    /// result window's opening. Every rank's exclusive sub-window must have
    /// elapsed, and at least `timeout_submission` blocks must have passed.
    pub fn result_abandon_offset(&self) -> u64 {
        let all_ranks = self.group_size as u64 * self.result_publication_block_step;
        all_ranks.max(self.timeout_submission)
    }
}
