//! Phased DKG state machine.
//!
//! One `DkgRound` exists per candidate group and is discarded on timeout or
//! finalization. Phase boundaries are computed purely from the round's start
//! height and the configured phase table, so no two observers can disagree
//! on the current phase. The machine never waits: every deadline is a height
//! comparison evaluated at call time.

use beacon_core::{
    BeaconError, BlockHeight, DkgPhase, DkgPhaseTable, ParticipantId, Result,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Height window of one messaging phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWindow {
    pub phase: DkgPhase,
    /// First height of the active sub-window.
    pub open_at: BlockHeight,
    /// First height past the active sub-window; the delay sub-window runs
    /// from here until `next_open`.
    pub active_until: BlockHeight,
    /// First height of the next phase.
    pub next_open: BlockHeight,
}

/// State of one candidate group's key-generation run.
#[derive(Debug, Clone)]
pub struct DkgRound {
    candidate: Vec<ParticipantId>,
    start_height: BlockHeight,
    table: DkgPhaseTable,
    /// Height at which an unconcluded round is abandoned.
    abandon_height: BlockHeight,
    contributions: BTreeMap<DkgPhase, BTreeMap<ParticipantId, Vec<u8>>>,
}

impl DkgRound {
    /// Open a round for `candidate` starting at `start_height`.
    /// `abandon_offset` is how long the result-submission window stays open.
    pub fn new(
        candidate: Vec<ParticipantId>,
        start_height: BlockHeight,
        table: DkgPhaseTable,
        abandon_offset: u64,
    ) -> Self {
        let abandon_height = start_height + table.time_dkg() + abandon_offset;
        DkgRound {
            candidate,
            start_height,
            table,
            abandon_height,
            contributions: BTreeMap::new(),
        }
    }

    pub fn candidate(&self) -> &[ParticipantId] {
        &self.candidate
    }

    pub fn start_height(&self) -> BlockHeight {
        self.start_height
    }

    /// A member's rank: its index in the selection-ordered candidate group.
    pub fn rank(&self, participant: &ParticipantId) -> Option<usize> {
        self.candidate.iter().position(|p| p == participant)
    }

    /// Windows of the seven messaging phases, in protocol order. Silent
    /// phases occupy zero heights and are skipped by the height math.
    pub fn phase_windows(&self) -> Vec<PhaseWindow> {
        let mut open_at = self.start_height;
        self.table
            .iter()
            .map(|(phase, timing)| {
                let window = PhaseWindow {
                    phase,
                    open_at,
                    active_until: open_at + timing.active_blocks,
                    next_open: open_at + timing.total(),
                };
                open_at = window.next_open;
                window
            })
            .collect()
    }

    /// First height of the result-submission window: every messaging phase's
    /// active and delay sub-windows must have elapsed.
    pub fn result_submission_open_at(&self) -> BlockHeight {
        self.start_height + self.table.time_dkg()
    }

    /// Height at which the round is abandoned if no result was accepted.
    pub fn abandon_height(&self) -> BlockHeight {
        self.abandon_height
    }

    /// Whether the round has outlived its result window without concluding.
    pub fn expired(&self, height: BlockHeight) -> bool {
        height >= self.abandon_height
    }

    /// The phase open at `height`, `None` before the round starts or after
    /// it is abandoned. Derived purely from heights: all observers agree.
    pub fn current_phase(&self, height: BlockHeight) -> Option<DkgPhase> {
        if height < self.start_height || self.expired(height) {
            return None;
        }
        for window in self.phase_windows() {
            if height < window.next_open {
                return Some(window.phase);
            }
        }
        Some(DkgPhase::ResultSubmission)
    }

    /// Record a member's contribution for a messaging phase.
    ///
    /// Accepted only during that phase's active sub-window; the delay
    /// sub-window and every other phase reject the input. First contribution
    /// wins; a repeat from the same member is rejected.
    pub fn submit_contribution(
        &mut self,
        participant: ParticipantId,
        phase: DkgPhase,
        contribution: Vec<u8>,
        height: BlockHeight,
    ) -> Result<()> {
        if self.rank(&participant).is_none() {
            return Err(BeaconError::NotAMember { participant });
        }
        let current = self.current_phase(height);
        if current != Some(phase) || phase == DkgPhase::ResultSubmission {
            return Err(BeaconError::WrongPhase {
                expected: phase,
                current,
                height,
            });
        }
        let window = self
            .phase_windows()
            .into_iter()
            .find(|w| w.phase == phase)
            .ok_or(BeaconError::WrongPhase {
                expected: phase,
                current,
                height,
            })?;
        if height >= window.active_until {
            // Delay sub-window: the phase is current but accepts nothing.
            return Err(BeaconError::WindowClosed {
                height,
                open_at: window.open_at,
                closed_at: window.active_until,
            });
        }
        let phase_contributions = self.contributions.entry(phase).or_default();
        if phase_contributions.contains_key(&participant) {
            return Err(BeaconError::DuplicateContribution { participant, phase });
        }
        phase_contributions.insert(participant, contribution);
        debug!(%participant, %phase, height, "contribution recorded");
        Ok(())
    }

    pub fn contributions(&self, phase: DkgPhase) -> Option<&BTreeMap<ParticipantId, Vec<u8>>> {
        self.contributions.get(&phase)
    }

    /// Members that missed at least one fully-elapsed messaging phase with a
    /// non-empty active window. These are the candidates for a result's
    /// `inactive` set; the machine advances past them rather than stalling.
    pub fn inactive_candidates(&self, height: BlockHeight) -> BTreeSet<ParticipantId> {
        let mut inactive = BTreeSet::new();
        for window in self.phase_windows() {
            if window.active_until > window.open_at && height >= window.active_until {
                let contributed = self.contributions.get(&window.phase);
                for member in &self.candidate {
                    let seen = contributed.is_some_and(|c| c.contains_key(member));
                    if !seen {
                        inactive.insert(*member);
                    }
                }
            }
        }
        inactive
    }
}
