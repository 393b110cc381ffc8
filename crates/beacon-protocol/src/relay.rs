//! Relay-entry state machine.
//!
//! Drives one request at a time from `Idle` through `Requested` to a new
//! beacon entry, or back to `Idle` on timeout. Level-triggered: deadlines
//! are height predicates re-evaluated on every call, never timers, so a
//! timeout check at any interval gives the same answer as one every block.

use beacon_core::{
    payload, BeaconEntry, BeaconError, BlockHeight, Group, GroupPublicKey, RelayEntryRequest,
    Result, SignatureBytes, ThresholdVerifier,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum RelayState {
    Idle,
    Requested(RelayEntryRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEntryStateMachine {
    state: RelayState,
    next_request_id: u64,
    relay_request_timeout: BlockHeight,
}

impl RelayEntryStateMachine {
    pub fn new(relay_request_timeout: BlockHeight) -> Self {
        RelayEntryStateMachine {
            state: RelayState::Idle,
            next_request_id: 0,
            relay_request_timeout,
        }
    }

    pub fn pending_request(&self) -> Option<&RelayEntryRequest> {
        match &self.state {
            RelayState::Requested(request) => Some(request),
            RelayState::Idle => None,
        }
    }

    /// Open a request against `group`. The system serializes requests:
    /// rejected while an unexpired one is outstanding.
    pub fn request_entry(
        &mut self,
        previous_entry_value: Vec<u8>,
        seed: Vec<u8>,
        group: &Group,
        height: BlockHeight,
    ) -> Result<RelayEntryRequest> {
        self.check_timeout(height);
        if let RelayState::Requested(pending) = &self.state {
            return Err(BeaconError::RequestAlreadyPending {
                request_id: pending.request_id,
                deadline: pending.deadline_height,
            });
        }
        let request = RelayEntryRequest {
            request_id: self.next_request_id,
            previous_entry_value,
            seed,
            group_id: group.id,
            request_height: height,
            deadline_height: height + self.relay_request_timeout,
        };
        self.next_request_id += 1;
        info!(
            request_id = request.request_id,
            group = %request.group_id,
            height,
            deadline = request.deadline_height,
            "relay entry requested"
        );
        self.state = RelayState::Requested(request.clone());
        Ok(request)
    }

    /// Submit the group's threshold signature over the request payload.
    ///
    /// A failing signature leaves the request pending so another group
    /// member can retry before the deadline. Success produces the next
    /// beacon entry and immediately returns the machine to idle.
    pub fn submit_entry(
        &mut self,
        signature: SignatureBytes,
        group_key: &GroupPublicKey,
        verifier: &dyn ThresholdVerifier,
        height: BlockHeight,
    ) -> Result<BeaconEntry> {
        self.check_timeout(height);
        let request = match &self.state {
            RelayState::Requested(request) => request,
            RelayState::Idle => return Err(BeaconError::NoPendingRequest { height }),
        };
        let message =
            payload::relay_entry_payload(&request.previous_entry_value, &request.seed);
        if !verifier.verify(group_key, &message, &signature) {
            debug!(request_id = request.request_id, height, "entry signature rejected");
            return Err(BeaconError::InvalidSignature { signer: None });
        }
        let entry = BeaconEntry {
            value: payload::entry_value(&signature),
            producing_group: request.group_id,
            height,
        };
        info!(
            request_id = request.request_id,
            group = %request.group_id,
            height,
            value = %hex::encode(&entry.value[..8]),
            "relay entry fulfilled"
        );
        self.state = RelayState::Idle;
        Ok(entry)
    }

    /// Drop a request whose deadline has passed. Returns the discarded
    /// request when a timeout fired; penalizing its group is the fallback
    /// policy's concern, outside this machine.
    pub fn check_timeout(&mut self, height: BlockHeight) -> Option<RelayEntryRequest> {
        let timed_out = match &self.state {
            RelayState::Requested(request) if height >= request.deadline_height => {
                Some(request.clone())
            }
            _ => None,
        };
        if let Some(request) = &timed_out {
            warn!(
                request_id = request.request_id,
                deadline = request.deadline_height,
                height,
                "relay entry request timed out"
            );
            self.state = RelayState::Idle;
        }
        timed_out
    }
}
