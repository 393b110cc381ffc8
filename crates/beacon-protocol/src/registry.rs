//! Group registry: the ordered history of signing groups.
//!
//! Groups are append-only and never deleted; expiry only clears the `active`
//! flag so that entries produced by an old group stay verifiable against it.

use beacon_core::{
    BeaconError, BlockHeight, Group, GroupId, GroupPublicKey, ParticipantId, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRegistry {
    groups: Vec<Group>,
    group_active_time: BlockHeight,
    active_groups_threshold: u32,
    /// Registration-order cursor for round-robin signer selection.
    cursor: u64,
}

impl GroupRegistry {
    pub fn new(group_active_time: BlockHeight, active_groups_threshold: u32) -> Self {
        GroupRegistry {
            groups: Vec::new(),
            group_active_time,
            active_groups_threshold,
            cursor: 0,
        }
    }

    /// Register a freshly formed group; it becomes active immediately.
    pub fn register_active(
        &mut self,
        members: Vec<ParticipantId>,
        threshold: u32,
        public_key: GroupPublicKey,
        height: BlockHeight,
    ) -> Result<GroupId> {
        let group = Group {
            id: GroupId(self.groups.len() as u64),
            members,
            threshold,
            public_key,
            registration_height: height,
            expiration_height: height + self.group_active_time,
            active: true,
        };
        group.validate()?;
        info!(id = %group.id, height, members = group.members.len(), "group registered");
        let id = group.id;
        self.groups.push(group);
        Ok(id)
    }

    /// Seed the registry with the bootstrap group: no members, only the
    /// configured public key. Lets the first relay request be served before
    /// any DKG has run.
    pub fn register_genesis(&mut self, public_key: GroupPublicKey, height: BlockHeight) -> GroupId {
        // Zero members, zero threshold: the invariant holds trivially and
        // verification only ever touches the public key.
        #[allow(clippy::unwrap_used)]
        self.register_active(Vec::new(), 0, public_key, height).unwrap()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0 as usize)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn serving(&self, group: &Group, height: BlockHeight) -> bool {
        group.active && !group.expired(height)
    }

    pub fn active_count(&self, height: BlockHeight) -> usize {
        self.groups.iter().filter(|g| self.serving(g, height)).count()
    }

    /// Mark groups past their active window as inactive. Level-triggered:
    /// selection double-checks expiry, so skipping calls loses nothing.
    pub fn expire_groups(&mut self, height: BlockHeight) -> usize {
        let mut expired = 0;
        for group in &mut self.groups {
            if group.active && group.expired(height) {
                group.active = false;
                expired += 1;
                debug!(id = %group.id, height, "group expired");
            }
        }
        expired
    }

    /// Pick the signer group for a relay request: round-robin by
    /// registration order over still-active groups, preferring the oldest,
    /// to spread signing load.
    pub fn select_signer_group(&mut self, request_height: BlockHeight) -> Result<&Group> {
        let chosen = self
            .groups
            .iter()
            .filter(|g| self.serving(g, request_height))
            .map(|g| g.id)
            .find(|id| id.0 >= self.cursor)
            .or_else(|| {
                self.groups
                    .iter()
                    .find(|g| self.serving(g, request_height))
                    .map(|g| g.id)
            })
            .ok_or(BeaconError::InsufficientActiveGroups {
                active: 0,
                required: 1,
            })?;
        self.cursor = chosen.0 + 1;
        Ok(&self.groups[chosen.0 as usize])
    }

    /// Whether the active population has dropped far enough that a new DKG
    /// round should be triggered upstream.
    pub fn needs_group_formation(&self, height: BlockHeight) -> bool {
        self.active_count(height) < self.active_groups_threshold as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(tag: u8) -> ParticipantId {
        ParticipantId::from_bytes([tag; 32])
    }

    fn members(base: u8) -> Vec<ParticipantId> {
        (base..base + 3).map(participant).collect()
    }

    fn key(tag: u8) -> GroupPublicKey {
        GroupPublicKey(vec![tag; 32])
    }

    fn registry() -> GroupRegistry {
        GroupRegistry::new(300, 5)
    }

    #[test]
    fn registration_assigns_sequential_ids() {
        let mut registry = registry();
        let a = registry.register_active(members(0), 2, key(1), 10).unwrap();
        let b = registry.register_active(members(10), 2, key(2), 20).unwrap();
        assert_eq!(a, GroupId(0));
        assert_eq!(b, GroupId(1));
        assert_eq!(registry.group(b).unwrap().expiration_height, 320);
    }

    #[test]
    fn invariant_violations_are_rejected() {
        let mut registry = registry();
        assert!(registry.register_active(members(0), 4, key(1), 10).is_err());
    }

    #[test]
    fn selection_rotates_oldest_first() {
        let mut registry = registry();
        registry.register_active(members(0), 2, key(1), 10).unwrap();
        registry.register_active(members(10), 2, key(2), 10).unwrap();
        registry.register_active(members(20), 2, key(3), 10).unwrap();
        let picks: Vec<GroupId> = (0..4)
            .map(|_| registry.select_signer_group(50).unwrap().id)
            .collect();
        assert_eq!(picks, vec![GroupId(0), GroupId(1), GroupId(2), GroupId(0)]);
    }

    #[test]
    fn expired_groups_are_skipped_but_stay_queryable() {
        let mut registry = registry();
        let old = registry.register_active(members(0), 2, key(1), 0).unwrap();
        let fresh = registry.register_active(members(10), 2, key(2), 200).unwrap();
        assert_eq!(registry.expire_groups(310), 1);
        assert_eq!(registry.select_signer_group(310).unwrap().id, fresh);
        let old_group = registry.group(old).unwrap();
        assert!(!old_group.active);
        assert_eq!(old_group.public_key, key(1));
    }

    #[test]
    fn selection_honors_expiry_even_without_an_expire_call() {
        let mut registry = registry();
        registry.register_active(members(0), 2, key(1), 0).unwrap();
        let err = registry.select_signer_group(300).unwrap_err();
        assert!(matches!(
            err,
            BeaconError::InsufficientActiveGroups { active: 0, .. }
        ));
    }

    #[test]
    fn formation_is_needed_below_the_active_threshold() {
        let mut registry = registry();
        for i in 0..5u8 {
            registry
                .register_active(members(i * 10), 2, key(i), 10)
                .unwrap();
        }
        assert!(!registry.needs_group_formation(50));
        assert!(registry.needs_group_formation(310));
    }

    #[test]
    fn genesis_group_serves_before_any_dkg() {
        let mut registry = registry();
        let id = registry.register_genesis(key(0x1f), 0);
        let group = registry.select_signer_group(5).unwrap();
        assert_eq!(group.id, id);
        assert!(group.members.is_empty());
        assert_eq!(group.threshold, 0);
    }
}
