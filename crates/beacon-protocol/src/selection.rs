//! Deterministic group selection.
//!
//! Samples `group_size` distinct members from the eligible pool using a
//! beacon-derived seed. Any verifier holding the same `(seed, pool snapshot,
//! group_size)` recomputes the identical selection, which is what makes
//! group membership auditable.

use beacon_core::{BeaconError, ParticipantId, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

const SELECTION_TAG: &[u8] = b"BEACON_GROUP_SELECTION";

/// Select an ordered candidate group from `pool`.
///
/// Repeated hash-and-mod over the pool: counter `i` yields index
/// `sha256(tag || seed || i) mod |pool|`; duplicate picks are rejected and
/// the counter advances until `group_size` distinct members are chosen.
pub fn select_group(
    seed: &[u8],
    pool: &[ParticipantId],
    group_size: usize,
) -> Result<Vec<ParticipantId>> {
    let mut unique = pool.to_vec();
    unique.sort();
    unique.dedup();
    if unique.len() < group_size {
        return Err(BeaconError::InsufficientPool {
            available: unique.len(),
            required: group_size,
        });
    }

    let mut selected: Vec<ParticipantId> = Vec::with_capacity(group_size);
    let mut counter: u64 = 0;
    while selected.len() < group_size {
        let mut hasher = Sha256::new();
        hasher.update(SELECTION_TAG);
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();
        // The first eight digest bytes are enough entropy for an index.
        let raw = u64::from_be_bytes(digest[..8].try_into().unwrap_or([0u8; 8]));
        let candidate = unique[(raw % unique.len() as u64) as usize];
        if !selected.contains(&candidate) {
            selected.push(candidate);
        }
        counter += 1;
    }

    debug!(
        group_size,
        pool = unique.len(),
        draws = counter,
        "candidate group selected"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pool(size: u8) -> Vec<ParticipantId> {
        (0..size).map(|i| ParticipantId::from_bytes([i; 32])).collect()
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let pool = pool(20);
        let a = select_group(b"seed", &pool, 5).unwrap();
        let b = select_group(b"seed", &pool, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_groups() {
        let pool = pool(40);
        let a = select_group(b"seed-one", &pool, 5).unwrap();
        let b = select_group(b"seed-two", &pool, 5).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn small_pool_is_rejected() {
        let err = select_group(b"seed", &pool(3), 5).unwrap_err();
        assert!(matches!(
            err,
            BeaconError::InsufficientPool {
                available: 3,
                required: 5
            }
        ));
    }

    #[test]
    fn exact_size_pool_selects_everyone() {
        let pool = pool(5);
        let mut selected = select_group(b"seed", &pool, 5).unwrap();
        selected.sort();
        assert_eq!(selected, pool);
    }

    proptest! {
        #[test]
        fn selection_is_deterministic_and_distinct(
            seed in proptest::collection::vec(any::<u8>(), 1..64),
            pool_size in 5u8..60,
            group_size in 1usize..=5,
        ) {
            let pool = pool(pool_size);
            let first = select_group(&seed, &pool, group_size).unwrap();
            let second = select_group(&seed, &pool, group_size).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), group_size);
            let mut dedup = first.clone();
            dedup.sort();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), group_size);
            prop_assert!(first.iter().all(|p| pool.contains(p)));
        }
    }
}
