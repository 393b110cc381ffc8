//! End-to-end relay-entry flows against the genesis group.

use assert_matches::assert_matches;
use beacon_core::{payload, BeaconError, Ed25519Verifier, ErrorCategory, SignatureBytes};
use beacon_protocol::Beacon;
use beacon_testkit::{
    genesis_signer, init_test_logging, test_config, ManualClock, RejectAllFraudProofs,
    StaticStakingBackend,
};
use std::sync::Arc;

fn beacon_with_clock() -> (Beacon, Arc<ManualClock>) {
    init_test_logging();
    let clock = Arc::new(ManualClock::at(0));
    let (mut beacon, admin) = Beacon::new(
        test_config(),
        clock.clone(),
        Arc::new(Ed25519Verifier),
        Arc::new(RejectAllFraudProofs),
    )
    .unwrap();
    beacon.authorize_staking_backend(
        &admin,
        Arc::new(StaticStakingBackend::uniform("staking", 10, 500_000)),
    );
    (beacon, clock)
}

#[test]
fn genesis_bootstraps_the_first_entry() {
    let (mut beacon, clock) = beacon_with_clock();
    clock.set(5);

    // Before any DKG completes, the genesis group serves the request.
    let request = beacon.request_entry(b"first-seed".to_vec()).unwrap();
    let genesis_group = beacon.group(request.group_id).unwrap();
    assert!(genesis_group.members.is_empty());
    assert_eq!(
        genesis_group.public_key,
        genesis_signer().public_key()
    );
    assert_eq!(
        request.previous_entry_value,
        test_config().genesis_seed
    );

    let message = payload::relay_entry_payload(&request.previous_entry_value, &request.seed);
    let entry = beacon
        .submit_entry(genesis_signer().sign(&message))
        .unwrap();
    assert_eq!(entry.height, 5);
    assert_eq!(entry.producing_group, request.group_id);
    assert_eq!(beacon.entries().len(), 1);
}

#[test]
fn entry_value_feeds_the_next_round_seed() {
    let (mut beacon, clock) = beacon_with_clock();
    clock.set(5);

    let request = beacon.request_entry(b"round-one".to_vec()).unwrap();
    let message = payload::relay_entry_payload(&request.previous_entry_value, &request.seed);
    let entry = beacon
        .submit_entry(genesis_signer().sign(&message))
        .unwrap();

    clock.set(6);
    let next = beacon.request_entry(b"round-two".to_vec()).unwrap();
    assert_eq!(next.previous_entry_value, entry.value);
}

#[test]
fn resubmission_after_fulfillment_is_a_concurrency_conflict() {
    let (mut beacon, clock) = beacon_with_clock();
    clock.set(5);

    let request = beacon.request_entry(b"seed".to_vec()).unwrap();
    let message = payload::relay_entry_payload(&request.previous_entry_value, &request.seed);
    let signature = genesis_signer().sign(&message);
    beacon.submit_entry(signature.clone()).unwrap();

    let err = beacon.submit_entry(signature).unwrap_err();
    assert_matches!(err, BeaconError::NoPendingRequest { .. });
    assert_eq!(err.category(), ErrorCategory::ConcurrencyConflict);
}

#[test]
fn invalid_signature_leaves_the_request_retriable() {
    let (mut beacon, clock) = beacon_with_clock();
    clock.set(5);

    let request = beacon.request_entry(b"seed".to_vec()).unwrap();
    let err = beacon
        .submit_entry(SignatureBytes(vec![0u8; 64]))
        .unwrap_err();
    assert_matches!(err, BeaconError::InvalidSignature { .. });

    // Another group member retries with the correct signature.
    let message = payload::relay_entry_payload(&request.previous_entry_value, &request.seed);
    assert!(beacon.submit_entry(genesis_signer().sign(&message)).is_ok());
}

#[test]
fn unanswered_request_times_out_and_frees_the_machine() {
    let (mut beacon, clock) = beacon_with_clock();
    clock.set(100);

    let request = beacon.request_entry(b"seed".to_vec()).unwrap();
    assert_eq!(request.deadline_height, 110);

    // A concurrent request is refused while the first is pending.
    let err = beacon.request_entry(b"other".to_vec()).unwrap_err();
    assert_matches!(err, BeaconError::RequestAlreadyPending { .. });

    // relay_request_timeout = 10: at H+10 the level-triggered check fires.
    clock.set(110);
    let dropped = beacon.check_timeout().unwrap();
    assert_eq!(dropped.request_id, request.request_id);

    // And a fresh request succeeds.
    assert!(beacon.request_entry(b"retry".to_vec()).is_ok());
}

#[test]
fn no_active_group_means_resource_exhaustion() {
    let (mut beacon, clock) = beacon_with_clock();
    // Past the genesis group's active window, with no DKG-formed group.
    clock.set(301);
    let err = beacon.request_entry(b"seed".to_vec()).unwrap_err();
    assert_matches!(
        err,
        BeaconError::InsufficientActiveGroups { active: 0, .. }
    );
    assert_eq!(err.category(), ErrorCategory::ResourceExhaustion);
}
