//! All-or-nothing operations, reentrancy and event ordering

mod common;

use chrono::Duration;
use common::{access, base_config, priest, start_time, Harness};
use std::rc::Rc;
use std::sync::Arc;
use templ_runtime::{ReentrantTransfer, SimulatedHost, Templ};
use templ_types::{Address, BootstrapConfig, ErrorKind, ProposalAction, StreamKey, TemplError};

fn reentrant_templ(
    reentry: impl Fn(&Templ) -> Result<(), TemplError> + 'static,
) -> (SimulatedHost, Arc<ReentrantTransfer>, Rc<Templ>) {
    let sim = SimulatedHost::new(start_time());
    let transfers = Arc::new(ReentrantTransfer::new(sim.ledger.clone(), reentry));
    let templ = Templ::bootstrap(
        BootstrapConfig::new(priest(), base_config()),
        sim.host_with_transfers(transfers.clone()),
    )
    .unwrap();
    let templ = Rc::new(templ);
    transfers.arm(&templ);
    (sim, transfers, templ)
}

#[test]
fn reentrant_operation_is_rejected_and_outer_join_completes() {
    let (sim, transfers, templ) = reentrant_templ(|templ| {
        let attacker = Address::new("attacker");
        templ.join(&attacker, &attacker, None).map(|_| ())
    });
    let alice = Address::new("alice");
    sim.ledger.fund(&alice, &access(), 1_000);
    sim.ledger.fund(&Address::new("attacker"), &access(), 1_000);

    templ.join(&alice, &alice, None).unwrap();

    let answers = transfers.answers();
    assert_eq!(answers, vec![Err(TemplError::ReentrantCall)]);
    assert_eq!(TemplError::ReentrantCall.kind(), ErrorKind::Reentrancy);
    assert_eq!(templ.member_count(), 2);
    assert!(templ.member(&Address::new("attacker")).is_none());
    assert_eq!(sim.sink.names(), vec!["MemberJoined"]);
}

#[test]
fn reads_during_settlement_see_the_last_committed_state() {
    let (sim, transfers, templ) = reentrant_templ(|templ| {
        // The join in flight is not visible until it commits
        if templ.member_count() == 1 && templ.treasury().holding(&access()) == 0 {
            Ok(())
        } else {
            Err(TemplError::InvalidConfig("observed uncommitted state".into()))
        }
    });
    let alice = Address::new("alice");
    sim.ledger.fund(&alice, &access(), 1_000);

    templ.join(&alice, &alice, None).unwrap();
    assert_eq!(transfers.answers(), vec![Ok(())]);
    assert_eq!(templ.member_count(), 2);
}

#[test]
fn failed_settlement_rolls_back_the_whole_join() {
    let h = Harness::new();
    h.join("alice");
    let pool_before = h.templ.reward_stream(&StreamKey::MemberPool).unwrap();
    let treasury_before = h.templ.treasury();

    let bob = Address::new("bob");
    h.sim.ledger.fund(&bob, &access(), 1_000);
    h.sim.ledger.fail_next_settlement("ledger offline");
    let err = h.templ.join(&bob, &bob, None).unwrap_err();
    assert_eq!(err, TemplError::TransferFailed("ledger offline".into()));

    assert!(h.templ.member(&bob).is_none());
    assert_eq!(h.templ.member_count(), 2);
    assert_eq!(h.templ.treasury(), treasury_before);
    assert_eq!(
        h.templ.reward_stream(&StreamKey::MemberPool).unwrap(),
        pool_before
    );
    assert_eq!(h.templ.claimable(&priest(), &StreamKey::MemberPool), Ok(30));
    assert_eq!(h.balance(&bob, &access()), 1_000);

    // The sequence number was not consumed
    let receipt = h.templ.join(&bob, &bob, None).unwrap();
    assert_eq!(receipt.sequence, 3);
}

#[test]
fn event_sequence_has_no_gaps_across_failures() {
    let h = Harness::new();
    h.join("alice");

    let broke = Address::new("broke");
    assert!(h.templ.join(&broke, &broke, None).is_err());
    assert!(h.templ.donate(&broke, &access(), 0).is_err());

    h.join("bob");
    h.templ.claim(&priest(), &StreamKey::MemberPool).unwrap();

    let sequences: Vec<u64> = h.sim.sink.events().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert!(h
        .sim
        .sink
        .events()
        .iter()
        .all(|e| e.templ_id.0 == "templ-under-test"));
}

#[test]
fn clock_running_backwards_is_clamped() {
    let h = Harness::new();
    h.advance(Duration::hours(5));
    let alice = h.join("alice");
    let joined_at = h.templ.member(&alice).unwrap().joined_at;
    assert_eq!(joined_at, start_time() + Duration::hours(5));

    h.sim.clock.set(start_time());
    let bob = h.join("bob");
    assert_eq!(h.templ.member(&bob).unwrap().joined_at, joined_at);

    let stamps: Vec<_> = h.sim.sink.events().iter().map(|e| e.emitted_at).collect();
    assert_eq!(stamps, vec![joined_at, joined_at]);
}

#[test]
fn paused_templ_rejects_joins_without_side_effects() {
    let h = Harness::new();
    let alice = h.join("alice");
    h.enact(
        &priest(),
        &[&alice],
        ProposalAction::SetJoinPaused { paused: true },
    );
    let events = h.sim.sink.len();

    let bob = Address::new("bob");
    h.sim.ledger.fund(&bob, &access(), 1_000);
    let err = h.templ.join(&bob, &bob, None).unwrap_err();
    assert_eq!(err, TemplError::JoiningPaused);
    assert_eq!(h.sim.sink.len(), events);
    assert_eq!(h.balance(&bob, &access()), 1_000);
}

#[test]
fn published_envelopes_serialize_with_tagged_events() {
    let h = Harness::new();
    let alice = Address::new("alice");
    h.sim.ledger.fund(&alice, &access(), 1_000);
    let receipt = h.templ.join(&alice, &alice, None).unwrap();

    let envelope = &h.sim.sink.events()[0];
    let json = serde_json::to_value(envelope).unwrap();
    assert_eq!(json["sequence"], 1);
    assert_eq!(json["event"]["MemberJoined"]["member"], "alice");

    let receipt_json = serde_json::to_value(&receipt).unwrap();
    assert_eq!(receipt_json["sequence"], 2);
    assert!(receipt_json["referrer"].is_null());
}
