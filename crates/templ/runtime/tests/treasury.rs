//! Treasury guard, donations and fund-moving actions

mod common;

use common::{access, priest, Harness};
use templ_runtime::NewProposal;
use templ_types::{
    Address, AssetId, ErrorKind, ProposalAction, StreamKey, TemplError, TemplEvent,
};

#[test]
fn donations_from_anyone_become_available() {
    let h = Harness::new();
    let fan = Address::new("fan");
    let usdc = AssetId::new("USDC");
    h.sim.ledger.fund(&fan, &usdc, 1_000);

    h.templ.donate(&fan, &usdc, 400).unwrap();
    assert_eq!(h.templ.treasury().holding(&usdc), 400);
    assert_eq!(h.templ.available(&usdc), 400);
    assert_eq!(h.templ.reserved(&usdc), 0);
    assert_eq!(h.balance(&h.templ_account(), &usdc), 400);
    assert_eq!(h.sim.sink.names(), vec!["DonationReceived"]);
}

#[test]
fn failed_donation_credits_nothing() {
    let h = Harness::new();
    let err = h
        .templ
        .donate(&Address::new("broke"), &AssetId::new("USDC"), 5)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalCallFailure);
    assert_eq!(h.templ.treasury().holding(&AssetId::new("USDC")), 0);
    assert!(h.sim.sink.is_empty());
}

#[test]
fn disbanding_the_access_asset_feeds_the_member_pool() {
    let h = Harness::new();
    let alice = h.join("alice");
    assert_eq!(h.templ.available(&access()), 30);

    h.enact(
        &priest(),
        &[&alice],
        ProposalAction::DisbandTreasury { asset: access() },
    );

    assert_eq!(h.templ.available(&access()), 0);
    assert_eq!(h.templ.reserved(&access()), 60);
    assert_eq!(h.templ.treasury().holding(&access()), 60);
    assert_eq!(h.templ.claimable(&priest(), &StreamKey::MemberPool), Ok(45));
    assert_eq!(h.templ.claimable(&alice, &StreamKey::MemberPool), Ok(15));

    match &h.sim.sink.events().last().unwrap().event {
        TemplEvent::TreasuryDisbanded {
            amount,
            stream,
            per_member,
            ..
        } => {
            assert_eq!(*amount, 30);
            assert_eq!(stream, &StreamKey::MemberPool);
            assert_eq!(*per_member, 15);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn disbanding_nothing_is_rejected() {
    let h = Harness::new();
    let alice = h.join("alice");
    let id = h.approve(
        &priest(),
        &[&alice],
        ProposalAction::DisbandTreasury {
            asset: AssetId::new("EMPTY"),
        },
    );
    let err = h.templ.execute_proposal(id).unwrap_err();
    assert_eq!(
        err,
        TemplError::InsufficientTreasury {
            asset: AssetId::new("EMPTY"),
            requested: 0,
            available: 0,
        }
    );
    assert!(h.templ.external_streams().is_empty());
}

#[test]
fn zero_withdrawal_is_rejected_at_creation() {
    let h = Harness::new();
    let err = h
        .templ
        .create_proposal(
            &priest(),
            NewProposal::new(
                ProposalAction::WithdrawTreasury {
                    asset: access(),
                    recipient: priest(),
                    amount: 0,
                    reason: "nothing".into(),
                },
                "Withdraw nothing",
            ),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.templ.proposal_count(), 0);
}

#[test]
fn external_call_value_comes_from_native_holdings() {
    let h = Harness::new();
    let alice = h.join("alice");
    let native = AssetId::native();
    let fan = Address::new("fan");
    h.sim.ledger.fund(&fan, &native, 10);
    h.templ.donate(&fan, &native, 10).unwrap();

    h.enact(
        &priest(),
        &[&alice],
        ProposalAction::CallExternal {
            target: Address::new("vault"),
            value: 4,
            payload: vec![0x01],
        },
    );

    assert_eq!(h.sim.caller.calls()[0].value, 4);
    assert_eq!(h.templ.treasury().holding(&native), 6);
}

#[test]
fn external_call_cannot_spend_more_native_than_available() {
    let h = Harness::new();
    let alice = h.join("alice");
    let id = h.approve(
        &priest(),
        &[&alice],
        ProposalAction::CallExternal {
            target: Address::new("vault"),
            value: 1,
            payload: Vec::new(),
        },
    );

    let err = h.templ.execute_proposal(id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert!(h.sim.caller.calls().is_empty());
}

#[test]
fn failed_external_call_aborts_execution() {
    let h = Harness::new();
    let alice = h.join("alice");
    let native = AssetId::native();
    let fan = Address::new("fan");
    h.sim.ledger.fund(&fan, &native, 10);
    h.templ.donate(&fan, &native, 10).unwrap();
    let events_before = h.sim.sink.len();

    let id = h.approve(
        &priest(),
        &[&alice],
        ProposalAction::CallExternal {
            target: Address::new("vault"),
            value: 10,
            payload: vec![0xff],
        },
    );
    let events_after_approval = h.sim.sink.len();
    assert!(events_after_approval > events_before);

    h.sim.caller.respond_with(Err("execution reverted".into()));
    let err = h.templ.execute_proposal(id).unwrap_err();
    assert_eq!(
        err,
        TemplError::ExternalCallFailed {
            target: Address::new("vault"),
            reason: "execution reverted".into(),
        }
    );
    assert_eq!(err.kind(), ErrorKind::ExternalCallFailure);

    // Value stays put, the proposal stays pending, nothing was published
    assert_eq!(h.templ.treasury().holding(&native), 10);
    assert!(!h.templ.proposal(id).unwrap().executed);
    assert_eq!(h.sim.sink.len(), events_after_approval);

    h.templ.execute_proposal(id).unwrap();
    assert_eq!(h.templ.treasury().holding(&native), 0);
    assert_eq!(h.sim.caller.calls().len(), 2);
}

#[test]
fn withdrawal_pays_recipient_and_records_reason() {
    let h = Harness::new();
    let alice = h.join("alice");
    let usdc = AssetId::new("USDC");
    let fan = Address::new("fan");
    h.sim.ledger.fund(&fan, &usdc, 500);
    h.templ.donate(&fan, &usdc, 500).unwrap();

    h.enact(
        &priest(),
        &[&alice],
        ProposalAction::WithdrawTreasury {
            asset: usdc.clone(),
            recipient: alice.clone(),
            amount: 200,
            reason: "event venue".into(),
        },
    );

    assert_eq!(h.balance(&alice, &usdc), 200);
    assert_eq!(h.templ.treasury().holding(&usdc), 300);
    match &h.sim.sink.events().last().unwrap().event {
        TemplEvent::TreasuryWithdrawn { reason, amount, .. } => {
            assert_eq!(reason, "event venue");
            assert_eq!(*amount, 200);
        }
        other => panic!("unexpected event {:?}", other),
    }
}
