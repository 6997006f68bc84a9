//! Templ: one membership, treasury and governance instance
//!
//! The [`Templ`] owns the whole ledger aggregate and is the only entry point
//! for state-changing operations. Every operation:
//!
//! 1. takes the reentrancy guard,
//! 2. observes the clock once (clamped so time never runs backwards),
//! 3. runs its managers against a working copy of the state,
//! 4. checks that holdings still cover every reservation,
//! 5. settles queued transfers and the queued external call, and
//! 6. commits the working copy and publishes its events.
//!
//! A failure at any step discards the working copy and publishes nothing.

use crate::action_executor::ActionExecutor;
use crate::fee_distributor::{FeeBreakdown, FeeDistributor, JoinFeeRouting};
use crate::governance_engine::{NewProposal, VoteOutcome};
use crate::host::TemplHost;
use crate::membership_ledger::Admission;
use crate::outbox::Outbox;
use crate::reentrancy::ReentrancyGuard;
use crate::state::TemplState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use templ_types::{
    Address, Amount, AssetId, BootstrapConfig, EventEnvelope, MemberRecord, Proposal,
    ProposalAction, ProposalId, ProposalStatus, RewardStream, StreamKey, TemplConfig, TemplError,
    TemplEvent, TemplId, TemplResult, TreasuryState, VoteRecord,
};
use tracing::{debug, info, warn};

/// What a successful join produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub sequence: u64,
    pub fee: FeeBreakdown,
    /// The referral that was honoured, if any
    pub referrer: Option<Address>,
}

/// A templ instance
#[derive(Debug)]
pub struct Templ {
    id: TemplId,
    host: TemplHost,
    state: RefCell<TemplState>,
    guard: ReentrancyGuard,
}

impl Templ {
    /// Validate the factory-supplied config and bring the templ up with the
    /// admin enrolled as member #1
    pub fn bootstrap(bootstrap: BootstrapConfig, host: TemplHost) -> TemplResult<Self> {
        bootstrap.validate()?;
        let BootstrapConfig {
            templ_id,
            admin,
            config,
        } = bootstrap;

        let now = host.clock.now();
        let mut state = TemplState::new(config, admin.clone(), now);
        let mut outbox = Outbox::new(now);
        let baseline = state.rewards.member_pool().cumulative_per_member;
        state.membership.enroll_admin(&admin, baseline, &mut outbox)?;

        info!(
            templ = %templ_id.short(),
            name = %state.config.metadata.name,
            admin = %admin,
            access_asset = %state.config.access_asset,
            "Templ bootstrapped"
        );

        Ok(Self {
            id: templ_id,
            host,
            state: RefCell::new(state),
            guard: ReentrancyGuard::new(),
        })
    }

    pub fn id(&self) -> &TemplId {
        &self.id
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Admit `recipient`, charging the current entry fee to `payer`
    pub fn join(
        &self,
        payer: &Address,
        recipient: &Address,
        referral: Option<&Address>,
    ) -> TemplResult<JoinReceipt> {
        self.transact("join", |state, outbox| {
            if payer.is_zero() {
                return Err(TemplError::ZeroIdentity("payer"));
            }
            let sequence = state.membership.check_admission(recipient, &state.config)?;
            let fee = state.config.entry_fee.fee_for_sequence(sequence);
            let referrer = state.membership.resolve_referrer(referral, recipient);
            let breakdown = FeeDistributor::split(
                fee,
                &state.config.fee_split,
                state.config.referral_share_bps,
                referrer.is_some(),
            )?;

            let routing = JoinFeeRouting {
                payer,
                referrer: referrer.as_ref(),
                members_before: state.membership.count(),
            };
            FeeDistributor::route_join_fee(
                &breakdown,
                &routing,
                &state.config,
                &mut state.treasury,
                &mut state.rewards,
                outbox,
            )?;

            let pool_baseline = state.rewards.member_pool().cumulative_per_member;
            let sequence = state.membership.admit(
                Admission {
                    recipient,
                    payer,
                    referrer: referrer.clone(),
                },
                &breakdown,
                pool_baseline,
                outbox,
            )?;

            Ok(JoinReceipt {
                sequence,
                fee: breakdown,
                referrer,
            })
        })
    }

    /// Gift any asset to the treasury
    pub fn donate(&self, donor: &Address, asset: &AssetId, amount: Amount) -> TemplResult<()> {
        self.transact("donate", |state, outbox| {
            if donor.is_zero() {
                return Err(TemplError::ZeroIdentity("donor"));
            }
            if amount == 0 {
                return Err(TemplError::InvalidAmount(
                    "donation amount must be non-zero".into(),
                ));
            }
            FeeDistributor::collect_to_treasury(
                asset,
                donor,
                amount,
                &state.config,
                &mut state.treasury,
                outbox,
            )?;

            info!(donor = %donor, asset = %asset, amount, "Donation received");
            outbox.emit(TemplEvent::DonationReceived {
                donor: donor.clone(),
                asset: asset.clone(),
                amount,
            });
            Ok(())
        })
    }

    // =========================================================================
    // REWARDS
    // =========================================================================

    /// Pay out everything `member` can claim from `stream`; returns the
    /// amount paid, zero when there was nothing to claim
    pub fn claim(&self, member: &Address, stream: &StreamKey) -> TemplResult<Amount> {
        self.transact("claim", |state, outbox| {
            let record = state.membership.member_mut(member)?;
            state
                .rewards
                .claim(record, stream, &state.config, &mut state.treasury, outbox)
        })
    }

    // =========================================================================
    // GOVERNANCE
    // =========================================================================

    /// Open a proposal; the proposer's YES is recorded immediately
    pub fn create_proposal(
        &self,
        proposer: &Address,
        request: NewProposal,
    ) -> TemplResult<ProposalId> {
        self.transact("create_proposal", |state, outbox| {
            let record = state.membership.require_member(proposer)?;
            let count = state.membership.count();
            let entry_fee = state.config.entry_fee.fee_for_sequence(count + 1);
            let fee = FeeDistributor::proposal_fee(entry_fee, state.config.proposal_fee_bps);

            let id = state
                .governance
                .create(request, record, count, &state.config, fee, outbox)?;

            if fee > 0 {
                FeeDistributor::collect_to_treasury(
                    &state.config.access_asset,
                    proposer,
                    fee,
                    &state.config,
                    &mut state.treasury,
                    outbox,
                )?;
            }
            Ok(id)
        })
    }

    /// Cast or change a vote
    pub fn vote(&self, id: ProposalId, voter: &Address, support: bool) -> TemplResult<VoteOutcome> {
        self.transact("vote", |state, outbox| {
            let record = state.membership.require_member(voter)?;
            state.governance.vote(
                id,
                record,
                support,
                state.membership.count(),
                state.config.governance.quorum_bps,
                outbox,
            )
        })
    }

    /// Execute a passing proposal once its timing allows. Permissionless.
    ///
    /// If the action fails the proposal stays pending and can be retried.
    pub fn execute_proposal(&self, id: ProposalId) -> TemplResult<()> {
        self.transact("execute_proposal", |state, outbox| {
            let action = state
                .governance
                .execute(id, &state.config.governance, outbox)?;
            ActionExecutor::dispatch(state, &action, outbox)
        })
    }

    /// Drop executed and expired ids from positions `start..end` of the
    /// active proposal index. Permissionless.
    pub fn prune_inactive_proposals(&self, start: usize, end: usize) -> TemplResult<usize> {
        self.transact("prune_inactive_proposals", |state, outbox| {
            state
                .governance
                .prune_inactive(start, end, &state.config.governance, outbox)
        })
    }

    /// Run an action directly as the admin. Only while dictatorship is on,
    /// and still subject to the treasury guard.
    pub fn admin_execute(&self, caller: &Address, action: ProposalAction) -> TemplResult<()> {
        self.transact("admin_execute", |state, outbox| {
            if *caller != state.admin {
                return Err(TemplError::NotAdmin(caller.clone()));
            }
            if !state.config.dictatorship {
                return Err(TemplError::DictatorshipDisabled);
            }
            info!(admin = %caller, action = action.name(), "Admin override");
            ActionExecutor::dispatch(state, &action, outbox)
        })
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    pub fn config(&self) -> TemplConfig {
        self.state.borrow().config.clone()
    }

    pub fn admin(&self) -> Address {
        self.state.borrow().admin.clone()
    }

    pub fn member(&self, address: &Address) -> Option<MemberRecord> {
        self.state.borrow().membership.member(address).cloned()
    }

    pub fn member_count(&self) -> u64 {
        self.state.borrow().membership.count()
    }

    /// Fee the next joiner would pay right now
    pub fn entry_fee_for_next_join(&self) -> Amount {
        let state = self.state.borrow();
        state
            .config
            .entry_fee
            .fee_for_sequence(state.membership.count() + 1)
    }

    pub fn treasury(&self) -> TreasuryState {
        self.state.borrow().treasury.clone()
    }

    /// Holdings of `asset` not owed to any reward stream
    pub fn available(&self, asset: &AssetId) -> Amount {
        self.state.borrow().guard().available(asset)
    }

    /// Holdings of `asset` owed to reward streams
    pub fn reserved(&self, asset: &AssetId) -> Amount {
        self.state.borrow().guard().reserved(asset)
    }

    pub fn claimable(&self, member: &Address, stream: &StreamKey) -> TemplResult<Amount> {
        let state = self.state.borrow();
        let record = state
            .membership
            .member(member)
            .ok_or_else(|| TemplError::NotMember(member.clone()))?;
        state.rewards.claimable(record, stream)
    }

    pub fn reward_stream(&self, stream: &StreamKey) -> TemplResult<RewardStream> {
        self.state.borrow().rewards.stream(stream).cloned()
    }

    /// Registered external reward streams
    pub fn external_streams(&self) -> Vec<RewardStream> {
        self.state
            .borrow()
            .rewards
            .registered_external()
            .cloned()
            .collect()
    }

    pub fn proposal(&self, id: ProposalId) -> Option<Proposal> {
        self.state.borrow().governance.proposal(id).cloned()
    }

    /// Status as of the current clock reading
    pub fn proposal_status(&self, id: ProposalId) -> TemplResult<ProposalStatus> {
        let now = self.observe_clock();
        let state = self.state.borrow();
        state
            .governance
            .status(id, now, &state.config.governance)
    }

    pub fn vote_of(&self, id: ProposalId, voter: &Address) -> Option<VoteRecord> {
        self.state.borrow().governance.vote_of(id, voter).copied()
    }

    pub fn active_proposal_ids(&self) -> Vec<ProposalId> {
        self.state.borrow().governance.active_ids().to_vec()
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.borrow().governance.proposal_count()
    }

    pub fn council_mode(&self) -> bool {
        self.state.borrow().governance.council_mode()
    }

    pub fn council_members(&self) -> Vec<Address> {
        self.state
            .borrow()
            .governance
            .council_members()
            .cloned()
            .collect()
    }

    // =========================================================================
    // TRANSACTION
    // =========================================================================

    /// Current time, never earlier than anything already observed
    fn observe_clock(&self) -> DateTime<Utc> {
        let reported = self.host.clock.now();
        let last_seen = self.state.borrow().last_seen;
        if reported < last_seen {
            warn!(
                templ = %self.id.short(),
                reported = %reported,
                last_seen = %last_seen,
                "Clock moved backwards; holding at last observed time"
            );
            return last_seen;
        }
        reported
    }

    fn transact<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut TemplState, &mut Outbox) -> TemplResult<T>,
    ) -> TemplResult<T> {
        let _entered = self.guard.enter()?;
        let result = self.run(f);
        if let Err(e) = &result {
            warn!(
                templ = %self.id.short(),
                op,
                error = %e,
                kind = %e.kind(),
                "Operation rejected"
            );
        }
        result
    }

    fn run<T>(
        &self,
        f: impl FnOnce(&mut TemplState, &mut Outbox) -> TemplResult<T>,
    ) -> TemplResult<T> {
        let now = self.observe_clock();
        let mut working = self.state.borrow().clone();
        working.last_seen = now;
        let mut outbox = Outbox::new(now);

        let value = f(&mut working, &mut outbox)?;
        working.guard().verify()?;
        self.interact(&mut outbox)?;

        let envelopes = self.stamp(&mut working, outbox.into_events(), now);
        *self.state.borrow_mut() = working;
        for envelope in &envelopes {
            self.host.events.emit(envelope);
        }
        Ok(value)
    }

    /// Settle queued transfers, then dispatch the queued external call
    fn interact(&self, outbox: &mut Outbox) -> TemplResult<()> {
        if !outbox.transfers().is_empty() {
            debug!(count = outbox.transfers().len(), "Settling transfers");
            self.host
                .transfers
                .settle(outbox.transfers())
                .map_err(TemplError::TransferFailed)?;
        }

        if let Some(call) = outbox.take_call() {
            let response = self
                .host
                .calls
                .call(&call.target, call.value, &call.payload)
                .map_err(|reason| TemplError::ExternalCallFailed {
                    target: call.target.clone(),
                    reason,
                })?;
            info!(
                target = %call.target,
                value = call.value,
                response_len = response.len(),
                "External call executed"
            );
            outbox.emit(TemplEvent::ExternalCallExecuted {
                target: call.target,
                value: call.value,
                response_len: response.len(),
            });
        }
        Ok(())
    }

    fn stamp(
        &self,
        state: &mut TemplState,
        events: Vec<TemplEvent>,
        now: DateTime<Utc>,
    ) -> Vec<EventEnvelope> {
        events
            .into_iter()
            .map(|event| {
                let sequence = state.next_event_sequence;
                state.next_event_sequence += 1;
                EventEnvelope {
                    sequence,
                    templ_id: self.id.clone(),
                    emitted_at: now,
                    event,
                }
            })
            .collect()
    }
}
