//! Structured events delivered to the external notification sink
//!
//! One event per logical fact. Events are buffered while an operation runs
//! and published only after it commits.

use crate::{Address, Amount, AssetId, ProposalId, StreamKey, TemplId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplEvent {
    MemberJoined {
        member: Address,
        payer: Address,
        sequence: u64,
        fee: Amount,
        burned: Amount,
        to_treasury: Amount,
        to_member_pool: Amount,
        to_protocol: Amount,
        #[serde(skip_serializing_if = "Option::is_none")]
        referrer: Option<Address>,
        referral_paid: Amount,
    },
    DonationReceived {
        donor: Address,
        asset: AssetId,
        amount: Amount,
    },
    RewardClaimed {
        member: Address,
        stream: StreamKey,
        amount: Amount,
    },
    ProposalCreated {
        proposal_id: ProposalId,
        proposer: Address,
        action: String,
        title: String,
        voting_deadline: DateTime<Utc>,
        fee: Amount,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: Address,
        support: bool,
        yes_votes: u64,
        no_votes: u64,
    },
    QuorumReached {
        proposal_id: ProposalId,
        eligibility_cutoff: u64,
        eligible_voters: u64,
    },
    ProposalExecuted {
        proposal_id: ProposalId,
        action: String,
    },
    AdminChanged {
        previous: Address,
        new_admin: Address,
    },
    ConfigUpdated {
        setting: String,
    },
    TreasuryWithdrawn {
        asset: AssetId,
        recipient: Address,
        amount: Amount,
        reason: String,
    },
    TreasuryDisbanded {
        asset: AssetId,
        amount: Amount,
        stream: StreamKey,
        per_member: Amount,
    },
    RewardStreamRegistered {
        asset: AssetId,
        epoch: u64,
    },
    RewardStreamDeregistered {
        asset: AssetId,
        /// Remainder returned to available treasury
        released: Amount,
    },
    ExternalCallExecuted {
        target: Address,
        value: Amount,
        response_len: usize,
    },
    ProposalsPruned {
        removed: usize,
    },
}

impl TemplEvent {
    /// Event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            TemplEvent::MemberJoined { .. } => "MemberJoined",
            TemplEvent::DonationReceived { .. } => "DonationReceived",
            TemplEvent::RewardClaimed { .. } => "RewardClaimed",
            TemplEvent::ProposalCreated { .. } => "ProposalCreated",
            TemplEvent::VoteCast { .. } => "VoteCast",
            TemplEvent::QuorumReached { .. } => "QuorumReached",
            TemplEvent::ProposalExecuted { .. } => "ProposalExecuted",
            TemplEvent::AdminChanged { .. } => "AdminChanged",
            TemplEvent::ConfigUpdated { .. } => "ConfigUpdated",
            TemplEvent::TreasuryWithdrawn { .. } => "TreasuryWithdrawn",
            TemplEvent::TreasuryDisbanded { .. } => "TreasuryDisbanded",
            TemplEvent::RewardStreamRegistered { .. } => "RewardStreamRegistered",
            TemplEvent::RewardStreamDeregistered { .. } => "RewardStreamDeregistered",
            TemplEvent::ExternalCallExecuted { .. } => "ExternalCallExecuted",
            TemplEvent::ProposalsPruned { .. } => "ProposalsPruned",
        }
    }
}

/// An event stamped with its position in the instance's event stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Strictly increasing per templ instance, starting at 1
    pub sequence: u64,
    pub templ_id: TemplId,
    pub emitted_at: DateTime<Utc>,
    pub event: TemplEvent,
}
