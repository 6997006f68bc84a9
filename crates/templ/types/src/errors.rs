//! Error types for the templ engine

use crate::{Address, Amount, AssetId, ProposalId};
use serde::{Deserialize, Serialize};

/// Coarse classification of a [`TemplError`], reported to callers so that
/// operators can tell a broken call apart from broken governance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or out-of-range config or input
    Validation,
    /// Caller is not allowed to perform the action
    Authorization,
    /// The action is not valid in the current state
    State,
    /// Unreserved funds do not cover the request
    InsufficientFunds,
    /// An asset transfer or dispatched external call failed
    ExternalCallFailure,
    /// A call re-entered the instance while another call was in flight
    Reentrancy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::State => "state",
            ErrorKind::InsufficientFunds => "insufficient-funds",
            ErrorKind::ExternalCallFailure => "external-call-failure",
            ErrorKind::Reentrancy => "reentrancy",
        };
        write!(f, "{}", name)
    }
}

/// Errors that can occur in templ operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplError {
    // --- Validation ---
    #[error("Fee split shares sum to {total}, expected 10000")]
    InvalidFeeSplit { total: u64 },

    #[error("Invalid entry fee curve: {0}")]
    InvalidCurve(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Zero identity supplied for {0}")]
    ZeroIdentity(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Voting period of {requested_secs}s outside [{min_secs}s, {max_secs}s]")]
    InvalidVotingPeriod {
        requested_secs: i64,
        min_secs: i64,
        max_secs: i64,
    },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid range: start {start} is past end {end}")]
    InvalidRange { start: usize, end: usize },

    // --- Authorization ---
    #[error("Not a member: {0}")]
    NotMember(Address),

    #[error("{voter} joined after the eligibility cutoff of proposal {proposal_id}")]
    NotEligibleVoter {
        voter: Address,
        proposal_id: ProposalId,
    },

    #[error("Not a council member: {0}")]
    NotCouncilMember(Address),

    #[error("Caller is not the admin: {0}")]
    NotAdmin(Address),

    // --- State ---
    #[error("Already a member: {0}")]
    AlreadyMember(Address),

    #[error("Joining is paused")]
    JoiningPaused,

    #[error("Member limit of {max} reached")]
    MemberLimitReached { max: u64 },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Proposal already executed: {0}")]
    ProposalAlreadyExecuted(ProposalId),

    #[error("Voting closed for proposal {0}")]
    VotingClosed(ProposalId),

    #[error("Proposal {0} is not executable yet")]
    ProposalNotExecutable(ProposalId),

    #[error("Proposal {0} did not pass")]
    ProposalNotPassed(ProposalId),

    #[error("{proposer} already has an active proposal {proposal_id}")]
    ActiveProposalExists {
        proposer: Address,
        proposal_id: ProposalId,
    },

    #[error("Dictatorship is active; only proposals disabling it may be created")]
    DictatorshipActive,

    #[error("Dictatorship is disabled")]
    DictatorshipDisabled,

    #[error("Reward stream not registered: {0}")]
    RewardStreamNotFound(AssetId),

    #[error("Reward stream {asset} still holds {pool_balance}")]
    RewardStreamNotEmpty { asset: AssetId, pool_balance: Amount },

    #[error("External reward stream limit of {max} reached")]
    RewardStreamLimitReached { max: usize },

    #[error("Invalid council update: {0}")]
    CouncilUpdate(String),

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    // --- Insufficient funds ---
    #[error("Insufficient treasury for {asset}: requested {requested}, available {available}")]
    InsufficientTreasury {
        asset: AssetId,
        requested: Amount,
        available: Amount,
    },

    #[error("Insufficient reward pool for {asset}: requested {requested}, available {available}")]
    InsufficientRewardPool {
        asset: AssetId,
        requested: Amount,
        available: Amount,
    },

    // --- External calls ---
    #[error("Asset transfer failed: {0}")]
    TransferFailed(String),

    #[error("External call to {target} failed: {reason}")]
    ExternalCallFailed { target: Address, reason: String },

    // --- Reentrancy ---
    #[error("Reentrant call rejected")]
    ReentrantCall,
}

impl TemplError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        use TemplError::*;
        match self {
            InvalidFeeSplit { .. }
            | InvalidCurve(_)
            | InvalidConfig(_)
            | ZeroIdentity(_)
            | InvalidAmount(_)
            | InvalidVotingPeriod { .. }
            | InvalidProposal(_)
            | InvalidRange { .. } => ErrorKind::Validation,

            NotMember(_) | NotEligibleVoter { .. } | NotCouncilMember(_) | NotAdmin(_) => {
                ErrorKind::Authorization
            }

            AlreadyMember(_)
            | JoiningPaused
            | MemberLimitReached { .. }
            | ProposalNotFound(_)
            | ProposalAlreadyExecuted(_)
            | VotingClosed(_)
            | ProposalNotExecutable(_)
            | ProposalNotPassed(_)
            | ActiveProposalExists { .. }
            | DictatorshipActive
            | DictatorshipDisabled
            | RewardStreamNotFound(_)
            | RewardStreamNotEmpty { .. }
            | RewardStreamLimitReached { .. }
            | CouncilUpdate(_)
            | ArithmeticOverflow(_) => ErrorKind::State,

            InsufficientTreasury { .. } | InsufficientRewardPool { .. } => {
                ErrorKind::InsufficientFunds
            }

            TransferFailed(_) | ExternalCallFailed { .. } => ErrorKind::ExternalCallFailure,

            ReentrantCall => ErrorKind::Reentrancy,
        }
    }
}

/// Result type alias for templ operations
pub type TemplResult<T> = Result<T, TemplError>;
