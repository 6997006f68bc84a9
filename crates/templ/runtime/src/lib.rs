//! Templ Runtime
//!
//! The accounting and governance engine behind a token-gated community
//! ("templ"): entry fees priced along a curve and split between burning,
//! the treasury, a member reward pool and the protocol; reward streams for
//! donated assets; and member-voted proposals that govern config and funds.
//!
//! # Architecture
//!
//! The [`Templ`] is the main entry point. It owns one aggregate of ledger
//! state and composes specialized managers, each handling one concern:
//!
//! - [`MembershipLedger`]: Admission, join sequence numbers, caps and pauses
//! - [`FeeDistributor`]: Fee splitting and routing
//! - [`RewardEngine`]: Member pool and external reward streams
//! - [`GovernanceEngine`]: Proposal lifecycle, voting and quorum
//! - [`TreasuryGuard`]: Reservation checks for every fund-moving action
//!
//! Value movement, event delivery, time and external calls go through the
//! host collaborators in [`host`]. In-memory versions live in [`simulated`].
//!
//! # Key Invariants
//!
//! 1. Every operation is all-or-nothing; a rejected call publishes nothing
//! 2. Treasury holdings always cover what reward streams owe members
//! 3. A member votes only if they joined before the proposal's cutoff
//! 4. At most one undecided proposal per proposer
//! 5. A collaborator calling back into the templ mid-operation is rejected
//!
//! # Example
//!
//! ```rust
//! use templ_runtime::{SimulatedHost, Templ};
//! use templ_types::{Address, AssetId, BootstrapConfig, TemplConfig};
//!
//! let sim = SimulatedHost::default();
//! let config = TemplConfig::default();
//! let templ = Templ::bootstrap(
//!     BootstrapConfig::new(Address::new("priest"), config),
//!     sim.host(),
//! )
//! .unwrap();
//!
//! let alice = Address::new("alice");
//! sim.ledger.fund(&alice, &AssetId::new("ACCESS"), 1_000);
//! templ.join(&alice, &alice, None).unwrap();
//!
//! assert_eq!(templ.member_count(), 2);
//! ```

#![deny(unsafe_code)]

mod action_executor;
pub mod fee_distributor;
pub mod governance_engine;
pub mod host;
pub mod membership_ledger;
pub mod outbox;
pub mod reentrancy;
pub mod reward_engine;
pub mod simulated;
mod state;
pub mod templ;
pub mod treasury_guard;

// Re-export main types for convenience
pub use fee_distributor::{FeeBreakdown, FeeDistributor, JoinFeeRouting};
pub use governance_engine::{GovernanceEngine, NewProposal, VoteOutcome};
pub use host::{AssetTransfer, Clock, EventSink, ExternalCaller, SystemClock, TemplHost, Transfer};
pub use membership_ledger::{Admission, MembershipLedger};
pub use outbox::{ExternalCallRequest, Outbox};
pub use reentrancy::ReentrancyGuard;
pub use reward_engine::RewardEngine;
pub use simulated::{
    ManualClock, RecordedCall, RecordingSink, ReentrantTransfer, ScriptedCaller, SimulatedHost,
    SimulatedLedger,
};
pub use templ::{JoinReceipt, Templ};
pub use treasury_guard::TreasuryGuard;
