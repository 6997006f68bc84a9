//! Templ Domain Types
//!
//! This crate defines the domain types for a templ: a token-gated community
//! that charges an algorithmically priced entry fee, splits it between
//! burning, a treasury, a member reward pool and the protocol, and governs
//! its treasury and configuration through member proposals.
//!
//! # Key Concepts
//!
//! - **Entry Fee Curve**: pure function from join sequence to fee.
//! - **Fee Split**: four basis-point shares that always sum to 10_000.
//! - **Reward Stream**: cumulative-per-member counter with checkpoints, used
//!   for the member pool and for every external reward asset.
//! - **Proposal**: typed action, snapshot voter eligibility, quorum and
//!   execution delay.
//! - **Treasury**: per-asset holdings; reserved balances are owed to streams.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. IDs use the
//! newtype pattern and implement `Display`. Every config type validates
//! itself and reports failures as [`TemplError`].

#![deny(unsafe_code)]

mod config;
mod curve;
mod errors;
mod events;
mod ids;
mod membership;
mod proposal;
mod rewards;
mod treasury;

pub use config::*;
pub use curve::*;
pub use errors::*;
pub use events::*;
pub use ids::*;
pub use membership::*;
pub use proposal::*;
pub use rewards::*;
pub use treasury::*;
