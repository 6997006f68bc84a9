//! The templ aggregate: every piece of ledger state for one instance
//!
//! Operations work on a clone and the clone replaces the committed state
//! only when the whole operation succeeds.

use crate::governance_engine::GovernanceEngine;
use crate::membership_ledger::MembershipLedger;
use crate::reward_engine::RewardEngine;
use crate::treasury_guard::TreasuryGuard;
use chrono::{DateTime, Utc};
use templ_types::{Address, TemplConfig, TreasuryState};

#[derive(Clone, Debug)]
pub(crate) struct TemplState {
    pub config: TemplConfig,
    pub admin: Address,
    pub membership: MembershipLedger,
    pub treasury: TreasuryState,
    pub rewards: RewardEngine,
    pub governance: GovernanceEngine,
    /// Latest clock reading any operation has observed
    pub last_seen: DateTime<Utc>,
    /// Sequence the next published event receives
    pub next_event_sequence: u64,
}

impl TemplState {
    pub fn new(config: TemplConfig, admin: Address, now: DateTime<Utc>) -> Self {
        Self {
            rewards: RewardEngine::new(config.access_asset.clone()),
            governance: GovernanceEngine::new(admin.clone()),
            membership: MembershipLedger::new(),
            treasury: TreasuryState::new(),
            config,
            admin,
            last_seen: now,
            next_event_sequence: 1,
        }
    }

    pub fn guard(&self) -> TreasuryGuard<'_> {
        TreasuryGuard::new(&self.treasury, &self.rewards)
    }
}
