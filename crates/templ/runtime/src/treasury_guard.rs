//! Treasury Guard: reservation checks for every fund-moving action
//!
//! `available(asset) = holdings(asset) - reserved(asset)`, where reserved is
//! what reward streams still owe members. Withdrawals, disbanding and value
//! attached to external calls must fit inside `available`. The admin path
//! goes through the same checks.

use crate::reward_engine::RewardEngine;
use templ_types::{Amount, AssetId, TemplError, TemplResult, TreasuryState};
use tracing::warn;

/// Read-only view pairing holdings with reward reservations
pub struct TreasuryGuard<'a> {
    treasury: &'a TreasuryState,
    rewards: &'a RewardEngine,
}

impl<'a> TreasuryGuard<'a> {
    pub fn new(treasury: &'a TreasuryState, rewards: &'a RewardEngine) -> Self {
        Self { treasury, rewards }
    }

    pub fn holdings(&self, asset: &AssetId) -> Amount {
        self.treasury.holding(asset)
    }

    pub fn reserved(&self, asset: &AssetId) -> Amount {
        self.rewards.reserved(asset)
    }

    pub fn available(&self, asset: &AssetId) -> Amount {
        self.holdings(asset).saturating_sub(self.reserved(asset))
    }

    /// Fail unless `amount` fits in the unreserved balance of `asset`
    pub fn ensure_available(&self, asset: &AssetId, amount: Amount) -> TemplResult<()> {
        let available = self.available(asset);
        if amount > available {
            warn!(
                asset = %asset,
                requested = amount,
                available,
                reserved = self.reserved(asset),
                "Treasury guard rejected request"
            );
            return Err(TemplError::InsufficientTreasury {
                asset: asset.clone(),
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Holdings cover reservations for every asset
    pub fn verify(&self) -> TemplResult<()> {
        let member_pool = self.rewards.member_pool();
        std::iter::once(&member_pool.asset)
            .chain(self.rewards.registered_external().map(|s| &s.asset))
            .try_for_each(|asset| {
                let holdings = self.holdings(asset);
                let reserved = self.reserved(asset);
                if holdings < reserved {
                    warn!(asset = %asset, holdings, reserved, "Reservations exceed holdings");
                    return Err(TemplError::InsufficientTreasury {
                        asset: asset.clone(),
                        requested: reserved,
                        available: holdings,
                    });
                }
                Ok(())
            })
    }
}
