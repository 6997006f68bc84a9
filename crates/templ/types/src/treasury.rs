//! Treasury holdings
//!
//! Holdings count everything the templ owns per asset, including funds
//! reserved for reward streams. The reservation itself is computed by the
//! runtime guard from the streams; this type only does the arithmetic.

use crate::{Amount, AssetId, TemplError, TemplResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryState {
    holdings: BTreeMap<AssetId, Amount>,
    /// Cumulative amount sent to the burn address
    pub burned_total: Amount,
}

impl TreasuryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding(&self, asset: &AssetId) -> Amount {
        self.holdings.get(asset).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, asset: &AssetId, amount: Amount) -> TemplResult<()> {
        let entry = self.holdings.entry(asset.clone()).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(TemplError::ArithmeticOverflow("treasury holdings"))?;
        Ok(())
    }

    pub fn debit(&mut self, asset: &AssetId, amount: Amount) -> TemplResult<()> {
        let held = self.holding(asset);
        if amount > held {
            return Err(TemplError::InsufficientTreasury {
                asset: asset.clone(),
                requested: amount,
                available: held,
            });
        }
        self.holdings.insert(asset.clone(), held - amount);
        Ok(())
    }

    pub fn record_burn(&mut self, amount: Amount) -> TemplResult<()> {
        self.burned_total = self
            .burned_total
            .checked_add(amount)
            .ok_or(TemplError::ArithmeticOverflow("burned total"))?;
        Ok(())
    }

    /// Assets with a non-zero holding
    pub fn assets(&self) -> impl Iterator<Item = (&AssetId, Amount)> {
        self.holdings
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(asset, amount)| (asset, *amount))
    }
}
