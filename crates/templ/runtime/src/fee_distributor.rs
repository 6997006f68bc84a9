//! Fee Distributor: splits collected fees and routes each share
//!
//! Burn, member-pool and protocol shares are computed with `apply_bps`
//! (rounded down); the treasury share takes whatever the other three leave,
//! so integer remainders are never dropped and never counted twice. A
//! referral is carved out of the protocol share.

use crate::outbox::Outbox;
use crate::reward_engine::RewardEngine;
use templ_types::{
    apply_bps, Address, Amount, AssetId, BasisPoints, FeeSplit, TemplConfig, TemplError,
    TemplResult, TreasuryState,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How one collected fee was divided
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub fee: Amount,
    pub burn: Amount,
    pub treasury: Amount,
    pub member_pool: Amount,
    /// Protocol share after any referral
    pub protocol: Amount,
    pub referral: Amount,
}

impl FeeBreakdown {
    /// Sum of every share; always equal to `fee`
    pub fn total(&self) -> Amount {
        self.burn + self.treasury + self.member_pool + self.protocol + self.referral
    }
}

/// Where a join fee comes from and who it rewards
#[derive(Clone, Debug)]
pub struct JoinFeeRouting<'a> {
    pub payer: &'a Address,
    pub referrer: Option<&'a Address>,
    /// Members present before the joiner; they share the pool portion
    pub members_before: u64,
}

pub struct FeeDistributor;

impl FeeDistributor {
    /// Split `fee` by the configured shares.
    ///
    /// The split is validated before anything else so a bad config can never
    /// reach state.
    pub fn split(
        fee: Amount,
        split: &FeeSplit,
        referral_share_bps: BasisPoints,
        with_referral: bool,
    ) -> TemplResult<FeeBreakdown> {
        split.validate()?;

        let burn = apply_bps(fee, split.burn_bps);
        let member_pool = apply_bps(fee, split.member_pool_bps);
        let protocol_total = apply_bps(fee, split.protocol_bps);
        let treasury = fee
            .checked_sub(burn)
            .and_then(|v| v.checked_sub(member_pool))
            .and_then(|v| v.checked_sub(protocol_total))
            .ok_or(TemplError::ArithmeticOverflow("fee split"))?;

        let referral = if with_referral {
            apply_bps(protocol_total, referral_share_bps)
        } else {
            0
        };

        Ok(FeeBreakdown {
            fee,
            burn,
            treasury,
            member_pool,
            protocol: protocol_total - referral,
            referral,
        })
    }

    /// Proposal creation fee as a share of the current entry fee
    pub fn proposal_fee(entry_fee: Amount, proposal_fee_bps: BasisPoints) -> Amount {
        apply_bps(entry_fee, proposal_fee_bps)
    }

    /// Queue the settlement for a join fee and book every share.
    ///
    /// The fee is collected into the templ account and the burn, protocol and
    /// referral shares are paid out of it in the same batch. Treasury and
    /// member-pool shares stay in holdings; the pool share is distributed to
    /// the members present before the joiner.
    pub fn route_join_fee(
        breakdown: &FeeBreakdown,
        routing: &JoinFeeRouting<'_>,
        config: &TemplConfig,
        treasury: &mut TreasuryState,
        rewards: &mut RewardEngine,
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        let asset = &config.access_asset;
        let templ = &config.templ_address;

        outbox.transfer(asset, routing.payer, templ, breakdown.fee);
        outbox.transfer(asset, templ, &config.burn_address, breakdown.burn);
        outbox.transfer(asset, templ, &config.protocol_recipient, breakdown.protocol);
        if let Some(referrer) = routing.referrer {
            outbox.transfer(asset, templ, referrer, breakdown.referral);
        }

        let retained = breakdown
            .treasury
            .checked_add(breakdown.member_pool)
            .ok_or(TemplError::ArithmeticOverflow("retained fee"))?;
        treasury.credit(asset, retained)?;
        treasury.record_burn(breakdown.burn)?;
        rewards.distribute_member_pool(breakdown.member_pool, routing.members_before, outbox)?;

        debug!(
            fee = breakdown.fee,
            burn = breakdown.burn,
            treasury = breakdown.treasury,
            member_pool = breakdown.member_pool,
            protocol = breakdown.protocol,
            referral = breakdown.referral,
            "Join fee routed"
        );

        Ok(())
    }

    /// Collect `amount` of `asset` from `from` straight into unreserved treasury
    pub fn collect_to_treasury(
        asset: &AssetId,
        from: &Address,
        amount: Amount,
        config: &TemplConfig,
        treasury: &mut TreasuryState,
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        outbox.transfer(asset, from, &config.templ_address, amount);
        treasury.credit(asset, amount)
    }
}
