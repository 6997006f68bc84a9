//! Reward Engine: member pool and external reward streams
//!
//! Both kinds of stream use [`RewardStream`]. Member-pool baselines are set
//! explicitly when a member joins; external-stream baselines are resolved
//! lazily from the checkpoint history the first time a member claims in an
//! epoch.

use crate::outbox::Outbox;
use std::collections::BTreeMap;
use templ_types::{
    Amount, AssetId, MemberRecord, MemberRewardBaseline, RewardStream, StreamKey,
    TemplConfig, TemplError, TemplEvent, TemplResult, TreasuryState,
    MAX_EXTERNAL_REWARD_STREAMS,
};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct RewardEngine {
    member_pool: RewardStream,
    /// Every stream ever registered, including deregistered ones so that
    /// their epoch survives re-registration
    external: BTreeMap<AssetId, RewardStream>,
}

impl RewardEngine {
    pub fn new(access_asset: AssetId) -> Self {
        Self {
            member_pool: RewardStream::member_pool(access_asset),
            external: BTreeMap::new(),
        }
    }

    /// Spread `amount` of the access asset over `members`
    pub fn distribute_member_pool(
        &mut self,
        amount: Amount,
        members: u64,
        outbox: &mut Outbox,
    ) -> TemplResult<Amount> {
        let per_member = self.member_pool.distribute(amount, members, outbox.now())?;
        debug!(
            amount,
            members,
            per_member,
            cumulative = self.member_pool.cumulative_per_member,
            "Member pool distribution"
        );
        Ok(per_member)
    }

    /// Register `asset` as an external stream, or re-register it in a new
    /// epoch if it was deregistered
    pub fn ensure_external_stream(
        &mut self,
        asset: &AssetId,
        members: u64,
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        if *asset == self.member_pool.asset {
            return Err(TemplError::InvalidProposal(
                "access asset rewards belong to the member pool".into(),
            ));
        }
        if self.external.get(asset).is_some_and(|s| s.registered) {
            return Ok(());
        }
        let registered = self.registered_external().count();
        if registered >= MAX_EXTERNAL_REWARD_STREAMS {
            return Err(TemplError::RewardStreamLimitReached {
                max: MAX_EXTERNAL_REWARD_STREAMS,
            });
        }

        let now = outbox.now();
        let epoch = match self.external.get_mut(asset) {
            Some(stream) => {
                stream.reregister(now, members);
                stream.epoch
            }
            None => {
                let stream = RewardStream::new(asset.clone(), now, members);
                let epoch = stream.epoch;
                self.external.insert(asset.clone(), stream);
                epoch
            }
        };

        info!(asset = %asset, epoch, "Reward stream registered");
        outbox.emit(TemplEvent::RewardStreamRegistered {
            asset: asset.clone(),
            epoch,
        });
        Ok(())
    }

    /// Spread `amount` of a registered external asset over `members`
    pub fn distribute_external(
        &mut self,
        asset: &AssetId,
        amount: Amount,
        members: u64,
        outbox: &mut Outbox,
    ) -> TemplResult<Amount> {
        let now = outbox.now();
        let stream = self.registered_mut(asset)?;
        let per_member = stream.distribute(amount, members, now)?;
        debug!(asset = %asset, amount, members, per_member, "External stream distribution");
        Ok(per_member)
    }

    /// Deregister an external stream once nothing is owed on it. The
    /// carried remainder becomes available treasury.
    pub fn deregister(&mut self, asset: &AssetId, outbox: &mut Outbox) -> TemplResult<Amount> {
        let released = self.registered_mut(asset)?.deregister()?;
        info!(asset = %asset, released, "Reward stream deregistered");
        outbox.emit(TemplEvent::RewardStreamDeregistered {
            asset: asset.clone(),
            released,
        });
        Ok(released)
    }

    /// Pay out everything `member` can claim from `key`.
    ///
    /// A zero claim changes nothing and queues nothing.
    pub fn claim(
        &mut self,
        member: &mut MemberRecord,
        key: &StreamKey,
        config: &TemplConfig,
        treasury: &mut TreasuryState,
        outbox: &mut Outbox,
    ) -> TemplResult<Amount> {
        let amount = self.claimable(member, key)?;
        if amount == 0 {
            debug!(member = %member.address, stream = %key, "Nothing to claim");
            return Ok(0);
        }

        let stream = match key {
            StreamKey::MemberPool => &mut self.member_pool,
            StreamKey::External(asset) => Self::registered_in(&mut self.external, asset)?,
        };
        stream.debit(amount)?;
        treasury.debit(&stream.asset, amount)?;

        let cumulative = stream.cumulative_per_member;
        match key {
            StreamKey::MemberPool => member.pool_baseline = cumulative,
            StreamKey::External(asset) => {
                member.external_baselines.insert(
                    asset.clone(),
                    MemberRewardBaseline {
                        cumulative,
                        epoch: stream.epoch,
                    },
                );
            }
        }

        outbox.transfer(&stream.asset, &config.templ_address, &member.address, amount);

        info!(member = %member.address, stream = %key, amount, "Rewards claimed");
        outbox.emit(TemplEvent::RewardClaimed {
            member: member.address.clone(),
            stream: key.clone(),
            amount,
        });
        Ok(amount)
    }

    // --- Query methods ---

    pub fn member_pool(&self) -> &RewardStream {
        &self.member_pool
    }

    /// Registered stream for `key`
    pub fn stream(&self, key: &StreamKey) -> TemplResult<&RewardStream> {
        match key {
            StreamKey::MemberPool => Ok(&self.member_pool),
            StreamKey::External(asset) => self
                .external
                .get(asset)
                .filter(|s| s.registered)
                .ok_or_else(|| TemplError::RewardStreamNotFound(asset.clone())),
        }
    }

    /// Current claimable amount for `member` from `key`
    pub fn claimable(&self, member: &MemberRecord, key: &StreamKey) -> TemplResult<Amount> {
        let stream = self.stream(key)?;
        let baseline = match key {
            StreamKey::MemberPool => member.pool_baseline,
            StreamKey::External(asset) => member
                .external_baseline(asset, stream.epoch)
                .unwrap_or_else(|| stream.baseline_for_sequence(member.sequence)),
        };
        Ok(stream.claimable(baseline))
    }

    pub fn registered_external(&self) -> impl Iterator<Item = &RewardStream> {
        self.external.values().filter(|s| s.registered)
    }

    /// Balance of `asset` owed to reward streams
    pub fn reserved(&self, asset: &AssetId) -> Amount {
        let pool = if *asset == self.member_pool.asset {
            self.member_pool.pool_balance
        } else {
            0
        };
        let external = self
            .external
            .get(asset)
            .map(|s| s.pool_balance)
            .unwrap_or(0);
        pool.saturating_add(external)
    }

    fn registered_mut(&mut self, asset: &AssetId) -> TemplResult<&mut RewardStream> {
        Self::registered_in(&mut self.external, asset)
    }

    fn registered_in<'a>(
        external: &'a mut BTreeMap<AssetId, RewardStream>,
        asset: &AssetId,
    ) -> TemplResult<&'a mut RewardStream> {
        external
            .get_mut(asset)
            .filter(|s| s.registered)
            .ok_or_else(|| TemplError::RewardStreamNotFound(asset.clone()))
    }
}
