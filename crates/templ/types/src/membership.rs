//! Membership records: who belongs to a templ
//!
//! Members are never deleted. A member's join sequence is assigned once and
//! is the boundary voting snapshots are expressed in.

use crate::{Address, Amount, AssetId, TemplError, TemplResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of a reward stream's cumulative counter for one member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRewardBaseline {
    /// Counter value at the last join or claim
    pub cumulative: Amount,
    /// Stream epoch the value was recorded in
    pub epoch: u64,
}

/// A record for a single member of a templ
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub address: Address,
    /// 1-indexed, unique, monotonic
    pub sequence: u64,
    pub joined_at: DateTime<Utc>,
    pub active: bool,
    /// Baseline against the member pool stream
    pub pool_baseline: Amount,
    /// Baselines against external streams, recorded lazily on first claim
    #[serde(default)]
    pub external_baselines: BTreeMap<AssetId, MemberRewardBaseline>,
}

impl MemberRecord {
    pub fn new(address: Address, sequence: u64, joined_at: DateTime<Utc>) -> Self {
        Self {
            address,
            sequence,
            joined_at,
            active: true,
            pool_baseline: 0,
            external_baselines: BTreeMap::new(),
        }
    }

    pub fn with_pool_baseline(mut self, baseline: Amount) -> Self {
        self.pool_baseline = baseline;
        self
    }

    /// Recorded baseline for an external stream, if it belongs to `epoch`
    pub fn external_baseline(&self, asset: &AssetId, epoch: u64) -> Option<Amount> {
        self.external_baselines
            .get(asset)
            .filter(|b| b.epoch == epoch)
            .map(|b| b.cumulative)
    }
}

/// All members of a templ, keyed by address
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemberRoster {
    members: BTreeMap<Address, MemberRecord>,
    /// Sequence numbers in join order
    order: Vec<Address>,
}

impl MemberRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next admitted member receives
    pub fn next_sequence(&self) -> u64 {
        self.order.len() as u64 + 1
    }

    /// Admit a new member, assigning the next sequence number
    pub fn admit(
        &mut self,
        address: Address,
        joined_at: DateTime<Utc>,
        pool_baseline: Amount,
    ) -> TemplResult<&MemberRecord> {
        if address.is_zero() {
            return Err(TemplError::ZeroIdentity("member"));
        }
        if self.members.contains_key(&address) {
            return Err(TemplError::AlreadyMember(address));
        }
        let record = MemberRecord::new(address.clone(), self.next_sequence(), joined_at)
            .with_pool_baseline(pool_baseline);
        self.order.push(address.clone());
        Ok(self.members.entry(address).or_insert(record))
    }

    pub fn get(&self, address: &Address) -> Option<&MemberRecord> {
        self.members.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut MemberRecord> {
        self.members.get_mut(address)
    }

    /// Look up a member or fail with an authorization error
    pub fn require(&self, address: &Address) -> TemplResult<&MemberRecord> {
        self.members
            .get(address)
            .ok_or_else(|| TemplError::NotMember(address.clone()))
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.members.contains_key(address)
    }

    pub fn count(&self) -> u64 {
        self.order.len() as u64
    }

    /// Members in join order
    pub fn iter(&self) -> impl Iterator<Item = &MemberRecord> {
        self.order.iter().filter_map(|a| self.members.get(a))
    }
}
