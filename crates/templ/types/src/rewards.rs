//! Reward stream bookkeeping
//!
//! A [`RewardStream`] tracks one pool of claimable rewards using a
//! cumulative-reward-per-member counter. Distributing `amount` among `n`
//! members raises the counter by `amount / n`; the remainder is carried to the
//! next distribution. A member's claimable share is the counter minus the
//! member's baseline, so distribution cost does not depend on member count.
//!
//! The member pool and every external asset use the same structure. External
//! streams additionally rely on the checkpoint history to resolve a baseline
//! for members that never claimed, and on epochs to invalidate baselines from
//! before a deregistration. The member pool sets baselines at join time and
//! keeps no history.

use crate::{Amount, AssetId, TemplError, TemplResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which stream a claim or view refers to
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StreamKey {
    /// The member pool, paid in the access asset
    MemberPool,
    /// A registered external reward asset
    External(AssetId),
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKey::MemberPool => write!(f, "member-pool"),
            StreamKey::External(asset) => write!(f, "external:{}", asset),
        }
    }
}

/// State of a stream right after a distribution or registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCheckpoint {
    pub at: DateTime<Utc>,
    /// Members present when the checkpoint was taken
    pub members_at: u64,
    pub cumulative: Amount,
    pub pool_balance: Amount,
}

/// Cumulative-checkpoint accounting for one reward asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStream {
    pub asset: AssetId,
    /// Funds reserved for this stream and not yet claimed
    pub pool_balance: Amount,
    /// Monotonically non-decreasing reward per member
    pub cumulative_per_member: Amount,
    /// Division remainder carried into the next distribution
    pub undistributed: Amount,
    /// History for the current epoch, oldest first
    pub checkpoints: Vec<RewardCheckpoint>,
    /// Bumped on every re-registration
    pub epoch: u64,
    /// Counter value when the current epoch started
    pub epoch_start_cumulative: Amount,
    pub registered: bool,
    /// Whether distributions are checkpointed
    pub keeps_history: bool,
}

impl RewardStream {
    /// Create a stream registered at `at` with `members` present
    pub fn new(asset: AssetId, at: DateTime<Utc>, members: u64) -> Self {
        let mut stream = Self {
            asset,
            pool_balance: 0,
            cumulative_per_member: 0,
            undistributed: 0,
            checkpoints: Vec::new(),
            epoch: 1,
            epoch_start_cumulative: 0,
            registered: true,
            keeps_history: true,
        };
        stream.checkpoint(at, members);
        stream
    }

    /// Create the member pool for `asset`. It never records checkpoints.
    pub fn member_pool(asset: AssetId) -> Self {
        Self {
            asset,
            pool_balance: 0,
            cumulative_per_member: 0,
            undistributed: 0,
            checkpoints: Vec::new(),
            epoch: 1,
            epoch_start_cumulative: 0,
            registered: true,
            keeps_history: false,
        }
    }

    /// Record the stream state. Baselines only need the latest checkpoint
    /// per member count, so one taken at an unchanged count replaces the
    /// previous entry and the history grows with joins, not distributions.
    fn checkpoint(&mut self, at: DateTime<Utc>, members: u64) {
        if !self.keeps_history {
            return;
        }
        let checkpoint = RewardCheckpoint {
            at,
            members_at: members,
            cumulative: self.cumulative_per_member,
            pool_balance: self.pool_balance,
        };
        match self.checkpoints.last_mut() {
            Some(last) if last.members_at == members => *last = checkpoint,
            _ => self.checkpoints.push(checkpoint),
        }
    }

    /// Add `amount` to the pool and spread it over `members`.
    ///
    /// Returns the per-member increment. With no members everything stays
    /// undistributed.
    pub fn distribute(
        &mut self,
        amount: Amount,
        members: u64,
        at: DateTime<Utc>,
    ) -> TemplResult<Amount> {
        self.pool_balance = self
            .pool_balance
            .checked_add(amount)
            .ok_or(TemplError::ArithmeticOverflow("reward pool balance"))?;
        let total = self
            .undistributed
            .checked_add(amount)
            .ok_or(TemplError::ArithmeticOverflow("undistributed rewards"))?;

        let per_member = if members == 0 {
            self.undistributed = total;
            0
        } else {
            let per_member = total / members as u128;
            self.undistributed = total % members as u128;
            self.cumulative_per_member = self
                .cumulative_per_member
                .checked_add(per_member)
                .ok_or(TemplError::ArithmeticOverflow("cumulative reward"))?;
            per_member
        };

        self.checkpoint(at, members);
        Ok(per_member)
    }

    /// Claimable amount for a baseline, capped at the pool balance
    pub fn claimable(&self, baseline: Amount) -> Amount {
        self.cumulative_per_member
            .saturating_sub(baseline)
            .min(self.pool_balance)
    }

    /// Remove a claimed amount from the pool
    pub fn debit(&mut self, amount: Amount) -> TemplResult<()> {
        if amount > self.pool_balance {
            return Err(TemplError::InsufficientRewardPool {
                asset: self.asset.clone(),
                requested: amount,
                available: self.pool_balance,
            });
        }
        self.pool_balance -= amount;
        Ok(())
    }

    /// Counter value in effect before the member with `sequence` joined.
    ///
    /// This is the cumulative of the last checkpoint in the current epoch
    /// taken while fewer than `sequence` members existed, or the epoch start.
    pub fn baseline_for_sequence(&self, sequence: u64) -> Amount {
        let idx = self
            .checkpoints
            .partition_point(|c| c.members_at < sequence);
        match idx {
            0 => self.epoch_start_cumulative,
            n => self.checkpoints[n - 1].cumulative,
        }
    }

    /// Balance still owed to members, excluding the carried remainder
    pub fn owed(&self) -> Amount {
        self.pool_balance.saturating_sub(self.undistributed)
    }

    /// Stop the stream once every member share has been claimed.
    ///
    /// The carried remainder can never be claimed, so it is released from
    /// the pool and returned; it stays in treasury holdings unreserved.
    pub fn deregister(&mut self) -> TemplResult<Amount> {
        if self.owed() != 0 {
            return Err(TemplError::RewardStreamNotEmpty {
                asset: self.asset.clone(),
                pool_balance: self.pool_balance,
            });
        }
        let released = self.pool_balance;
        self.pool_balance = 0;
        self.undistributed = 0;
        self.registered = false;
        Ok(released)
    }

    /// Start a new epoch from the current counter
    pub fn reregister(&mut self, at: DateTime<Utc>, members: u64) {
        self.epoch += 1;
        self.epoch_start_cumulative = self.cumulative_per_member;
        self.undistributed = 0;
        self.checkpoints.clear();
        self.registered = true;
        self.checkpoint(at, members);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stream() -> RewardStream {
        RewardStream::new(AssetId::new("DONATED"), Utc::now(), 2)
    }

    #[test]
    fn test_distribute_even_split() {
        let mut s = stream();
        assert_eq!(s.distribute(100, 2, Utc::now()).unwrap(), 50);
        assert_eq!(s.cumulative_per_member, 50);
        assert_eq!(s.pool_balance, 100);
        assert_eq!(s.undistributed, 0);
        assert_eq!(s.claimable(0), 50);
    }

    #[test]
    fn test_remainder_carried_forward() {
        let mut s = stream();
        s.distribute(10, 3, Utc::now()).unwrap();
        assert_eq!(s.cumulative_per_member, 3);
        assert_eq!(s.undistributed, 1);

        // 1 carried + 5 new = 6 -> 2 each
        s.distribute(5, 3, Utc::now()).unwrap();
        assert_eq!(s.cumulative_per_member, 5);
        assert_eq!(s.undistributed, 0);
        assert_eq!(s.pool_balance, 15);
    }

    #[test]
    fn test_no_members_keeps_everything_undistributed() {
        let mut s = RewardStream::new(AssetId::new("X"), Utc::now(), 0);
        assert_eq!(s.distribute(30, 0, Utc::now()).unwrap(), 0);
        assert_eq!(s.undistributed, 30);
        assert_eq!(s.cumulative_per_member, 0);
        assert_eq!(s.distribute(0, 1, Utc::now()).unwrap(), 30);
    }

    #[test]
    fn test_claimable_capped_at_pool() {
        let mut s = stream();
        s.distribute(100, 2, Utc::now()).unwrap();
        s.debit(80).unwrap();
        assert_eq!(s.claimable(0), 20);
        assert!(matches!(
            s.debit(21),
            Err(TemplError::InsufficientRewardPool { .. })
        ));
    }

    #[test]
    fn test_baseline_for_sequence_excludes_earlier_distributions() {
        let t0 = Utc::now();
        let mut s = RewardStream::new(AssetId::new("X"), t0, 2);
        s.distribute(100, 2, t0 + Duration::seconds(1)).unwrap();
        s.distribute(90, 3, t0 + Duration::seconds(2)).unwrap();

        // Members 1 and 2 saw both distributions
        assert_eq!(s.baseline_for_sequence(1), 0);
        assert_eq!(s.baseline_for_sequence(2), 0);
        // Member 3 joined after the first one
        assert_eq!(s.baseline_for_sequence(3), 50);
        // Member 4 joined after both
        assert_eq!(s.baseline_for_sequence(4), 80);
    }

    #[test]
    fn test_deregister_requires_empty_pool() {
        let mut s = stream();
        s.distribute(100, 2, Utc::now()).unwrap();
        assert!(matches!(
            s.deregister(),
            Err(TemplError::RewardStreamNotEmpty { .. })
        ));
        s.debit(100).unwrap();
        assert_eq!(s.deregister().unwrap(), 0);
        assert!(!s.registered);
    }

    #[test]
    fn test_deregister_releases_remainder() {
        let mut s = stream();
        s.distribute(101, 2, Utc::now()).unwrap();
        assert_eq!(s.owed(), 100);
        s.debit(50).unwrap();
        assert!(matches!(
            s.deregister(),
            Err(TemplError::RewardStreamNotEmpty { pool_balance: 51, .. })
        ));

        s.debit(50).unwrap();
        assert_eq!(s.pool_balance, 1);
        assert_eq!(s.deregister().unwrap(), 1);
        assert_eq!(s.pool_balance, 0);
        assert_eq!(s.undistributed, 0);
        assert!(!s.registered);
    }

    #[test]
    fn test_member_pool_keeps_no_checkpoints() {
        let mut s = RewardStream::member_pool(AssetId::new("ACCESS"));
        for members in 1..=20 {
            s.distribute(30, members, Utc::now()).unwrap();
        }
        assert!(s.checkpoints.is_empty());
        assert_eq!(s.pool_balance, 600);
    }

    #[test]
    fn test_checkpoints_grow_with_member_count_only() {
        let t0 = Utc::now();
        let mut s = RewardStream::new(AssetId::new("X"), t0, 2);
        for i in 1..=50 {
            s.distribute(10, 2, t0 + Duration::seconds(i)).unwrap();
        }
        assert_eq!(s.checkpoints.len(), 1);
        assert_eq!(s.checkpoints[0].cumulative, 250);

        s.distribute(30, 3, t0 + Duration::seconds(60)).unwrap();
        s.distribute(30, 3, t0 + Duration::seconds(61)).unwrap();
        assert_eq!(s.checkpoints.len(), 2);
        // Member 3 still starts after everything paid to two members
        assert_eq!(s.baseline_for_sequence(3), 250);
        assert_eq!(s.baseline_for_sequence(4), 270);
    }

    #[test]
    fn test_reregister_starts_new_epoch() {
        let mut s = stream();
        s.distribute(100, 2, Utc::now()).unwrap();
        s.debit(100).unwrap();
        s.deregister().unwrap();

        s.reregister(Utc::now(), 2);
        assert_eq!(s.epoch, 2);
        assert_eq!(s.epoch_start_cumulative, 50);
        assert_eq!(s.checkpoints.len(), 1);
        assert_eq!(s.baseline_for_sequence(1), 50);
        assert_eq!(s.baseline_for_sequence(3), 50);
    }
}
