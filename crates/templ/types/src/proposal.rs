//! Governance proposals, votes and typed actions

use crate::{
    Address, Amount, AssetId, BasisPoints, EntryFeeCurve, FeeSplit, GovernanceParams,
    ProposalId, TemplError, TemplMetadata, TemplResult, BPS_DENOMINATOR,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest accepted proposal title
pub const MAX_TITLE_LEN: usize = 256;

/// Action dispatched when a proposal executes.
///
/// Matched exhaustively by the action executor; the admin path in
/// dictatorship mode dispatches the same variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    SetJoinPaused {
        paused: bool,
    },
    UpdateFeeSplit {
        split: FeeSplit,
    },
    UpdateEntryFeeCurve {
        curve: EntryFeeCurve,
    },
    /// 0 removes the cap
    SetMaxMembers {
        max_members: u64,
    },
    UpdateMetadata {
        metadata: TemplMetadata,
    },
    SetProposalFee {
        proposal_fee_bps: BasisPoints,
    },
    SetReferralShare {
        referral_share_bps: BasisPoints,
    },
    UpdateGovernanceParams {
        params: GovernanceParams,
    },
    ChangeAdmin {
        new_admin: Address,
    },
    SetDictatorship {
        enabled: bool,
    },
    SetCouncilMode {
        enabled: bool,
    },
    AddCouncilMember {
        member: Address,
    },
    RemoveCouncilMember {
        member: Address,
    },
    /// Arbitrary call; `value` is paid from native-asset treasury
    CallExternal {
        target: Address,
        value: Amount,
        payload: Vec<u8>,
    },
    WithdrawTreasury {
        asset: AssetId,
        recipient: Address,
        amount: Amount,
        reason: String,
    },
    /// Move all available balance of `asset` into a reward stream
    DisbandTreasury {
        asset: AssetId,
    },
    DeregisterRewardStream {
        asset: AssetId,
    },
}

impl ProposalAction {
    /// Short name used in logs and events
    pub fn name(&self) -> &'static str {
        match self {
            ProposalAction::SetJoinPaused { .. } => "set_join_paused",
            ProposalAction::UpdateFeeSplit { .. } => "update_fee_split",
            ProposalAction::UpdateEntryFeeCurve { .. } => "update_entry_fee_curve",
            ProposalAction::SetMaxMembers { .. } => "set_max_members",
            ProposalAction::UpdateMetadata { .. } => "update_metadata",
            ProposalAction::SetProposalFee { .. } => "set_proposal_fee",
            ProposalAction::SetReferralShare { .. } => "set_referral_share",
            ProposalAction::UpdateGovernanceParams { .. } => "update_governance_params",
            ProposalAction::ChangeAdmin { .. } => "change_admin",
            ProposalAction::SetDictatorship { .. } => "set_dictatorship",
            ProposalAction::SetCouncilMode { .. } => "set_council_mode",
            ProposalAction::AddCouncilMember { .. } => "add_council_member",
            ProposalAction::RemoveCouncilMember { .. } => "remove_council_member",
            ProposalAction::CallExternal { .. } => "call_external",
            ProposalAction::WithdrawTreasury { .. } => "withdraw_treasury",
            ProposalAction::DisbandTreasury { .. } => "disband_treasury",
            ProposalAction::DeregisterRewardStream { .. } => "deregister_reward_stream",
        }
    }

    /// The only kind of proposal accepted while dictatorship is on
    pub fn disables_dictatorship(&self) -> bool {
        matches!(self, ProposalAction::SetDictatorship { enabled: false })
    }

    /// Checks that need no templ state. Run at creation so a malformed
    /// payload never occupies a proposer's slot.
    pub fn validate(&self) -> TemplResult<()> {
        match self {
            ProposalAction::UpdateFeeSplit { split } => split.validate(),
            ProposalAction::UpdateEntryFeeCurve { curve } => curve.validate(),
            ProposalAction::UpdateMetadata { metadata } => metadata.validate(),
            ProposalAction::UpdateGovernanceParams { params } => params.validate(),
            ProposalAction::SetProposalFee { proposal_fee_bps: bps }
            | ProposalAction::SetReferralShare {
                referral_share_bps: bps,
            } => {
                if *bps > BPS_DENOMINATOR {
                    return Err(TemplError::InvalidProposal(format!(
                        "share of {} bps exceeds 10000",
                        bps
                    )));
                }
                Ok(())
            }
            ProposalAction::ChangeAdmin { new_admin } => {
                if new_admin.is_zero() {
                    return Err(TemplError::ZeroIdentity("new_admin"));
                }
                Ok(())
            }
            ProposalAction::AddCouncilMember { member }
            | ProposalAction::RemoveCouncilMember { member } => {
                if member.is_zero() {
                    return Err(TemplError::ZeroIdentity("council member"));
                }
                Ok(())
            }
            ProposalAction::CallExternal { target, .. } => {
                if target.is_zero() {
                    return Err(TemplError::ZeroIdentity("call target"));
                }
                Ok(())
            }
            ProposalAction::WithdrawTreasury {
                recipient, amount, ..
            } => {
                if recipient.is_zero() {
                    return Err(TemplError::ZeroIdentity("withdrawal recipient"));
                }
                if *amount == 0 {
                    return Err(TemplError::InvalidAmount(
                        "withdrawal amount must be non-zero".into(),
                    ));
                }
                Ok(())
            }
            ProposalAction::SetJoinPaused { .. }
            | ProposalAction::SetMaxMembers { .. }
            | ProposalAction::SetDictatorship { .. }
            | ProposalAction::SetCouncilMode { .. }
            | ProposalAction::DisbandTreasury { .. }
            | ProposalAction::DeregisterRewardStream { .. } => Ok(()),
        }
    }
}

/// A single voter's current choice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub support: bool,
    pub cast_at: DateTime<Utc>,
}

/// Lifecycle position of a proposal at a given instant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Voting open, quorum not yet reached
    Active,
    /// Voting open, quorum locked, waiting for the delay or deadline
    QuorumReached,
    /// Passing and timing satisfied
    Executable,
    Executed,
    /// Deadline passed without a passing outcome
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Executed | ProposalStatus::Expired)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProposalStatus::Active => "active",
            ProposalStatus::QuorumReached => "quorum-reached",
            ProposalStatus::Executable => "executable",
            ProposalStatus::Executed => "executed",
            ProposalStatus::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// A governance proposal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub action: ProposalAction,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub voting_deadline: DateTime<Utc>,
    /// Highest join sequence allowed to vote
    pub eligibility_cutoff: u64,
    /// Size of the eligible set, re-snapshotted once at quorum
    pub eligible_voters: u64,
    /// Voting restricted to the council
    pub council_only: bool,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub quorum_reached_at: Option<DateTime<Utc>>,
    pub executed: bool,
    pub passed: bool,
    pub executed_at: Option<DateTime<Utc>>,
    pub votes: BTreeMap<Address, VoteRecord>,
}

impl Proposal {
    pub fn total_votes(&self) -> u64 {
        self.yes_votes + self.no_votes
    }

    /// `(yes + no) * 10_000 >= quorum_bps * eligible`
    pub fn meets_quorum(&self, quorum_bps: BasisPoints) -> bool {
        self.total_votes() as u128 * BPS_DENOMINATOR as u128
            >= quorum_bps as u128 * self.eligible_voters as u128
    }

    /// Quorum counts if a vote locked it, or if the final tallies meet it
    /// once voting has closed. Only a locked quorum opens the fast path.
    pub fn has_quorum(&self, now: DateTime<Utc>, quorum_bps: BasisPoints) -> bool {
        self.quorum_reached_at.is_some()
            || (now >= self.voting_deadline && self.meets_quorum(quorum_bps))
    }

    pub fn is_passing(&self, now: DateTime<Utc>, quorum_bps: BasisPoints) -> bool {
        self.has_quorum(now, quorum_bps) && self.yes_votes > self.no_votes
    }

    pub fn voting_open(&self, now: DateTime<Utc>) -> bool {
        !self.executed && now < self.voting_deadline
    }

    /// Earliest instant either execution path opens
    pub fn executable_from(&self, execution_delay: Duration) -> DateTime<Utc> {
        match self.quorum_reached_at {
            Some(at) => (at + execution_delay).min(self.voting_deadline),
            None => self.voting_deadline,
        }
    }

    pub fn status(&self, now: DateTime<Utc>, governance: &GovernanceParams) -> ProposalStatus {
        if self.executed {
            return ProposalStatus::Executed;
        }
        if self.is_passing(now, governance.quorum_bps)
            && now >= self.executable_from(governance.execution_delay)
        {
            return ProposalStatus::Executable;
        }
        if now >= self.voting_deadline {
            return ProposalStatus::Expired;
        }
        if self.quorum_reached_at.is_some() {
            ProposalStatus::QuorumReached
        } else {
            ProposalStatus::Active
        }
    }

    /// Record or overwrite a vote, adjusting tallies by the delta.
    ///
    /// Returns the previous choice, if any.
    pub fn record_vote(
        &mut self,
        voter: Address,
        support: bool,
        at: DateTime<Utc>,
    ) -> Option<bool> {
        let previous = self
            .votes
            .insert(voter, VoteRecord { support, cast_at: at })
            .map(|v| v.support);

        match previous {
            Some(true) => self.yes_votes -= 1,
            Some(false) => self.no_votes -= 1,
            None => {}
        }
        if support {
            self.yes_votes += 1;
        } else {
            self.no_votes += 1;
        }
        previous
    }

    pub fn vote_of(&self, voter: &Address) -> Option<&VoteRecord> {
        self.votes.get(voter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(eligible: u64) -> Proposal {
        let now = Utc::now();
        Proposal {
            id: ProposalId(1),
            proposer: Address::new("alice"),
            action: ProposalAction::SetJoinPaused { paused: true },
            title: "pause".into(),
            description: String::new(),
            created_at: now,
            voting_deadline: now + Duration::days(7),
            eligibility_cutoff: eligible,
            eligible_voters: eligible,
            council_only: false,
            yes_votes: 0,
            no_votes: 0,
            quorum_reached_at: None,
            executed: false,
            passed: false,
            executed_at: None,
            votes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_vote_overwrite_adjusts_by_delta() {
        let mut p = proposal(3);
        let now = Utc::now();
        assert_eq!(p.record_vote(Address::new("alice"), true, now), None);
        assert_eq!(p.record_vote(Address::new("bob"), true, now), None);
        assert_eq!((p.yes_votes, p.no_votes), (2, 0));

        assert_eq!(p.record_vote(Address::new("bob"), false, now), Some(true));
        assert_eq!((p.yes_votes, p.no_votes), (1, 1));

        // Same vote again changes nothing
        p.record_vote(Address::new("bob"), false, now);
        assert_eq!((p.yes_votes, p.no_votes), (1, 1));
        assert_eq!(p.total_votes(), 2);
    }

    #[test]
    fn test_quorum_uses_integer_cross_multiplication() {
        let mut p = proposal(3);
        p.yes_votes = 1;
        // 1 * 10000 >= 3300 * 3
        assert!(p.meets_quorum(3_300));
        assert!(!p.meets_quorum(3_400));
        p.yes_votes = 2;
        assert!(p.meets_quorum(6_600));
        assert!(!p.meets_quorum(6_700));
    }

    #[test]
    fn test_status_transitions() {
        let mut p = proposal(3);
        let governance = GovernanceParams::default();
        let t0 = p.created_at;
        assert_eq!(p.status(t0, &governance), ProposalStatus::Active);

        p.record_vote(Address::new("alice"), true, t0);
        p.quorum_reached_at = Some(t0 + Duration::hours(1));
        assert_eq!(
            p.status(t0 + Duration::hours(2), &governance),
            ProposalStatus::QuorumReached
        );
        assert_eq!(
            p.status(t0 + Duration::hours(37), &governance),
            ProposalStatus::Executable
        );

        p.executed = true;
        assert_eq!(p.status(t0, &governance), ProposalStatus::Executed);
    }

    #[test]
    fn test_status_expired_without_quorum() {
        let p = proposal(3);
        let after = p.voting_deadline + Duration::seconds(1);
        assert_eq!(
            p.status(after, &GovernanceParams::default()),
            ProposalStatus::Expired
        );
        assert!(ProposalStatus::Expired.is_terminal());
    }

    #[test]
    fn test_unlocked_quorum_counts_once_voting_closes() {
        let mut p = proposal(3);
        let governance = GovernanceParams::default();
        p.record_vote(Address::new("alice"), true, p.created_at);

        // 1 of 3 meets 33% but nobody voted after creation to lock it
        assert!(p.quorum_reached_at.is_none());
        let before = p.voting_deadline - Duration::seconds(1);
        assert!(!p.is_passing(before, governance.quorum_bps));
        assert_eq!(p.status(before, &governance), ProposalStatus::Active);

        let deadline = p.voting_deadline;
        assert!(p.is_passing(deadline, governance.quorum_bps));
        assert_eq!(p.status(deadline, &governance), ProposalStatus::Executable);

        // A tally short of quorum still expires
        assert!(!p.is_passing(deadline, 3_400));
    }

    #[test]
    fn test_executable_from_takes_earlier_path() {
        let mut p = proposal(3);
        assert_eq!(p.executable_from(Duration::hours(1)), p.voting_deadline);
        let q = p.voting_deadline - Duration::minutes(30);
        p.quorum_reached_at = Some(q);
        assert_eq!(p.executable_from(Duration::hours(1)), p.voting_deadline);
        assert_eq!(
            p.executable_from(Duration::minutes(10)),
            q + Duration::minutes(10)
        );
    }

    #[test]
    fn test_action_validation() {
        assert!(ProposalAction::SetJoinPaused { paused: true }.validate().is_ok());
        assert!(ProposalAction::UpdateFeeSplit {
            split: FeeSplit::new(1, 1, 1, 1)
        }
        .validate()
        .is_err());
        assert!(matches!(
            ProposalAction::WithdrawTreasury {
                asset: AssetId::new("T"),
                recipient: Address::new("bob"),
                amount: 0,
                reason: String::new(),
            }
            .validate(),
            Err(TemplError::InvalidAmount(_))
        ));
        assert!(matches!(
            ProposalAction::ChangeAdmin {
                new_admin: Address::new("")
            }
            .validate(),
            Err(TemplError::ZeroIdentity(_))
        ));
        assert!(ProposalAction::SetDictatorship { enabled: false }.disables_dictatorship());
        assert!(!ProposalAction::SetDictatorship { enabled: true }.disables_dictatorship());
    }
}
