//! Governance Engine: proposal lifecycle
//!
//! Active -> QuorumReached -> Executable -> Executed, or Expired once the
//! deadline passes without a passing outcome. Every time-driven transition is
//! evaluated lazily against the instant the current operation observes.
//!
//! Voter eligibility is a join-sequence cutoff frozen at creation. The first
//! vote that satisfies quorum re-freezes it to the member count at that
//! instant, permanently. The YES recorded for the proposer at creation never
//! locks quorum on its own, but once voting closes the final tallies are
//! held to the same ratio, so a proposal carried by its proposer alone can
//! still pass on the full-period path.

use crate::outbox::Outbox;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use templ_types::{
    Address, Amount, BasisPoints, GovernanceParams, MemberRecord, Proposal, ProposalAction,
    ProposalId, ProposalStatus, TemplConfig, TemplError, TemplEvent, TemplResult, VoteRecord,
    MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
use tracing::{debug, info, warn};

/// Everything a proposer supplies
#[derive(Clone, Debug)]
pub struct NewProposal {
    pub action: ProposalAction,
    pub title: String,
    pub description: String,
    /// Falls back to the configured default
    pub voting_period: Option<Duration>,
}

impl NewProposal {
    pub fn new(action: ProposalAction, title: impl Into<String>) -> Self {
        Self {
            action,
            title: title.into(),
            description: String::new(),
            voting_period: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_voting_period(mut self, period: Duration) -> Self {
        self.voting_period = Some(period);
        self
    }

    fn validate(&self) -> TemplResult<()> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            return Err(TemplError::InvalidProposal("title is empty".into()));
        }
        if title_len > MAX_TITLE_LEN {
            return Err(TemplError::InvalidProposal(format!(
                "title longer than {} chars",
                MAX_TITLE_LEN
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(TemplError::InvalidProposal(format!(
                "description longer than {} chars",
                MAX_DESCRIPTION_LEN
            )));
        }
        self.action.validate()
    }
}

/// Result of a successful vote
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded; quorum unchanged
    Recorded { yes_votes: u64, no_votes: u64 },
    /// Vote recorded and it locked quorum
    QuorumReached { yes_votes: u64, no_votes: u64 },
}

#[derive(Clone, Debug, Default)]
pub struct GovernanceEngine {
    proposals: BTreeMap<ProposalId, Proposal>,
    /// Ids still worth iterating; pruned by maintenance
    active_index: Vec<ProposalId>,
    last_id: u64,
    /// Proposer -> their latest undecided proposal
    open_by_proposer: BTreeMap<Address, ProposalId>,
    council: BTreeSet<Address>,
    council_mode: bool,
}

impl GovernanceEngine {
    /// Create an engine whose council starts with `admin`
    pub fn new(admin: Address) -> Self {
        let mut council = BTreeSet::new();
        council.insert(admin);
        Self {
            council,
            ..Self::default()
        }
    }

    /// Create a proposal and record the proposer's YES
    pub fn create(
        &mut self,
        request: NewProposal,
        proposer: &MemberRecord,
        member_count: u64,
        config: &TemplConfig,
        fee: Amount,
        outbox: &mut Outbox,
    ) -> TemplResult<ProposalId> {
        let now = outbox.now();

        if config.dictatorship && !request.action.disables_dictatorship() {
            return Err(TemplError::DictatorshipActive);
        }
        request.validate()?;

        if self.council_mode && !self.council.contains(&proposer.address) {
            return Err(TemplError::NotCouncilMember(proposer.address.clone()));
        }
        if let Some(open) = self.open_proposal_of(&proposer.address, now) {
            return Err(TemplError::ActiveProposalExists {
                proposer: proposer.address.clone(),
                proposal_id: open,
            });
        }
        let period = config
            .governance
            .resolve_voting_period(request.voting_period)?;

        let id = ProposalId(self.last_id + 1);
        let eligible_voters = if self.council_mode {
            self.council.len() as u64
        } else {
            member_count
        };

        let mut proposal = Proposal {
            id,
            proposer: proposer.address.clone(),
            action: request.action,
            title: request.title,
            description: request.description,
            created_at: now,
            voting_deadline: now + period,
            eligibility_cutoff: member_count,
            eligible_voters,
            council_only: self.council_mode,
            yes_votes: 0,
            no_votes: 0,
            quorum_reached_at: None,
            executed: false,
            passed: false,
            executed_at: None,
            votes: BTreeMap::new(),
        };
        proposal.record_vote(proposer.address.clone(), true, now);

        info!(
            proposal_id = %id,
            proposer = %proposer.address,
            action = proposal.action.name(),
            deadline = %proposal.voting_deadline,
            eligible_voters,
            "Proposal created"
        );
        outbox.emit(TemplEvent::ProposalCreated {
            proposal_id: id,
            proposer: proposer.address.clone(),
            action: proposal.action.name().to_string(),
            title: proposal.title.clone(),
            voting_deadline: proposal.voting_deadline,
            fee,
        });

        self.last_id = id.0;
        self.open_by_proposer.insert(proposer.address.clone(), id);
        self.active_index.push(id);
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    /// Record or change a vote, locking quorum when it is first met
    pub fn vote(
        &mut self,
        id: ProposalId,
        voter: &MemberRecord,
        support: bool,
        member_count: u64,
        quorum_bps: BasisPoints,
        outbox: &mut Outbox,
    ) -> TemplResult<VoteOutcome> {
        let now = outbox.now();
        let council_size = self.council.len() as u64;
        let in_council = self.council.contains(&voter.address);

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(TemplError::ProposalNotFound(id))?;

        if proposal.executed {
            return Err(TemplError::ProposalAlreadyExecuted(id));
        }
        if now >= proposal.voting_deadline {
            return Err(TemplError::VotingClosed(id));
        }
        if proposal.council_only {
            if !in_council {
                return Err(TemplError::NotCouncilMember(voter.address.clone()));
            }
        } else if voter.sequence > proposal.eligibility_cutoff {
            warn!(
                proposal_id = %id,
                voter = %voter.address,
                sequence = voter.sequence,
                cutoff = proposal.eligibility_cutoff,
                "Vote from member who joined after the cutoff"
            );
            return Err(TemplError::NotEligibleVoter {
                voter: voter.address.clone(),
                proposal_id: id,
            });
        }

        let previous = proposal.record_vote(voter.address.clone(), support, now);
        debug!(
            proposal_id = %id,
            voter = %voter.address,
            support,
            changed = previous.is_some(),
            yes = proposal.yes_votes,
            no = proposal.no_votes,
            "Vote recorded"
        );
        outbox.emit(TemplEvent::VoteCast {
            proposal_id: id,
            voter: voter.address.clone(),
            support,
            yes_votes: proposal.yes_votes,
            no_votes: proposal.no_votes,
        });

        let (yes_votes, no_votes) = (proposal.yes_votes, proposal.no_votes);
        if proposal.quorum_reached_at.is_some() || !proposal.meets_quorum(quorum_bps) {
            return Ok(VoteOutcome::Recorded {
                yes_votes,
                no_votes,
            });
        }

        proposal.quorum_reached_at = Some(now);
        proposal.eligibility_cutoff = member_count;
        proposal.eligible_voters = if proposal.council_only {
            council_size
        } else {
            member_count
        };

        info!(
            proposal_id = %id,
            cutoff = proposal.eligibility_cutoff,
            eligible_voters = proposal.eligible_voters,
            "Quorum reached"
        );
        outbox.emit(TemplEvent::QuorumReached {
            proposal_id: id,
            eligibility_cutoff: proposal.eligibility_cutoff,
            eligible_voters: proposal.eligible_voters,
        });
        Ok(VoteOutcome::QuorumReached {
            yes_votes,
            no_votes,
        })
    }

    /// Mark a passing, timely proposal executed and hand back its action.
    ///
    /// The caller dispatches the action inside the same operation; if that
    /// fails the whole operation is discarded, this mark included.
    pub fn execute(
        &mut self,
        id: ProposalId,
        governance: &GovernanceParams,
        outbox: &mut Outbox,
    ) -> TemplResult<ProposalAction> {
        let now = outbox.now();
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(TemplError::ProposalNotFound(id))?;

        if proposal.executed {
            return Err(TemplError::ProposalAlreadyExecuted(id));
        }
        if !proposal.is_passing(now, governance.quorum_bps) {
            if now >= proposal.voting_deadline {
                return Err(TemplError::ProposalNotPassed(id));
            }
            return Err(TemplError::ProposalNotExecutable(id));
        }
        if now < proposal.executable_from(governance.execution_delay) {
            return Err(TemplError::ProposalNotExecutable(id));
        }

        proposal.executed = true;
        proposal.passed = true;
        proposal.executed_at = Some(now);
        let action = proposal.action.clone();
        let proposer = proposal.proposer.clone();

        if self.open_by_proposer.get(&proposer) == Some(&id) {
            self.open_by_proposer.remove(&proposer);
        }

        info!(proposal_id = %id, action = action.name(), "Proposal executed");
        outbox.emit(TemplEvent::ProposalExecuted {
            proposal_id: id,
            action: action.name().to_string(),
        });
        Ok(action)
    }

    /// Drop executed and expired ids from positions `start..end` of the
    /// active index. Proposal data is kept.
    pub fn prune_inactive(
        &mut self,
        start: usize,
        end: usize,
        governance: &GovernanceParams,
        outbox: &mut Outbox,
    ) -> TemplResult<usize> {
        let now = outbox.now();
        let end = end.min(self.active_index.len());
        if start > end {
            return Err(TemplError::InvalidRange { start, end });
        }

        let before = self.active_index.len();
        let proposals = &self.proposals;
        let mut position = 0;
        self.active_index.retain(|id| {
            let in_range = (start..end).contains(&position);
            position += 1;
            !in_range
                || proposals
                    .get(id)
                    .is_some_and(|p| !p.status(now, governance).is_terminal())
        });
        let removed = before - self.active_index.len();

        if removed > 0 {
            info!(removed, remaining = self.active_index.len(), "Inactive proposals pruned");
            outbox.emit(TemplEvent::ProposalsPruned { removed });
        }
        Ok(removed)
    }

    // --- Council ---

    pub fn set_council_mode(&mut self, enabled: bool, outbox: &mut Outbox) -> TemplResult<()> {
        if enabled && self.council.is_empty() {
            return Err(TemplError::CouncilUpdate(
                "cannot enable council mode with an empty council".into(),
            ));
        }
        self.council_mode = enabled;
        info!(enabled, "Council mode updated");
        outbox.emit(TemplEvent::ConfigUpdated {
            setting: "council_mode".into(),
        });
        Ok(())
    }

    /// `member` must already be a templ member; the caller checks that
    pub fn add_council_member(&mut self, member: Address, outbox: &mut Outbox) -> TemplResult<()> {
        if !self.council.insert(member.clone()) {
            return Err(TemplError::CouncilUpdate(format!(
                "{} is already on the council",
                member
            )));
        }
        info!(member = %member, council_size = self.council.len(), "Council member added");
        outbox.emit(TemplEvent::ConfigUpdated {
            setting: "council".into(),
        });
        Ok(())
    }

    pub fn remove_council_member(
        &mut self,
        member: &Address,
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        if !self.council.contains(member) {
            return Err(TemplError::CouncilUpdate(format!(
                "{} is not on the council",
                member
            )));
        }
        if self.council_mode && self.council.len() == 1 {
            return Err(TemplError::CouncilUpdate(
                "cannot remove the last council member while council mode is on".into(),
            ));
        }
        self.council.remove(member);
        info!(member = %member, council_size = self.council.len(), "Council member removed");
        outbox.emit(TemplEvent::ConfigUpdated {
            setting: "council".into(),
        });
        Ok(())
    }

    // --- Query methods ---

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn status(
        &self,
        id: ProposalId,
        now: DateTime<Utc>,
        governance: &GovernanceParams,
    ) -> TemplResult<ProposalStatus> {
        self.proposals
            .get(&id)
            .map(|p| p.status(now, governance))
            .ok_or(TemplError::ProposalNotFound(id))
    }

    pub fn vote_of(&self, id: ProposalId, voter: &Address) -> Option<&VoteRecord> {
        self.proposals.get(&id).and_then(|p| p.vote_of(voter))
    }

    pub fn active_ids(&self) -> &[ProposalId] {
        &self.active_index
    }

    pub fn proposal_count(&self) -> u64 {
        self.last_id
    }

    /// The proposer's undecided proposal, if any. A lock whose deadline
    /// has passed no longer counts.
    pub fn open_proposal_of(&self, proposer: &Address, now: DateTime<Utc>) -> Option<ProposalId> {
        let id = self.open_by_proposer.get(proposer)?;
        self.proposals
            .get(id)
            .filter(|p| p.voting_open(now))
            .map(|p| p.id)
    }

    pub fn council_mode(&self) -> bool {
        self.council_mode
    }

    pub fn is_council_member(&self, address: &Address) -> bool {
        self.council.contains(address)
    }

    pub fn council_members(&self) -> impl Iterator<Item = &Address> {
        self.council.iter()
    }
}
