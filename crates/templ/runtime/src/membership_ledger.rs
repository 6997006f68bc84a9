//! Membership Ledger: admission, sequence numbers, caps and pauses
//!
//! Admission checks run before any fee is computed so a rejected join never
//! touches the fee path.

use crate::fee_distributor::FeeBreakdown;
use crate::outbox::Outbox;
use templ_types::{
    Address, Amount, MemberRecord, MemberRoster, TemplConfig, TemplError, TemplEvent,
    TemplResult,
};
use tracing::{debug, info};

/// Who pays for a join and who referred it
#[derive(Clone, Debug)]
pub struct Admission<'a> {
    pub recipient: &'a Address,
    pub payer: &'a Address,
    /// Already validated by [`MembershipLedger::resolve_referrer`]
    pub referrer: Option<Address>,
}

#[derive(Clone, Debug, Default)]
pub struct MembershipLedger {
    roster: MemberRoster,
}

impl MembershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll the initial admin as member #1, free of charge
    pub fn enroll_admin(
        &mut self,
        admin: &Address,
        pool_baseline: Amount,
        outbox: &mut Outbox,
    ) -> TemplResult<u64> {
        let sequence = self
            .roster
            .admit(admin.clone(), outbox.now(), pool_baseline)?
            .sequence;
        info!(admin = %admin, sequence, "Admin enrolled");
        Ok(sequence)
    }

    /// Sequence number `recipient` would receive, or why they cannot join
    pub fn check_admission(&self, recipient: &Address, config: &TemplConfig) -> TemplResult<u64> {
        if recipient.is_zero() {
            return Err(TemplError::ZeroIdentity("recipient"));
        }
        if self.roster.is_member(recipient) {
            return Err(TemplError::AlreadyMember(recipient.clone()));
        }
        if config.join_paused {
            return Err(TemplError::JoiningPaused);
        }
        if config.max_members != 0 && self.roster.count() >= config.max_members {
            return Err(TemplError::MemberLimitReached {
                max: config.max_members,
            });
        }
        Ok(self.roster.next_sequence())
    }

    /// A referral counts only if it names an existing member other than the
    /// recipient; anything else is ignored
    pub fn resolve_referrer(
        &self,
        referral: Option<&Address>,
        recipient: &Address,
    ) -> Option<Address> {
        let referral = referral?;
        if referral == recipient || !self.roster.is_member(referral) {
            debug!(referral = %referral, "Referral ignored");
            return None;
        }
        Some(referral.clone())
    }

    /// Record the new member. The fee has already been split and routed.
    pub fn admit(
        &mut self,
        admission: Admission<'_>,
        breakdown: &FeeBreakdown,
        pool_baseline: Amount,
        outbox: &mut Outbox,
    ) -> TemplResult<u64> {
        let sequence = self
            .roster
            .admit(admission.recipient.clone(), outbox.now(), pool_baseline)?
            .sequence;

        info!(
            member = %admission.recipient,
            payer = %admission.payer,
            sequence,
            fee = breakdown.fee,
            "Member joined"
        );
        outbox.emit(TemplEvent::MemberJoined {
            member: admission.recipient.clone(),
            payer: admission.payer.clone(),
            sequence,
            fee: breakdown.fee,
            burned: breakdown.burn,
            to_treasury: breakdown.treasury,
            to_member_pool: breakdown.member_pool,
            to_protocol: breakdown.protocol,
            referrer: admission.referrer,
            referral_paid: breakdown.referral,
        });
        Ok(sequence)
    }

    pub fn member_mut(&mut self, address: &Address) -> TemplResult<&mut MemberRecord> {
        self.roster
            .get_mut(address)
            .ok_or_else(|| TemplError::NotMember(address.clone()))
    }

    // --- Query methods ---

    pub fn member(&self, address: &Address) -> Option<&MemberRecord> {
        self.roster.get(address)
    }

    /// Look up an active member or fail with an authorization error
    pub fn require_member(&self, address: &Address) -> TemplResult<&MemberRecord> {
        let member = self.roster.require(address)?;
        if !member.active {
            return Err(TemplError::NotMember(address.clone()));
        }
        Ok(member)
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.roster.is_member(address)
    }

    pub fn count(&self) -> u64 {
        self.roster.count()
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberRecord> {
        self.roster.iter()
    }
}
