//! Action Executor: one handler per [`ProposalAction`] variant
//!
//! Reached from an executed proposal or, in dictatorship mode, from the
//! admin. Either way every fund-moving handler asks the treasury guard
//! first.

use crate::outbox::{ExternalCallRequest, Outbox};
use crate::state::TemplState;
use templ_types::{
    Address, Amount, AssetId, ProposalAction, StreamKey, TemplError, TemplEvent, TemplResult,
};
use tracing::info;

pub(crate) struct ActionExecutor;

impl ActionExecutor {
    pub fn dispatch(
        state: &mut TemplState,
        action: &ProposalAction,
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        action.validate()?;

        match action {
            ProposalAction::SetJoinPaused { paused } => {
                state.config.join_paused = *paused;
                Self::config_updated("join_paused", outbox);
            }
            ProposalAction::UpdateFeeSplit { split } => {
                state.config.fee_split = *split;
                Self::config_updated("fee_split", outbox);
            }
            ProposalAction::UpdateEntryFeeCurve { curve } => {
                state.config.entry_fee = *curve;
                Self::config_updated("entry_fee", outbox);
            }
            ProposalAction::SetMaxMembers { max_members } => {
                let count = state.membership.count();
                if *max_members != 0 && *max_members < count {
                    return Err(TemplError::InvalidConfig(format!(
                        "member cap {} below current member count {}",
                        max_members, count
                    )));
                }
                state.config.max_members = *max_members;
                Self::config_updated("max_members", outbox);
            }
            ProposalAction::UpdateMetadata { metadata } => {
                state.config.metadata = metadata.clone();
                Self::config_updated("metadata", outbox);
            }
            ProposalAction::SetProposalFee { proposal_fee_bps } => {
                state.config.proposal_fee_bps = *proposal_fee_bps;
                Self::config_updated("proposal_fee_bps", outbox);
            }
            ProposalAction::SetReferralShare { referral_share_bps } => {
                state.config.referral_share_bps = *referral_share_bps;
                Self::config_updated("referral_share_bps", outbox);
            }
            ProposalAction::UpdateGovernanceParams { params } => {
                state.config.governance = *params;
                Self::config_updated("governance", outbox);
            }
            ProposalAction::ChangeAdmin { new_admin } => {
                Self::change_admin(state, new_admin, outbox);
            }
            ProposalAction::SetDictatorship { enabled } => {
                state.config.dictatorship = *enabled;
                info!(enabled, "Dictatorship updated");
                Self::config_updated("dictatorship", outbox);
            }
            ProposalAction::SetCouncilMode { enabled } => {
                state.governance.set_council_mode(*enabled, outbox)?;
            }
            ProposalAction::AddCouncilMember { member } => {
                if !state.membership.is_member(member) {
                    return Err(TemplError::NotMember(member.clone()));
                }
                state.governance.add_council_member(member.clone(), outbox)?;
            }
            ProposalAction::RemoveCouncilMember { member } => {
                state.governance.remove_council_member(member, outbox)?;
            }
            ProposalAction::CallExternal {
                target,
                value,
                payload,
            } => {
                Self::call_external(state, target, *value, payload, outbox)?;
            }
            ProposalAction::WithdrawTreasury {
                asset,
                recipient,
                amount,
                reason,
            } => {
                Self::withdraw(state, asset, recipient, *amount, reason, outbox)?;
            }
            ProposalAction::DisbandTreasury { asset } => {
                Self::disband(state, asset, outbox)?;
            }
            ProposalAction::DeregisterRewardStream { asset } => {
                state.rewards.deregister(asset, outbox)?;
            }
        }
        Ok(())
    }

    fn config_updated(setting: &str, outbox: &mut Outbox) {
        info!(setting, "Config updated");
        outbox.emit(TemplEvent::ConfigUpdated {
            setting: setting.to_string(),
        });
    }

    fn change_admin(state: &mut TemplState, new_admin: &Address, outbox: &mut Outbox) {
        let previous = std::mem::replace(&mut state.admin, new_admin.clone());
        info!(previous = %previous, new_admin = %new_admin, "Admin changed");
        outbox.emit(TemplEvent::AdminChanged {
            previous,
            new_admin: new_admin.clone(),
        });
    }

    /// Value attached to the call comes out of native-asset treasury
    fn call_external(
        state: &mut TemplState,
        target: &Address,
        value: Amount,
        payload: &[u8],
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        if value > 0 {
            let native = AssetId::native();
            state.guard().ensure_available(&native, value)?;
            state.treasury.debit(&native, value)?;
        }
        outbox.request_call(ExternalCallRequest {
            target: target.clone(),
            value,
            payload: payload.to_vec(),
        })
    }

    fn withdraw(
        state: &mut TemplState,
        asset: &AssetId,
        recipient: &Address,
        amount: Amount,
        reason: &str,
        outbox: &mut Outbox,
    ) -> TemplResult<()> {
        state.guard().ensure_available(asset, amount)?;
        state.treasury.debit(asset, amount)?;
        outbox.transfer(asset, &state.config.templ_address, recipient, amount);

        info!(asset = %asset, recipient = %recipient, amount, reason, "Treasury withdrawal");
        outbox.emit(TemplEvent::TreasuryWithdrawn {
            asset: asset.clone(),
            recipient: recipient.clone(),
            amount,
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Move every available unit of `asset` into its reward stream
    fn disband(state: &mut TemplState, asset: &AssetId, outbox: &mut Outbox) -> TemplResult<()> {
        let amount = state.guard().available(asset);
        if amount == 0 {
            return Err(TemplError::InsufficientTreasury {
                asset: asset.clone(),
                requested: 0,
                available: 0,
            });
        }
        let members = state.membership.count();

        let (stream, per_member) = if *asset == state.config.access_asset {
            let per_member = state
                .rewards
                .distribute_member_pool(amount, members, outbox)?;
            (StreamKey::MemberPool, per_member)
        } else {
            state
                .rewards
                .ensure_external_stream(asset, members, outbox)?;
            let per_member = state
                .rewards
                .distribute_external(asset, amount, members, outbox)?;
            (StreamKey::External(asset.clone()), per_member)
        };

        info!(asset = %asset, amount, stream = %stream, per_member, "Treasury disbanded");
        outbox.emit(TemplEvent::TreasuryDisbanded {
            asset: asset.clone(),
            amount,
            stream,
            per_member,
        });
        Ok(())
    }
}
