//! Per-operation outbox
//!
//! Managers never talk to collaborators directly. They mutate the working
//! copy of templ state and queue what must happen outside: events, asset
//! transfers and at most one external call. The templ runs the queued
//! interactions after all state changes and publishes events only if the
//! whole operation succeeds.

use crate::host::Transfer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use templ_types::{Address, Amount, AssetId, TemplError, TemplEvent, TemplResult};

/// A governance-approved call waiting to be dispatched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCallRequest {
    pub target: Address,
    pub value: Amount,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
pub struct Outbox {
    now: DateTime<Utc>,
    events: Vec<TemplEvent>,
    transfers: Vec<Transfer>,
    call: Option<ExternalCallRequest>,
}

impl Outbox {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            events: Vec::new(),
            transfers: Vec::new(),
            call: None,
        }
    }

    /// The instant this operation observes
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn emit(&mut self, event: TemplEvent) {
        self.events.push(event);
    }

    /// Queue a transfer. Zero amounts are dropped.
    pub fn transfer(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: Amount) {
        if amount == 0 {
            return;
        }
        self.transfers
            .push(Transfer::new(asset.clone(), from.clone(), to.clone(), amount));
    }

    pub fn request_call(&mut self, request: ExternalCallRequest) -> TemplResult<()> {
        if self.call.is_some() {
            return Err(TemplError::InvalidProposal(
                "only one external call per operation".into(),
            ));
        }
        self.call = Some(request);
        Ok(())
    }

    pub fn events(&self) -> &[TemplEvent] {
        &self.events
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn pending_call(&self) -> Option<&ExternalCallRequest> {
        self.call.as_ref()
    }

    pub(crate) fn take_call(&mut self) -> Option<ExternalCallRequest> {
        self.call.take()
    }

    pub(crate) fn into_events(self) -> Vec<TemplEvent> {
        self.events
    }
}
