//! Host collaborators: the engine's only window onto the outside world
//!
//! Value movement, event delivery, time and arbitrary external calls are all
//! delegated to the host. The engine never calls a collaborator while it
//! holds a borrow of its own state, and every call that may re-enter runs
//! under the reentrancy guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use templ_types::{Address, Amount, AssetId, EventEnvelope};

/// A single value movement requested by the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: AssetId,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

impl Transfer {
    pub fn new(asset: AssetId, from: Address, to: Address, amount: Amount) -> Self {
        Self {
            asset,
            from,
            to,
            amount,
        }
    }
}

/// Moves assets between parties.
///
/// A batch settles entirely or not at all. Amounts are exact: assets whose
/// transferred amount differs from the requested amount are not supported.
pub trait AssetTransfer {
    fn settle(&self, batch: &[Transfer]) -> Result<(), String>;
}

/// Receives committed events, in sequence order, exactly once
pub trait EventSink {
    fn emit(&self, envelope: &EventEnvelope);
}

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Dispatches arbitrary calls approved by governance
pub trait ExternalCaller {
    /// Call `target` with `value` of the native asset attached.
    /// Returns the raw response on success.
    fn call(&self, target: &Address, value: Amount, payload: &[u8]) -> Result<Vec<u8>, String>;
}

/// Wall clock backed by `Utc::now()`
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The set of collaborators a templ instance runs against
#[derive(Clone)]
pub struct TemplHost {
    pub transfers: Arc<dyn AssetTransfer>,
    pub events: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
    pub calls: Arc<dyn ExternalCaller>,
}

impl TemplHost {
    pub fn new(
        transfers: Arc<dyn AssetTransfer>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        calls: Arc<dyn ExternalCaller>,
    ) -> Self {
        Self {
            transfers,
            events,
            clock,
            calls,
        }
    }
}

impl std::fmt::Debug for TemplHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplHost").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_tracks_wall_time() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
        assert!(now <= Utc::now());
    }
}
