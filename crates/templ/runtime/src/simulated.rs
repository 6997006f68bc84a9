//! In-memory collaborators for tests, demos and local development.
//!
//! - [`SimulatedLedger`]: balances per (holder, asset) with failure injection
//! - [`ManualClock`]: time that only moves when told to
//! - [`RecordingSink`]: keeps every delivered event
//! - [`ScriptedCaller`]: replays queued responses to external calls
//! - [`ReentrantTransfer`]: a transfer collaborator that calls back into the
//!   templ while a settlement is in flight

use crate::host::{AssetTransfer, Clock, EventSink, ExternalCaller, TemplHost, Transfer};
use crate::templ::Templ;
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use templ_types::{Address, Amount, AssetId, EventEnvelope, TemplError, TemplResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Balances held by every party, settled batch by batch
#[derive(Default)]
pub struct SimulatedLedger {
    balances: Mutex<BTreeMap<(Address, AssetId), Amount>>,
    history: Mutex<Vec<Transfer>>,
    fail_next: Mutex<Option<String>>,
    blocked: Mutex<Vec<Address>>,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `holder` out of thin air
    pub fn fund(&self, holder: &Address, asset: &AssetId, amount: Amount) {
        let mut balances = lock(&self.balances);
        let entry = balances
            .entry((holder.clone(), asset.clone()))
            .or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn balance(&self, holder: &Address, asset: &AssetId) -> Amount {
        lock(&self.balances)
            .get(&(holder.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Reject the next settlement with `reason`
    pub fn fail_next_settlement(&self, reason: impl Into<String>) {
        *lock(&self.fail_next) = Some(reason.into());
    }

    /// Reject every settlement that pays `recipient`
    pub fn block_recipient(&self, recipient: Address) {
        lock(&self.blocked).push(recipient);
    }

    pub fn unblock_all(&self) {
        lock(&self.blocked).clear();
    }

    /// Every transfer settled so far
    pub fn history(&self) -> Vec<Transfer> {
        lock(&self.history).clone()
    }
}

impl AssetTransfer for SimulatedLedger {
    fn settle(&self, batch: &[Transfer]) -> Result<(), String> {
        if let Some(reason) = lock(&self.fail_next).take() {
            return Err(reason);
        }
        {
            let blocked = lock(&self.blocked);
            if let Some(t) = batch.iter().find(|t| blocked.contains(&t.to)) {
                return Err(format!("recipient {} rejects transfers", t.to));
            }
        }

        let mut balances = lock(&self.balances);
        let mut scratch = balances.clone();
        for transfer in batch {
            let from_key = (transfer.from.clone(), transfer.asset.clone());
            let held = scratch.get(&from_key).copied().unwrap_or(0);
            if held < transfer.amount {
                return Err(format!(
                    "{} holds {} {}, needs {}",
                    transfer.from, held, transfer.asset, transfer.amount
                ));
            }
            scratch.insert(from_key, held - transfer.amount);
            let to = scratch
                .entry((transfer.to.clone(), transfer.asset.clone()))
                .or_insert(0);
            *to = to.saturating_add(transfer.amount);
        }
        *balances = scratch;
        lock(&self.history).extend(batch.iter().cloned());
        Ok(())
    }
}

/// A clock that is moved by hand
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }

    /// Jump to an arbitrary instant, including backwards
    pub fn set(&self, at: DateTime<Utc>) {
        *lock(&self.now) = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Keeps every event it receives
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EventEnvelope>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        lock(&self.events).clone()
    }

    /// Event names in delivery order
    pub fn names(&self) -> Vec<&'static str> {
        lock(&self.events).iter().map(|e| e.event.name()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, envelope: &EventEnvelope) {
        lock(&self.events).push(envelope.clone());
    }
}

/// A recorded external call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub target: Address,
    pub value: Amount,
    pub payload: Vec<u8>,
}

/// Answers external calls from a queue; an empty queue answers `Ok(vec![])`
#[derive(Default)]
pub struct ScriptedCaller {
    responses: Mutex<VecDeque<Result<Vec<u8>, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, response: Result<Vec<u8>, String>) {
        lock(&self.responses).push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }
}

impl ExternalCaller for ScriptedCaller {
    fn call(&self, target: &Address, value: Amount, payload: &[u8]) -> Result<Vec<u8>, String> {
        lock(&self.calls).push(RecordedCall {
            target: target.clone(),
            value,
            payload: payload.to_vec(),
        });
        lock(&self.responses).pop_front().unwrap_or(Ok(Vec::new()))
    }
}

type Reentry = Box<dyn Fn(&Templ) -> TemplResult<()>>;

/// Transfer collaborator that runs `reentry` against the templ before
/// settling, recording what the templ answered
pub struct ReentrantTransfer {
    inner: Arc<SimulatedLedger>,
    target: RefCell<Weak<Templ>>,
    reentry: Reentry,
    answers: RefCell<Vec<TemplResult<()>>>,
}

impl ReentrantTransfer {
    pub fn new(
        inner: Arc<SimulatedLedger>,
        reentry: impl Fn(&Templ) -> TemplResult<()> + 'static,
    ) -> Self {
        Self {
            inner,
            target: RefCell::new(Weak::new()),
            reentry: Box::new(reentry),
            answers: RefCell::new(Vec::new()),
        }
    }

    /// Point the callback at a live templ
    pub fn arm(&self, templ: &Rc<Templ>) {
        *self.target.borrow_mut() = Rc::downgrade(templ);
    }

    /// Results of every reentrant attempt so far
    pub fn answers(&self) -> Vec<TemplResult<()>> {
        self.answers.borrow().clone()
    }
}

impl AssetTransfer for ReentrantTransfer {
    fn settle(&self, batch: &[Transfer]) -> Result<(), String> {
        let target = self.target.borrow().upgrade();
        if let Some(templ) = target {
            let answer = (self.reentry)(&templ);
            if let Err(TemplError::ReentrantCall) = &answer {
                tracing::debug!("Reentrant call was rejected");
            }
            self.answers.borrow_mut().push(answer);
        }
        self.inner.settle(batch)
    }
}

/// A full set of simulated collaborators sharing one ledger
#[derive(Clone)]
pub struct SimulatedHost {
    pub ledger: Arc<SimulatedLedger>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<ManualClock>,
    pub caller: Arc<ScriptedCaller>,
}

impl SimulatedHost {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            ledger: Arc::new(SimulatedLedger::new()),
            sink: Arc::new(RecordingSink::new()),
            clock: Arc::new(ManualClock::new(start)),
            caller: Arc::new(ScriptedCaller::new()),
        }
    }

    pub fn host(&self) -> TemplHost {
        TemplHost::new(
            self.ledger.clone(),
            self.sink.clone(),
            self.clock.clone(),
            self.caller.clone(),
        )
    }

    /// Same collaborators, but settlements go through `transfers`
    pub fn host_with_transfers(&self, transfers: Arc<dyn AssetTransfer>) -> TemplHost {
        let mut host = self.host();
        host.transfers = transfers;
        host
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(asset: &str, from: &str, to: &str, amount: Amount) -> Transfer {
        Transfer::new(
            AssetId::new(asset),
            Address::new(from),
            Address::new(to),
            amount,
        )
    }

    #[test]
    fn test_ledger_settles_batch_in_order() {
        let ledger = SimulatedLedger::new();
        let usdc = AssetId::new("USDC");
        ledger.fund(&Address::new("alice"), &usdc, 100);

        // templ receives before it pays out
        ledger
            .settle(&[t("USDC", "alice", "templ", 100), t("USDC", "templ", "burn", 30)])
            .unwrap();
        assert_eq!(ledger.balance(&Address::new("alice"), &usdc), 0);
        assert_eq!(ledger.balance(&Address::new("templ"), &usdc), 70);
        assert_eq!(ledger.balance(&Address::new("burn"), &usdc), 30);
        assert_eq!(ledger.history().len(), 2);
    }

    #[test]
    fn test_ledger_batch_is_all_or_nothing() {
        let ledger = SimulatedLedger::new();
        let usdc = AssetId::new("USDC");
        ledger.fund(&Address::new("alice"), &usdc, 50);

        let err = ledger
            .settle(&[t("USDC", "alice", "bob", 50), t("USDC", "alice", "carol", 1)])
            .unwrap_err();
        assert!(err.contains("alice"));
        assert_eq!(ledger.balance(&Address::new("alice"), &usdc), 50);
        assert_eq!(ledger.balance(&Address::new("bob"), &usdc), 0);
    }

    #[test]
    fn test_failure_injection() {
        let ledger = SimulatedLedger::new();
        ledger.fund(&Address::new("alice"), &AssetId::new("USDC"), 10);
        ledger.fail_next_settlement("offline");
        assert_eq!(
            ledger.settle(&[t("USDC", "alice", "bob", 1)]),
            Err("offline".to_string())
        );
        assert!(ledger.settle(&[t("USDC", "alice", "bob", 1)]).is_ok());

        ledger.block_recipient(Address::new("bob"));
        assert!(ledger.settle(&[t("USDC", "alice", "bob", 1)]).is_err());
        ledger.unblock_all();
        assert!(ledger.settle(&[t("USDC", "alice", "bob", 1)]).is_ok());
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_scripted_caller() {
        let caller = ScriptedCaller::new();
        caller.respond_with(Err("reverted".into()));
        let target = Address::new("target");
        assert!(caller.call(&target, 5, b"ping").is_err());
        assert_eq!(caller.call(&target, 0, b"").unwrap(), Vec::<u8>::new());
        assert_eq!(caller.calls().len(), 2);
        assert_eq!(caller.calls()[0].value, 5);
    }
}
