#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use templ_runtime::{NewProposal, SimulatedHost, Templ};
use templ_types::{
    Address, Amount, AssetId, BootstrapConfig, EntryFeeCurve, FeeSplit, ProposalAction,
    ProposalId, TemplConfig, TemplId, TemplMetadata,
};

pub const ACCESS: &str = "ACCESS";
pub const STARTING_BALANCE: Amount = 1_000_000;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn base_config() -> TemplConfig {
    TemplConfig {
        metadata: TemplMetadata::new("Test Templ", "integration fixture"),
        entry_fee: EntryFeeCurve::fixed(100),
        fee_split: FeeSplit::new(3_000, 3_000, 3_000, 1_000),
        ..TemplConfig::default()
    }
}

pub fn priest() -> Address {
    Address::new("priest")
}

pub fn access() -> AssetId {
    AssetId::new(ACCESS)
}

pub struct Harness {
    pub sim: SimulatedHost,
    pub templ: Templ,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(base_config())
    }

    pub fn with_config(config: TemplConfig) -> Self {
        let sim = SimulatedHost::new(start_time());
        let bootstrap =
            BootstrapConfig::new(priest(), config).with_id(TemplId::new("templ-under-test"));
        let templ = Templ::bootstrap(bootstrap, sim.host()).unwrap();
        Self { sim, templ }
    }

    /// Fund `name` with the access asset and have them join themselves
    pub fn join(&self, name: &str) -> Address {
        let who = Address::new(name);
        self.sim.ledger.fund(&who, &access(), STARTING_BALANCE);
        self.templ.join(&who, &who, None).unwrap();
        who
    }

    pub fn balance(&self, who: &Address, asset: &AssetId) -> Amount {
        self.sim.ledger.balance(who, asset)
    }

    pub fn templ_account(&self) -> Address {
        self.templ.config().templ_address
    }

    pub fn advance(&self, by: Duration) {
        self.sim.clock.advance(by);
    }

    pub fn execution_delay(&self) -> Duration {
        self.templ.config().governance.execution_delay
    }

    /// Create a proposal, collect YES votes and wait out the execution delay.
    /// Does not execute.
    pub fn approve(
        &self,
        proposer: &Address,
        voters: &[&Address],
        action: ProposalAction,
    ) -> ProposalId {
        let id = self
            .templ
            .create_proposal(proposer, NewProposal::new(action, "Test proposal"))
            .unwrap();
        for voter in voters {
            self.templ.vote(id, voter, true).unwrap();
        }
        self.advance(self.execution_delay());
        id
    }

    /// [`Harness::approve`] followed by a successful execution
    pub fn enact(&self, proposer: &Address, voters: &[&Address], action: ProposalAction) {
        let id = self.approve(proposer, voters, action);
        self.templ.execute_proposal(id).unwrap();
    }
}
