//! Shared fixtures: one registered agent, three funded accounts and a
//! manual clock.

#![allow(dead_code)]

use std::sync::Arc;

use arbiter_core::{
    AccountId, AgentId, AgentSpec, Amount, Hash32, InMemoryAgentDirectory, ManualClock,
    ProtocolConfig, TaskId, TaskLedger, ValueLedger, UNIT,
};
use arbiter_state::MemoryValueLedger;
use chrono::Duration;

pub type Ledger = TaskLedger<MemoryValueLedger, InMemoryAgentDirectory, Arc<ManualClock>>;

pub const CLIENT: &str = "client";
pub const AGENT_OWNER: &str = "agent-owner";
pub const CHALLENGER: &str = "challenger";
pub const STARTING_BALANCE: Amount = 10 * UNIT;

pub fn acct(name: &str) -> AccountId {
    AccountId::from(name)
}

pub fn spec(model: &str) -> AgentSpec {
    AgentSpec::new(
        Hash32::digest(model.as_bytes()),
        Hash32::digest(b"inference-config"),
        Hash32::digest(b"skills-root"),
        4096,
        0,
        100,
        1,
    )
    .expect("valid spec")
}

pub struct World {
    pub ledger: Ledger,
    pub clock: Arc<ManualClock>,
    pub agent_id: AgentId,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let clock = Arc::new(ManualClock::at_epoch());

        let mut value = MemoryValueLedger::new();
        for name in [CLIENT, AGENT_OWNER, CHALLENGER] {
            value.deposit(&acct(name), STARTING_BALANCE).unwrap();
        }

        let mut directory = InMemoryAgentDirectory::new();
        let agent_id = directory
            .register_agent(&acct(AGENT_OWNER), spec("llama-3-8b"), "ipfs://meta", clock_now(&clock))
            .unwrap();

        let ledger = TaskLedger::new(config, value, directory, Arc::clone(&clock)).unwrap();
        Self {
            ledger,
            clock,
            agent_id,
        }
    }

    pub fn balance(&self, name: &str) -> Amount {
        self.ledger.value().balance_of(&acct(name))
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn submit(&mut self, fee: Amount) -> TaskId {
        self.ledger
            .submit(
                &acct(CLIENT),
                self.agent_id,
                Hash32::digest(b"task-input"),
                "cas://input",
                fee,
            )
            .unwrap()
    }

    /// Submitted with 1 unit fee and bonded with 1 unit.
    pub fn committed_task(&mut self) -> TaskId {
        let task_id = self.submit(UNIT);
        self.ledger
            .bond(&acct(AGENT_OWNER), task_id, UNIT)
            .unwrap();
        task_id
    }

    /// Committed and published with the honest output.
    pub fn executed_task(&mut self) -> TaskId {
        let task_id = self.committed_task();
        self.ledger
            .publish(&acct(AGENT_OWNER), task_id, honest_output(), "cas://output")
            .unwrap();
        task_id
    }

    /// Executed and challenged with a 1.5 unit bond.
    pub fn challenged_task(&mut self) -> TaskId {
        let task_id = self.executed_task();
        self.ledger
            .challenge(
                &acct(CHALLENGER),
                task_id,
                disputed_output(),
                "cas://evidence",
                UNIT + UNIT / 2,
            )
            .unwrap();
        task_id
    }
}

fn clock_now(clock: &ManualClock) -> chrono::DateTime<chrono::Utc> {
    use arbiter_core::Clock;
    clock.now()
}

pub fn honest_output() -> Hash32 {
    Hash32::digest(b"honest-output")
}

pub fn disputed_output() -> Hash32 {
    Hash32::digest(b"disputed-output")
}
