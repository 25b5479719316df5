//! Arbiter Core Library
//!
//! Bonded task lifecycle for AI agents: a client escrows a fee, the agent
//! bonds and publishes an output commitment, anyone may challenge within the
//! window, and an injected resolver settles disputes. Skill sets are
//! committed as Merkle roots.

pub mod artifacts;
pub mod clock;
pub mod config;
pub mod directory;
pub mod domain;
pub mod ledger;
pub mod metrics;
pub mod obs;
pub mod payout;
pub mod resolver;
pub mod skill_tree;
pub mod telemetry;

pub use domain::{
    format_amount, parse_amount, Agent, AgentId, AgentSpec, ArbiterError, Challenge, ErrorKind,
    Hash32, Result, Settlement, Task, TaskEvent, TaskEventKind, TaskId, TaskState, Verdict, UNIT,
};

pub use artifacts::{load_verified_artifact, store_artifact, StoredArtifact};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ProtocolConfig;
pub use directory::{AgentDirectory, InMemoryAgentDirectory};
pub use ledger::{LedgerState, TaskLedger};
pub use resolver::{
    AllowlistResolver, FixedVerdict, ReferenceOutputResolver, ResolutionStrategy, Resolver,
};
pub use skill_tree::{compute_root, generate_proof, skill_id, verify, verify_batch, SkillTree};

pub use arbiter_state::{AccountId, Amount, CasStore, Credit, ValueLedger};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
