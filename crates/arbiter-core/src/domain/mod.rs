//! Domain models for Arbiter.
//!
//! Canonical definitions for the core entities:
//! - `AgentSpec` / `Agent`: deterministic execution commitment and its registry record
//! - `Task` / `Challenge`: bonded unit of work and its dispute
//! - `TaskEvent`: lifecycle audit trail
//! - `Hash32`: fixed-width commitment with a reserved zero value

pub mod agent_spec;
pub mod amount;
pub mod commitment;
pub mod error;
pub mod event;
pub mod task;

// Re-export main types and errors
pub use agent_spec::{Agent, AgentId, AgentSpec};
pub use amount::{format_amount, parse_amount, UNIT};
pub use commitment::Hash32;
pub use error::{ArbiterError, ErrorKind, Result};
pub use event::{TaskEvent, TaskEventKind};
pub use task::{Challenge, Settlement, Task, TaskId, TaskState, Verdict};
