//! Lifecycle events recorded by the task ledger.
//!
//! Events are an audit trail for off-chain observers; the state machine
//! never reads them back.

use arbiter_state::{AccountId, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent_spec::AgentId;
use super::commitment::Hash32;
use super::task::{TaskId, Verdict};

/// Transition-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    Submitted {
        agent_id: AgentId,
        client: AccountId,
        fee: Amount,
        input_commitment: Hash32,
    },
    Bonded {
        agent_owner: AccountId,
        bond: Amount,
    },
    Executed {
        output_commitment: Hash32,
        challenge_deadline: DateTime<Utc>,
    },
    Challenged {
        challenger: AccountId,
        claimed_output: Hash32,
        bond: Amount,
    },
    Resolved {
        verdict: Verdict,
        winner: AccountId,
        payout: Amount,
        protocol_fee: Amount,
        client_refund: Amount,
    },
    Claimed {
        agent_owner: AccountId,
        payout: Amount,
    },
    Expired {
        client: AccountId,
        refund: Amount,
    },
}

impl TaskEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskEventKind::Submitted { .. } => "submitted",
            TaskEventKind::Bonded { .. } => "bonded",
            TaskEventKind::Executed { .. } => "executed",
            TaskEventKind::Challenged { .. } => "challenged",
            TaskEventKind::Resolved { .. } => "resolved",
            TaskEventKind::Claimed { .. } => "claimed",
            TaskEventKind::Expired { .. } => "expired",
        }
    }
}

/// One entry in the ledger's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskEvent {
    /// Monotonic across the whole ledger, starting at 1.
    pub seq: u64,
    pub task_id: TaskId,
    pub at: DateTime<Utc>,
    pub kind: TaskEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_externally_tagged_kind() {
        let event = TaskEvent {
            seq: 1,
            task_id: TaskId(9),
            at: Utc::now(),
            kind: TaskEventKind::Bonded {
                agent_owner: AccountId::from("agent"),
                bond: 10,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["task_id"], 9);
        assert_eq!(value["kind"]["bonded"]["agent_owner"], "agent");

        let back: TaskEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
