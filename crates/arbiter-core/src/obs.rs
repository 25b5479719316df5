//! Structured observability hooks for task and agent lifecycle events.
//!
//! This module provides:
//! - Task-scoped tracing spans via the `TaskSpan` RAII guard
//! - One emission function per ledger transition and registry change
//!
//! Events are emitted at `info!` level; rejected transitions at `warn!`.
//! Filtering is controlled by `ARBITER_LOG` (see [`crate::telemetry`]).
//! Amounts are logged as decimal strings because `tracing` fields are at
//! most 64 bits wide.

use arbiter_state::{AccountId, Amount};
use tracing::{info, warn};

use crate::domain::{AgentId, ArbiterError, Hash32, TaskId, TaskState, Verdict};

/// RAII guard that enters a task-scoped span for the duration of a transition.
///
/// ```ignore
/// let _span = TaskSpan::enter(task_id, "challenge");
/// // every event below carries task_id and op
/// ```
pub struct TaskSpan {
    _span: tracing::span::EnteredSpan,
}

impl TaskSpan {
    pub fn enter(task_id: TaskId, op: &'static str) -> Self {
        let span = tracing::info_span!("arbiter.task", task_id = task_id.0, op = op);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_task_submitted(task_id: TaskId, agent_id: AgentId, client: &AccountId, fee: Amount) {
    info!(
        event = "task.submitted",
        task_id = task_id.0,
        agent_id = agent_id.0,
        client = %client,
        fee = %fee,
    );
}

pub fn emit_task_bonded(task_id: TaskId, agent_owner: &AccountId, bond: Amount) {
    info!(
        event = "task.bonded",
        task_id = task_id.0,
        agent_owner = %agent_owner,
        bond = %bond,
    );
}

pub fn emit_task_executed(task_id: TaskId, output_commitment: &Hash32, window_secs: i64) {
    info!(
        event = "task.executed",
        task_id = task_id.0,
        output = %output_commitment.short(),
        window_secs = window_secs,
    );
}

pub fn emit_task_challenged(task_id: TaskId, challenger: &AccountId, bond: Amount) {
    info!(
        event = "task.challenged",
        task_id = task_id.0,
        challenger = %challenger,
        bond = %bond,
    );
}

/// Emit event: dispute settled by a resolver.
pub fn emit_task_resolved(
    task_id: TaskId,
    verdict: Verdict,
    strategy: &str,
    winner: &AccountId,
    payout: Amount,
    protocol_fee: Amount,
) {
    info!(
        event = "task.resolved",
        task_id = task_id.0,
        verdict = ?verdict,
        strategy = %strategy,
        winner = %winner,
        payout = %payout,
        protocol_fee = %protocol_fee,
    );
}

pub fn emit_task_claimed(task_id: TaskId, agent_owner: &AccountId, payout: Amount) {
    info!(
        event = "task.claimed",
        task_id = task_id.0,
        agent_owner = %agent_owner,
        payout = %payout,
    );
}

pub fn emit_task_expired(task_id: TaskId, client: &AccountId, refund: Amount) {
    info!(
        event = "task.expired",
        task_id = task_id.0,
        client = %client,
        refund = %refund,
    );
}

/// Emit event: a transition was refused (warning level).
pub fn emit_transition_rejected(op: &str, state: Option<TaskState>, error: &ArbiterError) {
    warn!(
        event = "task.transition_rejected",
        op = %op,
        state = state.map(TaskState::as_str).unwrap_or("-"),
        kind = ?error.kind(),
        error = %error,
    );
}

pub fn emit_agent_registered(agent_id: AgentId, owner: &AccountId, model_hash: &Hash32) {
    info!(
        event = "agent.registered",
        agent_id = agent_id.0,
        owner = %owner,
        model = %model_hash.short(),
    );
}

pub fn emit_agent_spec_updated(agent_id: AgentId, model_hash: &Hash32) {
    info!(
        event = "agent.spec_updated",
        agent_id = agent_id.0,
        model = %model_hash.short(),
    );
}

pub fn emit_agent_transferred(agent_id: AgentId, from: &AccountId, to: &AccountId) {
    info!(
        event = "agent.transferred",
        agent_id = agent_id.0,
        from = %from,
        to = %to,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_span_create() {
        let _span = TaskSpan::enter(TaskId(1), "submit");
    }
}
