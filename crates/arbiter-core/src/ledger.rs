//! Task ledger: the bonded task lifecycle.
//!
//! ```text
//! submit ─► PENDING ─bond─► COMMITTED ─publish─► EXECUTED ─challenge─► CHALLENGED
//!                              │                    │                      │
//!                           expire               claim                  resolve
//!                              ▼                    ▼                      ▼
//!                           EXPIRED      RESOLVED_NO_CHALLENGE   RESOLVED_AGENT /
//!                                                                RESOLVED_CHALLENGER
//! ```
//!
//! Every transition checks existence, then the exact predecessor state, then
//! its own guards. Only after all guards pass does it write the new task
//! record and move value. If the value ledger refuses the transfer, the
//! previous record is put back, so a failed call leaves no trace.
//!
//! All operations take `&mut self`; the ledger is a single sequential
//! consistency domain.

use std::collections::BTreeMap;

use arbiter_state::{AccountId, Amount, Credit, ValueLedger};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::{self, ProtocolConfig};
use crate::directory::AgentDirectory;
use crate::domain::{
    AgentId, ArbiterError, Challenge, Hash32, Result, Settlement, Task, TaskEvent,
    TaskEventKind, TaskId, TaskState, Verdict,
};
use crate::metrics::METRICS;
use crate::obs::{self, TaskSpan};
use crate::payout::{self, Payout, Pool};
use crate::resolver::Resolver;

/// Everything the ledger owns besides its collaborators. Serializable so a
/// host can persist it between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    tasks: BTreeMap<TaskId, Task>,
    challenges: BTreeMap<TaskId, Challenge>,
    /// Per-agent challenge window in seconds.
    window_overrides: BTreeMap<AgentId, i64>,
    events: Vec<TaskEvent>,
    last_task_id: u64,
}

impl LedgerState {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

pub struct TaskLedger<L, D, C> {
    config: ProtocolConfig,
    value: L,
    directory: D,
    clock: C,
    state: LedgerState,
}

impl<L, D, C> TaskLedger<L, D, C>
where
    L: ValueLedger,
    D: AgentDirectory,
    C: Clock,
{
    pub fn new(config: ProtocolConfig, value: L, directory: D, clock: C) -> Result<Self> {
        Self::with_state(config, value, directory, clock, LedgerState::default())
    }

    /// Resume from previously persisted state.
    pub fn with_state(
        config: ProtocolConfig,
        value: L,
        directory: D,
        clock: C,
        state: LedgerState,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            value,
            directory,
            clock,
            state,
        })
    }

    pub fn into_parts(self) -> (L, D, LedgerState) {
        (self.value, self.directory, self.state)
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn value(&self) -> &L {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut L {
        &mut self.value
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Open a task against `agent_id`, escrowing `fee` from `caller`.
    pub fn submit(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        input_commitment: Hash32,
        input_pointer: impl Into<String>,
        fee: Amount,
    ) -> Result<TaskId> {
        let result = self.try_submit(caller, agent_id, input_commitment, input_pointer.into(), fee);
        if let Err(err) = &result {
            obs::emit_transition_rejected("submit", None, err);
        }
        result
    }

    fn try_submit(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        input_commitment: Hash32,
        input_pointer: String,
        fee: Amount,
    ) -> Result<TaskId> {
        input_commitment.require_present("input_commitment")?;
        if fee == 0 {
            return Err(ArbiterError::InvalidArgument(
                "fee must be positive".to_string(),
            ));
        }
        if !self.directory.is_active(agent_id)? {
            return Err(ArbiterError::AgentInactive(agent_id));
        }

        let next = self
            .state
            .last_task_id
            .checked_add(1)
            .ok_or(ArbiterError::Overflow("task id"))?;
        let task_id = TaskId(next);
        let _span = TaskSpan::enter(task_id, "submit");
        let now = self.clock.now();

        self.state.tasks.insert(
            task_id,
            Task {
                id: task_id,
                agent_id,
                client: caller.clone(),
                input_commitment,
                input_pointer,
                output_commitment: None,
                output_pointer: None,
                fee,
                agent_bond: 0,
                challenger_bond: 0,
                agent_owner: None,
                challenger: None,
                submitted_at: now,
                bonded_at: None,
                executed_at: None,
                challenge_deadline: None,
                state: TaskState::Pending,
                settlement: None,
            },
        );
        let escrow = self.config.escrow.clone();
        if let Err(err) = self.value.transfer(caller, &escrow, fee) {
            self.state.tasks.remove(&task_id);
            return Err(err.into());
        }
        self.state.last_task_id = next;

        self.record(
            task_id,
            now,
            TaskEventKind::Submitted {
                agent_id,
                client: caller.clone(),
                fee,
                input_commitment,
            },
        );
        METRICS.inc_tasks_submitted();
        obs::emit_task_submitted(task_id, agent_id, caller, fee);
        Ok(task_id)
    }

    /// Agent owner stakes `amount` on delivering the task.
    pub fn bond(&mut self, caller: &AccountId, task_id: TaskId, amount: Amount) -> Result<()> {
        let _span = TaskSpan::enter(task_id, "bond");
        let result = self.try_bond(caller, task_id, amount);
        self.observe("bond", task_id, result)
    }

    fn try_bond(&mut self, caller: &AccountId, task_id: TaskId, amount: Amount) -> Result<()> {
        let previous = self.load(task_id, TaskState::Pending)?;
        let owner = self.directory.owner(previous.agent_id)?;
        if &owner != caller {
            return Err(ArbiterError::NotAgentOwner {
                agent_id: previous.agent_id,
                caller: caller.clone(),
            });
        }
        let required = payout::min_agent_bond(previous.fee, &self.config)?;
        if amount < required {
            return Err(ArbiterError::InsufficientBond {
                required,
                provided: amount,
            });
        }

        let now = self.clock.now();
        let mut next = previous.clone();
        next.state = TaskState::Committed;
        next.agent_bond = amount;
        next.agent_owner = Some(caller.clone());
        next.bonded_at = Some(now);
        next.escrowed().ok_or(ArbiterError::Overflow("escrow pool"))?;

        let escrow = self.config.escrow.clone();
        self.apply(previous, next, caller, &[Credit::new(escrow, amount)])?;

        self.record(
            task_id,
            now,
            TaskEventKind::Bonded {
                agent_owner: caller.clone(),
                bond: amount,
            },
        );
        obs::emit_task_bonded(task_id, caller, amount);
        Ok(())
    }

    /// Bonded agent commits to an output and opens the challenge window.
    pub fn publish(
        &mut self,
        caller: &AccountId,
        task_id: TaskId,
        output_commitment: Hash32,
        output_pointer: impl Into<String>,
    ) -> Result<DateTime<Utc>> {
        let _span = TaskSpan::enter(task_id, "publish");
        let result = self.try_publish(caller, task_id, output_commitment, output_pointer.into());
        self.observe("publish", task_id, result)
    }

    fn try_publish(
        &mut self,
        caller: &AccountId,
        task_id: TaskId,
        output_commitment: Hash32,
        output_pointer: String,
    ) -> Result<DateTime<Utc>> {
        let previous = self.load(task_id, TaskState::Committed)?;
        if previous.agent_owner.as_ref() != Some(caller) {
            return Err(ArbiterError::NotTaskAgent {
                task_id,
                caller: caller.clone(),
            });
        }
        output_commitment.require_present("output_commitment")?;

        let now = self.clock.now();
        let deadline = self.execution_deadline(&previous)?;
        if now > deadline {
            return Err(ArbiterError::ExecutionDeadlinePassed { task_id, deadline });
        }

        let window = self.challenge_window(previous.agent_id)?;
        let challenge_deadline = now
            .checked_add_signed(window)
            .ok_or(ArbiterError::Overflow("challenge deadline"))?;
        let mut next = previous.clone();
        next.state = TaskState::Executed;
        next.output_commitment = Some(output_commitment);
        next.output_pointer = Some(output_pointer);
        next.executed_at = Some(now);
        next.challenge_deadline = Some(challenge_deadline);
        self.apply(previous, next, caller, &[])?;

        self.record(
            task_id,
            now,
            TaskEventKind::Executed {
                output_commitment,
                challenge_deadline,
            },
        );
        obs::emit_task_executed(task_id, &output_commitment, window.num_seconds());
        Ok(challenge_deadline)
    }

    /// Dispute a published output. At most one challenge per task.
    pub fn challenge(
        &mut self,
        caller: &AccountId,
        task_id: TaskId,
        claimed_output: Hash32,
        evidence_pointer: impl Into<String>,
        bond: Amount,
    ) -> Result<()> {
        let _span = TaskSpan::enter(task_id, "challenge");
        let result =
            self.try_challenge(caller, task_id, claimed_output, evidence_pointer.into(), bond);
        self.observe("challenge", task_id, result)
    }

    fn try_challenge(
        &mut self,
        caller: &AccountId,
        task_id: TaskId,
        claimed_output: Hash32,
        evidence_pointer: String,
        bond: Amount,
    ) -> Result<()> {
        let existing = self.get_task(task_id)?;
        if existing.state == TaskState::Challenged || self.state.challenges.contains_key(&task_id) {
            return Err(ArbiterError::AlreadyChallenged(task_id));
        }
        let previous = self.load(task_id, TaskState::Executed)?;

        let now = self.clock.now();
        let deadline = previous
            .challenge_deadline
            .ok_or_else(|| missing_field(&previous, "challenge_deadline"))?;
        if now > deadline {
            return Err(ArbiterError::ChallengeWindowClosed { task_id, deadline });
        }
        if previous.agent_owner.as_ref() == Some(caller) {
            return Err(ArbiterError::SelfChallenge(task_id));
        }
        claimed_output.require_present("claimed_output")?;
        if previous.output_commitment == Some(claimed_output) {
            return Err(ArbiterError::InvalidArgument(
                "claimed output equals the published output".to_string(),
            ));
        }
        let required = payout::min_challenger_bond(previous.agent_bond, &self.config)?;
        if bond < required {
            return Err(ArbiterError::InsufficientChallengerBond {
                required,
                provided: bond,
            });
        }

        let mut next = previous.clone();
        next.state = TaskState::Challenged;
        next.challenger_bond = bond;
        next.challenger = Some(caller.clone());
        next.escrowed().ok_or(ArbiterError::Overflow("escrow pool"))?;

        self.state.challenges.insert(
            task_id,
            Challenge {
                task_id,
                challenger: caller.clone(),
                claimed_output,
                evidence_pointer,
                bond,
                challenged_at: now,
            },
        );
        let escrow = self.config.escrow.clone();
        if let Err(err) = self.apply(previous, next, caller, &[Credit::new(escrow, bond)]) {
            self.state.challenges.remove(&task_id);
            return Err(err);
        }

        self.record(
            task_id,
            now,
            TaskEventKind::Challenged {
                challenger: caller.clone(),
                claimed_output,
                bond,
            },
        );
        METRICS.inc_challenges();
        obs::emit_task_challenged(task_id, caller, bond);
        Ok(())
    }

    /// Settle a dispute with the verdict from `resolver`.
    pub fn resolve_challenge(
        &mut self,
        task_id: TaskId,
        resolver: &dyn Resolver,
    ) -> Result<Settlement> {
        let _span = TaskSpan::enter(task_id, "resolve");
        let result = self.try_resolve(task_id, resolver);
        self.observe("resolve", task_id, result)
    }

    fn try_resolve(&mut self, task_id: TaskId, resolver: &dyn Resolver) -> Result<Settlement> {
        let previous = self.load(task_id, TaskState::Challenged)?;
        let challenge = self
            .state
            .challenges
            .get(&task_id)
            .ok_or(ArbiterError::ChallengeNotFound(task_id))?;
        let verdict = resolver.decide(&previous, challenge)?;

        let pool = Pool::of(&previous);
        let bps = self.config.protocol_fee_bps;
        let treasury = self.config.treasury.clone();
        let (winner, settlement_payout) = match verdict {
            Verdict::AgentWins => {
                let owner = bonded_owner(&previous)?;
                let p = payout::agent_wins(pool, &owner, &treasury, bps)?;
                (owner, p)
            }
            Verdict::ChallengerWins => {
                let challenger = challenge.challenger.clone();
                let p = payout::challenger_wins(pool, &challenger, &previous.client, &treasury, bps)?;
                (challenger, p)
            }
        };

        let now = self.clock.now();
        let settlement = self.settle(previous, verdict.terminal_state(), &settlement_payout, now)?;

        self.record(
            task_id,
            now,
            TaskEventKind::Resolved {
                verdict,
                winner: winner.clone(),
                payout: settlement_payout.winner_payout,
                protocol_fee: settlement_payout.protocol_fee,
                client_refund: settlement_payout.client_refund,
            },
        );
        METRICS.inc_resolutions();
        METRICS.add_protocol_fee(settlement_payout.protocol_fee);
        obs::emit_task_resolved(
            task_id,
            verdict,
            resolver.strategy().as_str(),
            &winner,
            settlement_payout.winner_payout,
            settlement_payout.protocol_fee,
        );
        Ok(settlement)
    }

    /// Pay an unchallenged agent once its window has closed. Anyone may call.
    pub fn claim_bonds(&mut self, task_id: TaskId) -> Result<Settlement> {
        let _span = TaskSpan::enter(task_id, "claim");
        let result = self.try_claim(task_id);
        self.observe("claim", task_id, result)
    }

    fn try_claim(&mut self, task_id: TaskId) -> Result<Settlement> {
        let previous = self.load(task_id, TaskState::Executed)?;
        let now = self.clock.now();
        let deadline = previous
            .challenge_deadline
            .ok_or_else(|| missing_field(&previous, "challenge_deadline"))?;
        if now <= deadline {
            return Err(ArbiterError::ChallengeWindowOpen { task_id, deadline });
        }

        let owner = bonded_owner(&previous)?;
        let p = payout::unchallenged(Pool::of(&previous), &owner)?;
        let settlement = self.settle(previous, TaskState::ResolvedNoChallenge, &p, now)?;

        self.record(
            task_id,
            now,
            TaskEventKind::Claimed {
                agent_owner: owner.clone(),
                payout: p.winner_payout,
            },
        );
        METRICS.inc_claims();
        obs::emit_task_claimed(task_id, &owner, p.winner_payout);
        Ok(settlement)
    }

    /// Refund the client when the agent missed its execution deadline.
    /// Anyone may call.
    pub fn expire_task(&mut self, task_id: TaskId) -> Result<Settlement> {
        let _span = TaskSpan::enter(task_id, "expire");
        let result = self.try_expire(task_id);
        self.observe("expire", task_id, result)
    }

    fn try_expire(&mut self, task_id: TaskId) -> Result<Settlement> {
        let previous = self.load(task_id, TaskState::Committed)?;
        let now = self.clock.now();
        let deadline = self.execution_deadline(&previous)?;
        if now <= deadline {
            return Err(ArbiterError::ExecutionDeadlineNotReached { task_id, deadline });
        }

        let client = previous.client.clone();
        let p = payout::expired(Pool::of(&previous), &client)?;
        let settlement = self.settle(previous, TaskState::Expired, &p, now)?;

        self.record(
            task_id,
            now,
            TaskEventKind::Expired {
                client: client.clone(),
                refund: p.winner_payout,
            },
        );
        METRICS.inc_expiries();
        obs::emit_task_expired(task_id, &client, p.winner_payout);
        Ok(settlement)
    }

    /// Override the challenge window for tasks the agent publishes from now
    /// on. `None` restores the default.
    pub fn set_challenge_window(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        window_secs: Option<i64>,
    ) -> Result<()> {
        let owner = self.directory.owner(agent_id)?;
        if &owner != caller {
            return Err(ArbiterError::NotAgentOwner {
                agent_id,
                caller: caller.clone(),
            });
        }
        match window_secs {
            Some(secs) => {
                let (min, max) = (
                    self.config.min_challenge_window_secs,
                    self.config.max_challenge_window_secs,
                );
                if !(min..=max).contains(&secs) {
                    return Err(ArbiterError::InvalidArgument(format!(
                        "challenge window {secs}s outside {min}..={max}"
                    )));
                }
                self.state.window_overrides.insert(agent_id, secs);
            }
            None => {
                self.state.window_overrides.remove(&agent_id);
            }
        }
        tracing::info!(
            event = "agent.challenge_window_set",
            agent_id = agent_id.0,
            window_secs = ?window_secs,
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn task(&self, task_id: TaskId) -> Result<&Task> {
        self.get_task(task_id)
    }

    pub fn challenge_of(&self, task_id: TaskId) -> Result<&Challenge> {
        self.state
            .challenges
            .get(&task_id)
            .ok_or(ArbiterError::ChallengeNotFound(task_id))
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.state.tasks.values()
    }

    pub fn tasks_by_state(&self, state: TaskState) -> Vec<&Task> {
        self.tasks().filter(|t| t.state == state).collect()
    }

    pub fn tasks_for_agent(&self, agent_id: AgentId) -> Vec<&Task> {
        self.tasks().filter(|t| t.agent_id == agent_id).collect()
    }

    /// Committed tasks whose execution deadline has passed.
    pub fn expirable_tasks(&self) -> Vec<TaskId> {
        let now = self.clock.now();
        let Ok(window) = self.config.execution_deadline() else {
            return Vec::new();
        };
        self.tasks()
            .filter(|t| t.state == TaskState::Committed)
            .filter(|t| t.execution_deadline(window).is_some_and(|d| now > d))
            .map(|t| t.id)
            .collect()
    }

    /// Executed tasks whose challenge window has closed.
    pub fn claimable_tasks(&self) -> Vec<TaskId> {
        let now = self.clock.now();
        self.tasks()
            .filter(|t| t.state == TaskState::Executed)
            .filter(|t| t.challenge_deadline.is_some_and(|d| now > d))
            .map(|t| t.id)
            .collect()
    }

    pub fn events(&self) -> &[TaskEvent] {
        &self.state.events
    }

    pub fn events_for(&self, task_id: TaskId) -> Vec<&TaskEvent> {
        self.state
            .events
            .iter()
            .filter(|e| e.task_id == task_id)
            .collect()
    }

    /// Window applied at the agent's next publish.
    pub fn challenge_window(&self, agent_id: AgentId) -> Result<Duration> {
        match self.state.window_overrides.get(&agent_id) {
            Some(secs) => config::period(*secs, "challenge window"),
            None => self.config.default_challenge_window(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn get_task(&self, task_id: TaskId) -> Result<&Task> {
        self.state
            .tasks
            .get(&task_id)
            .ok_or(ArbiterError::TaskNotFound(task_id))
    }

    /// Copy of the task, provided it is in `expected`.
    fn load(&self, task_id: TaskId, expected: TaskState) -> Result<Task> {
        let task = self.get_task(task_id)?;
        if task.state != expected {
            return Err(ArbiterError::InvalidState {
                task_id,
                actual: task.state,
                expected,
            });
        }
        Ok(task.clone())
    }

    fn execution_deadline(&self, task: &Task) -> Result<DateTime<Utc>> {
        if task.bonded_at.is_none() {
            return Err(missing_field(task, "bonded_at"));
        }
        task.execution_deadline(self.config.execution_deadline()?)
            .ok_or(ArbiterError::Overflow("execution deadline"))
    }

    /// Write `next`, then pay `credits` out of `from`. Restores `previous`
    /// if the value ledger refuses.
    fn apply(&mut self, previous: Task, next: Task, from: &AccountId, credits: &[Credit]) -> Result<()> {
        let task_id = next.id;
        self.state.tasks.insert(task_id, next);
        if credits.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.value.transfer_batch(from, credits) {
            self.state.tasks.insert(task_id, previous);
            return Err(err.into());
        }
        Ok(())
    }

    /// Move a task to a terminal state and pay out the whole pool from escrow.
    ///
    /// Order: directory lookup, task write, `record_outcome`, transfer. A
    /// refused `record_outcome` restores the task before any value moves. A
    /// refused transfer restores the task and reverts the outcome.
    fn settle(
        &mut self,
        previous: Task,
        outcome: TaskState,
        payout: &Payout,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        debug_assert_eq!(Pool::of(&previous).total().ok(), Some(payout.total()));

        let settlement = Settlement {
            outcome,
            credits: payout.credits.clone(),
            protocol_fee: payout.protocol_fee,
            settled_at: now,
        };
        let agent_id = previous.agent_id;
        let success = outcome.is_agent_success();
        self.directory.spec(agent_id)?;

        let task_id = previous.id;
        let mut next = previous.clone();
        next.state = outcome;
        next.settlement = Some(settlement.clone());
        self.state.tasks.insert(task_id, next);

        if let Err(err) = self.directory.record_outcome(agent_id, success) {
            self.state.tasks.insert(task_id, previous);
            return Err(err);
        }

        let escrow = self.config.escrow.clone();
        if let Err(err) = self.value.transfer_batch(&escrow, &payout.credits) {
            self.state.tasks.insert(task_id, previous);
            if let Err(revert) = self.directory.revert_outcome(agent_id, success) {
                tracing::error!(
                    event = "agent.outcome_revert_failed",
                    agent_id = agent_id.0,
                    error = %revert,
                );
            }
            return Err(err.into());
        }
        Ok(settlement)
    }

    fn record(&mut self, task_id: TaskId, at: DateTime<Utc>, kind: TaskEventKind) {
        let seq = self.state.events.len() as u64 + 1;
        self.state.events.push(TaskEvent {
            seq,
            task_id,
            at,
            kind,
        });
    }

    fn observe<T>(&self, op: &'static str, task_id: TaskId, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let state = self.state.tasks.get(&task_id).map(|t| t.state);
            obs::emit_transition_rejected(op, state, err);
        }
        result
    }
}

fn bonded_owner(task: &Task) -> Result<AccountId> {
    task.agent_owner
        .clone()
        .ok_or_else(|| missing_field(task, "agent_owner"))
}

/// A record past PENDING is missing a field its state guarantees.
fn missing_field(task: &Task, field: &'static str) -> ArbiterError {
    ArbiterError::InvalidArgument(format!(
        "task {} in {} has no {field}",
        task.id, task.state
    ))
}
