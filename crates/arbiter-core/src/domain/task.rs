//! Task, challenge and settlement records.

use arbiter_state::{AccountId, Amount, Credit};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::agent_spec::AgentId;
use super::commitment::Hash32;

/// Task identifier; allocated from 1 upward and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a task.
///
/// ```text
/// PENDING → COMMITTED → EXECUTED → CHALLENGED → RESOLVED_AGENT | RESOLVED_CHALLENGER
///              │            └──────────────→ RESOLVED_NO_CHALLENGE
///              └──→ EXPIRED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Committed,
    Executed,
    Challenged,
    ResolvedAgent,
    ResolvedChallenger,
    ResolvedNoChallenge,
    Expired,
}

impl TaskState {
    pub const ALL: [TaskState; 8] = [
        TaskState::Pending,
        TaskState::Committed,
        TaskState::Executed,
        TaskState::Challenged,
        TaskState::ResolvedAgent,
        TaskState::ResolvedChallenger,
        TaskState::ResolvedNoChallenge,
        TaskState::Expired,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::ResolvedAgent
                | TaskState::ResolvedChallenger
                | TaskState::ResolvedNoChallenge
                | TaskState::Expired
        )
    }

    /// Whether a terminal outcome counts toward the agent's successes.
    pub fn is_agent_success(self) -> bool {
        matches!(
            self,
            TaskState::ResolvedAgent | TaskState::ResolvedNoChallenge
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Committed => "COMMITTED",
            TaskState::Executed => "EXECUTED",
            TaskState::Challenged => "CHALLENGED",
            TaskState::ResolvedAgent => "RESOLVED_AGENT",
            TaskState::ResolvedChallenger => "RESOLVED_CHALLENGER",
            TaskState::ResolvedNoChallenge => "RESOLVED_NO_CHALLENGE",
            TaskState::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or_else(|| format!("unknown task state: {s}"))
    }
}

/// Outcome of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AgentWins,
    ChallengerWins,
}

impl Verdict {
    pub fn terminal_state(self) -> TaskState {
        match self {
            Verdict::AgentWins => TaskState::ResolvedAgent,
            Verdict::ChallengerWins => TaskState::ResolvedChallenger,
        }
    }
}

/// Exact credits paid out of escrow when a task reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: TaskState,
    pub credits: Vec<Credit>,
    pub protocol_fee: Amount,
    pub settled_at: DateTime<Utc>,
}

impl Settlement {
    /// Sum of all credits. Equals the task's pool.
    pub fn total(&self) -> Amount {
        self.credits
            .iter()
            .fold(0u128, |acc, c| acc.saturating_add(c.amount))
    }

    /// Amount paid to `account` (zero if none).
    pub fn paid_to(&self, account: &AccountId) -> Amount {
        self.credits
            .iter()
            .filter(|c| &c.to == account)
            .fold(0u128, |acc, c| acc.saturating_add(c.amount))
    }
}

/// A unit of bonded work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub agent_id: AgentId,
    pub client: AccountId,
    pub input_commitment: Hash32,
    pub input_pointer: String,
    pub output_commitment: Option<Hash32>,
    pub output_pointer: Option<String>,
    pub fee: Amount,
    pub agent_bond: Amount,
    pub challenger_bond: Amount,
    /// Owner at bonding time; payouts go here even if the agent is later transferred.
    pub agent_owner: Option<AccountId>,
    pub challenger: Option<AccountId>,
    pub submitted_at: DateTime<Utc>,
    pub bonded_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub challenge_deadline: Option<DateTime<Utc>>,
    pub state: TaskState,
    pub settlement: Option<Settlement>,
}

impl Task {
    /// `bonded_at + execution_window`. `None` before bonding or when the sum
    /// is out of range.
    pub fn execution_deadline(&self, execution_window: Duration) -> Option<DateTime<Utc>> {
        self.bonded_at?.checked_add_signed(execution_window)
    }

    /// `fee + agent_bond + challenger_bond`, or `None` on overflow.
    pub fn escrowed(&self) -> Option<Amount> {
        self.fee
            .checked_add(self.agent_bond)?
            .checked_add(self.challenger_bond)
    }
}

/// Dispute raised against an executed task. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub task_id: TaskId,
    pub challenger: AccountId,
    /// Output commitment the challenger claims is correct.
    pub claimed_output: Hash32,
    pub evidence_pointer: String,
    pub bond: Amount,
    pub challenged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = TaskState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                TaskState::ResolvedAgent,
                TaskState::ResolvedChallenger,
                TaskState::ResolvedNoChallenge,
                TaskState::Expired
            ]
        );
    }

    #[test]
    fn state_parse_accepts_kebab_and_lowercase() {
        assert_eq!(
            "resolved-no-challenge".parse::<TaskState>().unwrap(),
            TaskState::ResolvedNoChallenge
        );
        assert_eq!("PENDING".parse::<TaskState>().unwrap(), TaskState::Pending);
        assert!("done".parse::<TaskState>().is_err());
    }

    #[test]
    fn state_serde_matches_display() {
        for state in TaskState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn settlement_paid_to_sums_repeated_credits() {
        let a = AccountId::from("a");
        let settlement = Settlement {
            outcome: TaskState::ResolvedAgent,
            credits: vec![
                Credit::new(a.clone(), 2),
                Credit::new(AccountId::from("t"), 1),
                Credit::new(a.clone(), 3),
            ],
            protocol_fee: 1,
            settled_at: Utc::now(),
        };
        assert_eq!(settlement.paid_to(&a), 5);
        assert_eq!(settlement.total(), 6);
    }

    #[test]
    fn execution_deadline_is_none_when_out_of_range() {
        let mut task = Task {
            id: TaskId(1),
            agent_id: AgentId(1),
            client: AccountId::from("client"),
            input_commitment: Hash32::digest(b"in"),
            input_pointer: String::new(),
            output_commitment: None,
            output_pointer: None,
            fee: 1,
            agent_bond: 0,
            challenger_bond: 0,
            agent_owner: None,
            challenger: None,
            submitted_at: DateTime::<Utc>::MAX_UTC,
            bonded_at: None,
            executed_at: None,
            challenge_deadline: None,
            state: TaskState::Pending,
            settlement: None,
        };
        assert_eq!(task.execution_deadline(Duration::hours(1)), None);

        task.bonded_at = Some(DateTime::<Utc>::MAX_UTC - Duration::minutes(30));
        assert_eq!(task.execution_deadline(Duration::hours(1)), None);

        let bonded = DateTime::<Utc>::MIN_UTC;
        task.bonded_at = Some(bonded);
        assert_eq!(
            task.execution_deadline(Duration::hours(1)),
            Some(bonded + Duration::hours(1))
        );
    }
}
