//! Domain-level error taxonomy for Arbiter.
//!
//! Every rejected operation maps to exactly one [`ErrorKind`] so callers can
//! pick the right remediation ("wait for the window to close" versus
//! "increase your bond") without string matching.

use arbiter_state::{AccountId, Amount, StorageError};
use chrono::{DateTime, Utc};

use super::agent_spec::AgentId;
use super::commitment::Hash32;
use super::task::{TaskId, TaskState};

/// Coarse classification of an [`ArbiterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    StateConflict,
    Unauthorized,
    EconomicInsufficiency,
    Temporal,
    MalformedInput,
    /// Amount or timestamp arithmetic left its representable range.
    Overflow,
    /// The resolver declined to produce a verdict.
    Unresolved,
    /// Value ledger or artifact store failure.
    Storage,
    Config,
}

/// Arbiter domain errors.
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("no challenge recorded for task {0}")]
    ChallengeNotFound(TaskId),

    #[error("task {task_id} is {actual}, expected {expected}")]
    InvalidState {
        task_id: TaskId,
        actual: TaskState,
        expected: TaskState,
    },

    #[error("task {0} already has a challenger")]
    AlreadyChallenged(TaskId),

    #[error("agent {0} is inactive")]
    AgentInactive(AgentId),

    #[error("{caller} is not the owner of agent {agent_id}")]
    NotAgentOwner { agent_id: AgentId, caller: AccountId },

    #[error("{caller} is not the bonded owner of task {task_id}")]
    NotTaskAgent { task_id: TaskId, caller: AccountId },

    #[error("agent owner cannot challenge task {0}")]
    SelfChallenge(TaskId),

    #[error("resolver not authorized: {0}")]
    ResolverNotAuthorized(String),

    #[error("bond {provided} below minimum {required}")]
    InsufficientBond { required: Amount, provided: Amount },

    #[error("challenger bond {provided} below minimum {required}")]
    InsufficientChallengerBond { required: Amount, provided: Amount },

    #[error("execution deadline for task {task_id} passed at {deadline}")]
    ExecutionDeadlinePassed {
        task_id: TaskId,
        deadline: DateTime<Utc>,
    },

    #[error("execution deadline for task {task_id} not reached until {deadline}")]
    ExecutionDeadlineNotReached {
        task_id: TaskId,
        deadline: DateTime<Utc>,
    },

    #[error("challenge window for task {task_id} closed at {deadline}")]
    ChallengeWindowClosed {
        task_id: TaskId,
        deadline: DateTime<Utc>,
    },

    #[error("challenge window for task {task_id} open until {deadline}")]
    ChallengeWindowOpen {
        task_id: TaskId,
        deadline: DateTime<Utc>,
    },

    #[error("commitment must not be zero: {0}")]
    EmptyCommitment(&'static str),

    #[error("invalid agent spec: {0}")]
    InvalidAgentSpec(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("length mismatch: {left} leaves, {right} proofs")]
    LengthMismatch { left: usize, right: usize },

    #[error("leaf set is empty")]
    EmptyLeafSet,

    #[error("leaf index {index} out of range for {len} leaves")]
    LeafIndexOutOfRange { index: usize, len: usize },

    #[error("artifact digest {actual} does not match commitment {expected}")]
    ArtifactMismatch { expected: Hash32, actual: Hash32 },

    #[error("malformed artifact pointer: {0}")]
    InvalidPointer(String),

    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),

    #[error("resolver could not decide task {task_id}: {reason}")]
    Unresolved { task_id: TaskId, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(String),
}

impl ArbiterError {
    pub fn kind(&self) -> ErrorKind {
        use ArbiterError::*;
        match self {
            TaskNotFound(_) | AgentNotFound(_) | ChallengeNotFound(_) => ErrorKind::NotFound,
            InvalidState { .. } | AlreadyChallenged(_) | AgentInactive(_) => {
                ErrorKind::StateConflict
            }
            NotAgentOwner { .. }
            | NotTaskAgent { .. }
            | SelfChallenge(_)
            | ResolverNotAuthorized(_) => ErrorKind::Unauthorized,
            InsufficientBond { .. } | InsufficientChallengerBond { .. } => {
                ErrorKind::EconomicInsufficiency
            }
            ExecutionDeadlinePassed { .. }
            | ExecutionDeadlineNotReached { .. }
            | ChallengeWindowClosed { .. }
            | ChallengeWindowOpen { .. } => ErrorKind::Temporal,
            EmptyCommitment(_)
            | InvalidAgentSpec(_)
            | InvalidArgument(_)
            | LengthMismatch { .. }
            | EmptyLeafSet
            | LeafIndexOutOfRange { .. }
            | ArtifactMismatch { .. }
            | InvalidPointer(_) => ErrorKind::MalformedInput,
            Overflow(_) => ErrorKind::Overflow,
            Unresolved { .. } => ErrorKind::Unresolved,
            Storage(StorageError::InsufficientFunds { .. }) => ErrorKind::EconomicInsufficiency,
            Storage(_) => ErrorKind::Storage,
            Config(_) => ErrorKind::Config,
        }
    }
}

/// Result type for Arbiter domain operations.
pub type Result<T> = std::result::Result<T, ArbiterError>;
