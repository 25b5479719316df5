//! Dispute verdict sources.
//!
//! The ledger never decides who is right; it asks an injected [`Resolver`].
//! A resolver that cannot decide returns [`ArbiterError::Unresolved`] and
//! the task stays challenged.

use arbiter_state::AccountId;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::domain::{ArbiterError, Challenge, Hash32, Result, Task, Verdict};

/// How a verdict was reached. Logged with every resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Verdict fixed in advance; no authority check.
    Fixed,
    /// Verdict asserted by an allow-listed arbiter.
    Arbitration,
    /// Output recomputed from the agent's committed spec.
    ReferenceExecution,
}

impl ResolutionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStrategy::Fixed => "fixed",
            ResolutionStrategy::Arbitration => "arbitration",
            ResolutionStrategy::ReferenceExecution => "reference_execution",
        }
    }
}

pub trait Resolver {
    fn strategy(&self) -> ResolutionStrategy;

    fn decide(&self, task: &Task, challenge: &Challenge) -> Result<Verdict>;
}

/// Always returns the same verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedVerdict(pub Verdict);

impl Resolver for FixedVerdict {
    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::Fixed
    }

    fn decide(&self, _task: &Task, _challenge: &Challenge) -> Result<Verdict> {
        Ok(self.0)
    }
}

/// Verdict asserted by `arbiter`, honoured only if the arbiter is on the
/// configured allowlist.
#[derive(Debug, Clone)]
pub struct AllowlistResolver {
    arbiter: AccountId,
    verdict: Verdict,
    allowlist: Vec<AccountId>,
}

impl AllowlistResolver {
    pub fn new(config: &ProtocolConfig, arbiter: AccountId, verdict: Verdict) -> Self {
        Self {
            arbiter,
            verdict,
            allowlist: config.arbiters.clone(),
        }
    }

    pub fn arbiter(&self) -> &AccountId {
        &self.arbiter
    }
}

impl Resolver for AllowlistResolver {
    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::Arbitration
    }

    fn decide(&self, _task: &Task, _challenge: &Challenge) -> Result<Verdict> {
        if !self.allowlist.contains(&self.arbiter) {
            return Err(ArbiterError::ResolverNotAuthorized(self.arbiter.to_string()));
        }
        Ok(self.verdict)
    }
}

/// Compares a re-executed output commitment against both claims.
///
/// Whoever's commitment matches the recomputed output wins. A recomputation
/// that matches neither leaves the dispute open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceOutputResolver {
    recomputed: Hash32,
}

impl ReferenceOutputResolver {
    pub fn new(recomputed: Hash32) -> Self {
        Self { recomputed }
    }
}

impl Resolver for ReferenceOutputResolver {
    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::ReferenceExecution
    }

    fn decide(&self, task: &Task, challenge: &Challenge) -> Result<Verdict> {
        if task.output_commitment == Some(self.recomputed) {
            Ok(Verdict::AgentWins)
        } else if challenge.claimed_output == self.recomputed {
            Ok(Verdict::ChallengerWins)
        } else {
            Err(ArbiterError::Unresolved {
                task_id: task.id,
                reason: format!(
                    "recomputed output {} matches neither claim",
                    self.recomputed.short()
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, TaskId, TaskState};
    use chrono::Utc;

    fn disputed(output: Hash32, claimed: Hash32) -> (Task, Challenge) {
        let now = Utc::now();
        let task = Task {
            id: TaskId(1),
            agent_id: AgentId(1),
            client: AccountId::from("client"),
            input_commitment: Hash32::digest(b"in"),
            input_pointer: String::new(),
            output_commitment: Some(output),
            output_pointer: None,
            fee: 10,
            agent_bond: 1,
            challenger_bond: 2,
            agent_owner: Some(AccountId::from("agent")),
            challenger: Some(AccountId::from("challenger")),
            submitted_at: now,
            bonded_at: Some(now),
            executed_at: Some(now),
            challenge_deadline: Some(now),
            state: TaskState::Challenged,
            settlement: None,
        };
        let challenge = Challenge {
            task_id: TaskId(1),
            challenger: AccountId::from("challenger"),
            claimed_output: claimed,
            evidence_pointer: String::new(),
            bond: 2,
            challenged_at: now,
        };
        (task, challenge)
    }

    #[test]
    fn allowlist_rejects_unknown_arbiter() {
        let mut config = ProtocolConfig::default();
        config.arbiters.push(AccountId::from("panel"));
        let (task, challenge) = disputed(Hash32::digest(b"a"), Hash32::digest(b"b"));

        let outsider =
            AllowlistResolver::new(&config, AccountId::from("mallory"), Verdict::ChallengerWins);
        assert!(matches!(
            outsider.decide(&task, &challenge),
            Err(ArbiterError::ResolverNotAuthorized(_))
        ));

        let panel = AllowlistResolver::new(&config, AccountId::from("panel"), Verdict::AgentWins);
        assert_eq!(panel.decide(&task, &challenge).unwrap(), Verdict::AgentWins);
    }

    #[test]
    fn reference_output_picks_matching_side() {
        let (a, b) = (Hash32::digest(b"a"), Hash32::digest(b"b"));
        let (task, challenge) = disputed(a, b);

        let agent_side = ReferenceOutputResolver::new(a);
        assert_eq!(agent_side.decide(&task, &challenge).unwrap(), Verdict::AgentWins);

        let challenger_side = ReferenceOutputResolver::new(b);
        assert_eq!(
            challenger_side.decide(&task, &challenge).unwrap(),
            Verdict::ChallengerWins
        );

        let neither = ReferenceOutputResolver::new(Hash32::digest(b"c"));
        assert!(matches!(
            neither.decide(&task, &challenge),
            Err(ArbiterError::Unresolved { .. })
        ));
    }
}
