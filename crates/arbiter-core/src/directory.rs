//! Agent registry.
//!
//! The task ledger only sees the narrow [`AgentDirectory`] trait. The
//! in-memory implementation below is the full registry used by the CLI and
//! tests: registration, spec updates, ownership, activation and indices.
//!
//! Indices are append-only multimaps. The owner index is kept exact across
//! transfers. The model index is eventual: a spec update adds the agent
//! under the new model without removing it from the old one, so readers that
//! need current truth use [`InMemoryAgentDirectory::current_agents_by_model`].

use std::collections::BTreeMap;

use arbiter_state::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Agent, AgentId, AgentSpec, ArbiterError, Hash32, Result};
use crate::obs;
use crate::skill_tree;

/// What the task ledger needs to know about agents.
pub trait AgentDirectory: Send {
    fn spec(&self, agent_id: AgentId) -> Result<AgentSpec>;

    fn owner(&self, agent_id: AgentId) -> Result<AccountId>;

    fn is_active(&self, agent_id: AgentId) -> Result<bool>;

    /// Count one finished task; `success` is false for a lost dispute or an
    /// expiry.
    fn record_outcome(&mut self, agent_id: AgentId, success: bool) -> Result<()>;

    /// Undo one `record_outcome` whose settlement was refused by the value
    /// ledger.
    fn revert_outcome(&mut self, agent_id: AgentId, success: bool) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryAgentDirectory {
    agents: BTreeMap<AgentId, Agent>,
    by_owner: BTreeMap<AccountId, Vec<AgentId>>,
    by_model: BTreeMap<Hash32, Vec<AgentId>>,
    last_id: u64,
}

fn push_unique(list: &mut Vec<AgentId>, id: AgentId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent(&self, agent_id: AgentId) -> Option<&Agent> {
        self.agents.get(&agent_id)
    }

    pub fn get(&self, agent_id: AgentId) -> Result<&Agent> {
        self.agents
            .get(&agent_id)
            .ok_or(ArbiterError::AgentNotFound(agent_id))
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    fn owned_mut(&mut self, caller: &AccountId, agent_id: AgentId) -> Result<&mut Agent> {
        let agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or(ArbiterError::AgentNotFound(agent_id))?;
        if &agent.owner != caller {
            return Err(ArbiterError::NotAgentOwner {
                agent_id,
                caller: caller.clone(),
            });
        }
        Ok(agent)
    }

    /// Register a new agent owned by `owner`. Ids start at 1.
    pub fn register_agent(
        &mut self,
        owner: &AccountId,
        spec: AgentSpec,
        metadata_uri: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<AgentId> {
        spec.validate()?;
        let next = self
            .last_id
            .checked_add(1)
            .ok_or(ArbiterError::Overflow("agent id"))?;
        let agent_id = AgentId(next);
        let model_hash = spec.model_hash;

        self.agents.insert(
            agent_id,
            Agent {
                id: agent_id,
                owner: owner.clone(),
                spec,
                metadata_uri: metadata_uri.into(),
                tasks_attempted: 0,
                tasks_succeeded: 0,
                active: true,
                registered_at: now,
                updated_at: now,
            },
        );
        self.last_id = next;
        push_unique(self.by_owner.entry(owner.clone()).or_default(), agent_id);
        push_unique(self.by_model.entry(model_hash).or_default(), agent_id);

        obs::emit_agent_registered(agent_id, owner, &model_hash);
        Ok(agent_id)
    }

    /// Replace the agent's spec. Reputation starts over.
    pub fn update_spec(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        spec: AgentSpec,
        now: DateTime<Utc>,
    ) -> Result<()> {
        spec.validate()?;
        let agent = self.owned_mut(caller, agent_id)?;
        let model_hash = spec.model_hash;
        agent.spec = spec;
        agent.tasks_attempted = 0;
        agent.tasks_succeeded = 0;
        agent.updated_at = now;
        push_unique(self.by_model.entry(model_hash).or_default(), agent_id);

        obs::emit_agent_spec_updated(agent_id, &model_hash);
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        new_owner: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let agent = self.owned_mut(caller, agent_id)?;
        if &agent.owner == new_owner {
            return Ok(());
        }
        agent.owner = new_owner.clone();
        agent.updated_at = now;

        if let Some(list) = self.by_owner.get_mut(caller) {
            list.retain(|id| *id != agent_id);
            if list.is_empty() {
                self.by_owner.remove(caller);
            }
        }
        push_unique(self.by_owner.entry(new_owner.clone()).or_default(), agent_id);

        obs::emit_agent_transferred(agent_id, caller, new_owner);
        Ok(())
    }

    pub fn set_metadata_uri(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        metadata_uri: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let agent = self.owned_mut(caller, agent_id)?;
        agent.metadata_uri = metadata_uri.into();
        agent.updated_at = now;
        Ok(())
    }

    /// Stop accepting new tasks. Tasks already submitted run to completion.
    pub fn deactivate(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.set_active(caller, agent_id, false, now)
    }

    pub fn reactivate(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.set_active(caller, agent_id, true, now)
    }

    fn set_active(
        &mut self,
        caller: &AccountId,
        agent_id: AgentId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let agent = self.owned_mut(caller, agent_id)?;
        if agent.active != active {
            agent.active = active;
            agent.updated_at = now;
            tracing::info!(event = "agent.activation", agent_id = agent_id.0, active = active);
        }
        Ok(())
    }

    pub fn reputation_bps(&self, agent_id: AgentId) -> Result<u64> {
        Ok(self.get(agent_id)?.reputation_bps())
    }

    /// Agents currently owned by `owner`, in registration order.
    pub fn agents_by_owner(&self, owner: &AccountId) -> Vec<AgentId> {
        self.by_owner.get(owner).cloned().unwrap_or_default()
    }

    /// Every agent that has ever committed to `model_hash`.
    pub fn agents_by_model(&self, model_hash: &Hash32) -> Vec<AgentId> {
        self.by_model.get(model_hash).cloned().unwrap_or_default()
    }

    /// Agents whose current spec uses `model_hash`.
    pub fn current_agents_by_model(&self, model_hash: &Hash32) -> Vec<AgentId> {
        self.agents_by_model(model_hash)
            .into_iter()
            .filter(|id| {
                self.agents
                    .get(id)
                    .is_some_and(|agent| &agent.spec.model_hash == model_hash)
            })
            .collect()
    }

    /// Check a skill membership proof against the agent's committed root.
    pub fn verify_agent_skill(
        &self,
        agent_id: AgentId,
        skill: &Hash32,
        proof: &[Hash32],
    ) -> Result<bool> {
        let agent = self.get(agent_id)?;
        Ok(skill_tree::verify(&agent.spec.skills_root, skill, proof))
    }
}

impl AgentDirectory for InMemoryAgentDirectory {
    fn spec(&self, agent_id: AgentId) -> Result<AgentSpec> {
        Ok(self.get(agent_id)?.spec.clone())
    }

    fn owner(&self, agent_id: AgentId) -> Result<AccountId> {
        Ok(self.get(agent_id)?.owner.clone())
    }

    fn is_active(&self, agent_id: AgentId) -> Result<bool> {
        Ok(self.get(agent_id)?.active)
    }

    fn record_outcome(&mut self, agent_id: AgentId, success: bool) -> Result<()> {
        let agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or(ArbiterError::AgentNotFound(agent_id))?;
        agent.tasks_attempted = agent.tasks_attempted.saturating_add(1);
        if success {
            agent.tasks_succeeded = agent.tasks_succeeded.saturating_add(1);
        }
        Ok(())
    }

    fn revert_outcome(&mut self, agent_id: AgentId, success: bool) -> Result<()> {
        let agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or(ArbiterError::AgentNotFound(agent_id))?;
        agent.tasks_attempted = agent.tasks_attempted.saturating_sub(1);
        if success {
            agent.tasks_succeeded = agent.tasks_succeeded.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(model: &str) -> AgentSpec {
        AgentSpec::new(
            Hash32::digest(model.as_bytes()),
            Hash32::digest(b"cfg"),
            Hash32::digest(b"skills"),
            2048,
            0,
            100,
            7,
        )
        .unwrap()
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut dir = InMemoryAgentDirectory::new();
        let owner = AccountId::from("owner");
        let a = dir.register_agent(&owner, spec("m1"), "", Utc::now()).unwrap();
        let b = dir.register_agent(&owner, spec("m1"), "", Utc::now()).unwrap();
        assert_eq!(a, AgentId(1));
        assert_eq!(b, AgentId(2));
        assert_eq!(dir.agents_by_owner(&owner), vec![a, b]);
    }

    #[test]
    fn record_outcome_moves_reputation() {
        let mut dir = InMemoryAgentDirectory::new();
        let owner = AccountId::from("owner");
        let id = dir.register_agent(&owner, spec("m"), "", Utc::now()).unwrap();
        dir.record_outcome(id, true).unwrap();
        dir.record_outcome(id, false).unwrap();
        dir.record_outcome(id, true).unwrap();
        dir.record_outcome(id, true).unwrap();
        assert_eq!(dir.reputation_bps(id).unwrap(), 7_500);
    }

    #[test]
    fn revert_outcome_undoes_one_record() {
        let mut dir = InMemoryAgentDirectory::new();
        let owner = AccountId::from("owner");
        let id = dir.register_agent(&owner, spec("m"), "", Utc::now()).unwrap();
        dir.record_outcome(id, true).unwrap();
        dir.record_outcome(id, false).unwrap();
        dir.revert_outcome(id, false).unwrap();
        assert_eq!(dir.reputation_bps(id).unwrap(), 10_000);
        assert!(dir.revert_outcome(AgentId(99), true).is_err());
    }

    #[test]
    fn invalid_spec_is_rejected_without_consuming_an_id() {
        let mut dir = InMemoryAgentDirectory::new();
        let mut bad = spec("m");
        bad.max_tokens = 0;
        assert!(dir
            .register_agent(&AccountId::from("o"), bad, "", Utc::now())
            .is_err());
        let id = dir
            .register_agent(&AccountId::from("o"), spec("m"), "", Utc::now())
            .unwrap();
        assert_eq!(id, AgentId(1));
    }
}
