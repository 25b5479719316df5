//! Agent specification and registry record.

use arbiter_state::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::commitment::Hash32;
use super::error::{ArbiterError, Result};

/// Upper bound for `temperature` and `top_p` (fixed-point 1.00).
pub const MAX_SAMPLING_PARAM: u8 = 100;

/// Registry identifier; allocated from 1 upward and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Deterministic execution commitment for an agent.
///
/// Replaced wholesale on update, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Content identifier of the model weights.
    pub model_hash: Hash32,

    /// Content identifier of the full inference configuration.
    pub config_hash: Hash32,

    /// Merkle root over the committed skill set.
    pub skills_root: Hash32,

    /// Output token bound.
    pub max_tokens: u32,

    /// Sampling temperature in hundredths (0..=100).
    pub temperature: u8,

    /// Nucleus sampling mass in hundredths (0..=100).
    pub top_p: u8,

    /// Seed used when `temperature > 0`.
    pub random_seed: u64,
}

impl AgentSpec {
    /// Build a spec and check its invariants.
    pub fn new(
        model_hash: Hash32,
        config_hash: Hash32,
        skills_root: Hash32,
        max_tokens: u32,
        temperature: u8,
        top_p: u8,
        random_seed: u64,
    ) -> Result<Self> {
        let spec = Self {
            model_hash,
            config_hash,
            skills_root,
            max_tokens,
            temperature,
            top_p,
            random_seed,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_hash.is_zero() {
            return Err(ArbiterError::InvalidAgentSpec(
                "model_hash cannot be zero".to_string(),
            ));
        }
        if self.skills_root.is_zero() {
            return Err(ArbiterError::InvalidAgentSpec(
                "skills_root cannot be zero".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ArbiterError::InvalidAgentSpec(
                "max_tokens must be positive".to_string(),
            ));
        }
        if self.temperature > MAX_SAMPLING_PARAM {
            return Err(ArbiterError::InvalidAgentSpec(format!(
                "temperature {} exceeds {MAX_SAMPLING_PARAM}",
                self.temperature
            )));
        }
        if self.top_p > MAX_SAMPLING_PARAM {
            return Err(ArbiterError::InvalidAgentSpec(format!(
                "top_p {} exceeds {MAX_SAMPLING_PARAM}",
                self.top_p
            )));
        }
        Ok(())
    }

    /// Greedy decoding ignores the seed.
    pub fn effective_seed(&self) -> Option<u64> {
        (self.temperature > 0).then_some(self.random_seed)
    }

    /// Digest over the fixed big-endian layout of every field.
    pub fn digest(&self) -> Hash32 {
        let mut buf = Vec::with_capacity(32 * 3 + 4 + 1 + 1 + 8);
        buf.extend_from_slice(self.model_hash.as_bytes());
        buf.extend_from_slice(self.config_hash.as_bytes());
        buf.extend_from_slice(self.skills_root.as_bytes());
        buf.extend_from_slice(&self.max_tokens.to_be_bytes());
        buf.push(self.temperature);
        buf.push(self.top_p);
        buf.extend_from_slice(&self.random_seed.to_be_bytes());
        Hash32::digest(&buf)
    }
}

/// Registry record for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub owner: AccountId,
    pub spec: AgentSpec,
    pub metadata_uri: String,
    pub tasks_attempted: u64,
    /// Tasks not lost to a challenger.
    pub tasks_succeeded: u64,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Success ratio in basis points; 5000 before any task completes.
    pub fn reputation_bps(&self) -> u64 {
        if self.tasks_attempted == 0 {
            return 5_000;
        }
        self.tasks_succeeded.saturating_mul(10_000) / self.tasks_attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> AgentSpec {
        AgentSpec::new(
            Hash32::digest(b"llama-3-8b"),
            Hash32::digest(b"config"),
            Hash32::digest(b"skills"),
            4096,
            0,
            100,
            42,
        )
        .expect("valid spec")
    }

    #[test]
    fn test_rejects_zero_model_hash() {
        let result = AgentSpec::new(Hash32::ZERO, Hash32::ZERO, Hash32::digest(b"s"), 1, 0, 0, 0);
        assert!(matches!(result, Err(ArbiterError::InvalidAgentSpec(_))));
    }

    #[test]
    fn test_rejects_zero_skills_root() {
        let result = AgentSpec::new(Hash32::digest(b"m"), Hash32::ZERO, Hash32::ZERO, 1, 0, 0, 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_out_of_range_sampling() {
        let mut spec = sample_spec();
        spec.temperature = 101;
        assert!(spec.validate().is_err());

        let mut spec = sample_spec();
        spec.top_p = 101;
        assert!(spec.validate().is_err());

        let mut spec = sample_spec();
        spec.max_tokens = 0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_seed_only_meaningful_when_sampling() {
        let mut spec = sample_spec();
        assert_eq!(spec.effective_seed(), None);
        spec.temperature = 70;
        assert_eq!(spec.effective_seed(), Some(42));
    }

    #[test]
    fn test_digest_changes_on_any_field() {
        let base = sample_spec();
        let mut other = base.clone();
        other.random_seed = 43;
        assert_ne!(base.digest(), other.digest());
        assert_eq!(base.digest(), sample_spec().digest());
    }

    #[test]
    fn test_reputation_defaults_to_half() {
        let now = Utc::now();
        let mut agent = Agent {
            id: AgentId(1),
            owner: AccountId::from("owner"),
            spec: sample_spec(),
            metadata_uri: String::new(),
            tasks_attempted: 0,
            tasks_succeeded: 0,
            active: true,
            registered_at: now,
            updated_at: now,
        };
        assert_eq!(agent.reputation_bps(), 5_000);

        agent.tasks_attempted = 3;
        agent.tasks_succeeded = 2;
        assert_eq!(agent.reputation_bps(), 6_666);
    }
}
