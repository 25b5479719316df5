//! Protocol parameters.
//!
//! Loaded from TOML; every field has a default so an empty file is a valid
//! configuration.
//!
//! ```toml
//! protocol_fee_bps = 500
//! default_challenge_window_secs = 86400
//! treasury = "treasury"
//! arbiters = ["dao-multisig"]
//! ```

use std::path::Path;

use arbiter_state::AccountId;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{ArbiterError, Result};

pub const BPS_DENOMINATOR: u128 = 10_000;
pub const PCT_DENOMINATOR: u128 = 100;

/// Upper bound for every deadline and window setting: one year.
pub const MAX_PERIOD_SECS: i64 = 365 * 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Minimum agent bond as a fraction of the fee, in basis points.
    pub min_bond_fee_bps: u32,

    /// Minimum challenger bond as a percentage of the agent bond.
    pub challenger_bond_multiplier_pct: u32,

    /// Protocol cut of the losing bond, in basis points.
    pub protocol_fee_bps: u32,

    /// Time allowed between bonding and publishing.
    pub execution_deadline_secs: i64,

    /// Challenge window when the agent has no override.
    pub default_challenge_window_secs: i64,

    /// Bounds for per-agent overrides.
    pub min_challenge_window_secs: i64,
    pub max_challenge_window_secs: i64,

    /// Receives protocol fees.
    pub treasury: AccountId,

    /// Holds all escrowed fees and bonds.
    pub escrow: AccountId,

    /// Accounts allowed to assert dispute verdicts.
    pub arbiters: Vec<AccountId>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            min_bond_fee_bps: 1_000,
            challenger_bond_multiplier_pct: 150,
            protocol_fee_bps: 500,
            execution_deadline_secs: 3_600,
            default_challenge_window_secs: 86_400,
            min_challenge_window_secs: 3_600,
            max_challenge_window_secs: 604_800,
            treasury: AccountId::from("treasury"),
            escrow: AccountId::from("escrow"),
            arbiters: Vec::new(),
        }
    }
}

impl ProtocolConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| ArbiterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ArbiterError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if u128::from(self.min_bond_fee_bps) > BPS_DENOMINATOR {
            return Err(ArbiterError::Config(
                "min_bond_fee_bps cannot exceed 10000".to_string(),
            ));
        }
        if u128::from(self.protocol_fee_bps) > BPS_DENOMINATOR {
            return Err(ArbiterError::Config(
                "protocol_fee_bps cannot exceed 10000".to_string(),
            ));
        }
        if self.challenger_bond_multiplier_pct < 100 {
            return Err(ArbiterError::Config(
                "challenger_bond_multiplier_pct must be at least 100".to_string(),
            ));
        }
        if self.execution_deadline_secs <= 0 || self.default_challenge_window_secs <= 0 {
            return Err(ArbiterError::Config(
                "deadlines must be positive".to_string(),
            ));
        }
        if self.min_challenge_window_secs <= 0
            || self.min_challenge_window_secs > self.max_challenge_window_secs
        {
            return Err(ArbiterError::Config(format!(
                "invalid challenge window bounds {}..={}",
                self.min_challenge_window_secs, self.max_challenge_window_secs
            )));
        }
        for (name, secs) in [
            ("execution_deadline_secs", self.execution_deadline_secs),
            ("default_challenge_window_secs", self.default_challenge_window_secs),
            ("max_challenge_window_secs", self.max_challenge_window_secs),
        ] {
            if secs > MAX_PERIOD_SECS {
                return Err(ArbiterError::Config(format!(
                    "{name} cannot exceed {MAX_PERIOD_SECS}"
                )));
            }
        }
        if self.treasury == self.escrow {
            return Err(ArbiterError::Config(
                "treasury and escrow must be distinct accounts".to_string(),
            ));
        }
        Ok(())
    }

    pub fn execution_deadline(&self) -> Result<Duration> {
        period(self.execution_deadline_secs, "execution deadline")
    }

    pub fn default_challenge_window(&self) -> Result<Duration> {
        period(self.default_challenge_window_secs, "challenge window")
    }

    pub fn is_arbiter(&self, account: &AccountId) -> bool {
        self.arbiters.contains(account)
    }
}

/// Seconds as a `Duration`, rejecting values chrono cannot represent.
pub(crate) fn period(secs: i64, what: &'static str) -> Result<Duration> {
    Duration::try_seconds(secs).ok_or(ArbiterError::Overflow(what))
}
