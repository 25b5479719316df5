//! On-disk world state for the CLI.
//!
//! Layout under the state directory:
//!
//! ```text
//! .arbiter/
//!   state.json     config, balances, agent registry, task ledger
//!   cas/objects/   task artifacts (FsCasStore)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arbiter_core::{Clock, InMemoryAgentDirectory, LedgerState, ProtocolConfig, TaskLedger};
use arbiter_state::{FsCasStore, MemoryValueLedger};
use serde::{Deserialize, Serialize};

pub type CliLedger = TaskLedger<MemoryValueLedger, InMemoryAgentDirectory, Arc<dyn Clock>>;

const STATE_FILE: &str = "state.json";
const CAS_DIR: &str = "cas";

/// Everything persisted between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    pub format_version: u32,
    pub config: ProtocolConfig,
    pub balances: MemoryValueLedger,
    pub directory: InMemoryAgentDirectory,
    pub ledger: LedgerState,
}

impl World {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            config,
            ..Self::default()
        }
    }

    pub fn into_ledger(self, clock: Arc<dyn Clock>) -> Result<CliLedger> {
        TaskLedger::with_state(self.config, self.balances, self.directory, clock, self.ledger)
            .context("Invalid protocol configuration in state file")
    }

    pub fn from_ledger(ledger: CliLedger) -> Self {
        let config = ledger.config().clone();
        let (balances, directory, state) = ledger.into_parts();
        Self {
            format_version: Self::FORMAT_VERSION,
            config,
            balances,
            directory,
            ledger: state,
        }
    }
}

/// Handle on a state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    pub fn init(&self, config: ProtocolConfig, force: bool) -> Result<()> {
        if self.exists() && !force {
            bail!(
                "State already initialized at {} (use --force to reset)",
                self.root.display()
            );
        }
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        self.save(&World::new(config))
    }

    pub fn load(&self) -> Result<World> {
        let path = self.state_path();
        if !path.exists() {
            bail!(
                "No state at {}; run `arbiter init` first",
                self.root.display()
            );
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let world: World = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if world.format_version != World::FORMAT_VERSION {
            bail!(
                "Unsupported state format {} (expected {})",
                world.format_version,
                World::FORMAT_VERSION
            );
        }
        Ok(world)
    }

    /// Write via a temp file and rename so a crash never leaves half a file.
    pub fn save(&self, world: &World) -> Result<()> {
        let path = self.state_path();
        let tmp = self.root.join(format!("{STATE_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(world)?;
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub async fn cas(&self) -> Result<FsCasStore> {
        FsCasStore::open(self.root.join(CAS_DIR))
            .await
            .context("Failed to open artifact store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{AccountId, SystemClock, ValueLedger};

    #[test]
    fn init_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateDir::new(dir.path().join(".arbiter"));
        store.init(ProtocolConfig::default(), false).unwrap();
        assert!(store.init(ProtocolConfig::default(), false).is_err());
        store.init(ProtocolConfig::default(), true).unwrap();

        let mut world = store.load().unwrap();
        world
            .balances
            .deposit(&AccountId::from("alice"), 5)
            .unwrap();
        store.save(&world).unwrap();

        let ledger = store
            .load()
            .unwrap()
            .into_ledger(Arc::new(SystemClock))
            .unwrap();
        assert_eq!(ledger.value().balance_of(&AccountId::from("alice")), 5);
    }

    #[test]
    fn load_without_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = StateDir::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("arbiter init"));
    }
}
