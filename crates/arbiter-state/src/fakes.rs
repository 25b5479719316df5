//! In-memory implementations of the storage traits
//!
//! `MemoryValueLedger` backs tests and the CLI's JSON world file;
//! `MemoryCasStore` is for tests only.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryValueLedger
// ---------------------------------------------------------------------------

/// In-memory balance table backed by a `BTreeMap<AccountId, Amount>`.
///
/// Frozen accounts reject both debits and credits, which lets tests force a
/// transfer failure in the middle of a settlement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryValueLedger {
    balances: BTreeMap<AccountId, Amount>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    frozen: BTreeSet<AccountId>,
}

impl MemoryValueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block all value movement into and out of `account`.
    pub fn freeze(&mut self, account: &AccountId) {
        self.frozen.insert(account.clone());
    }

    pub fn unfreeze(&mut self, account: &AccountId) {
        self.frozen.remove(account);
    }

    /// Non-zero balances in account order.
    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(id, amount)| (id, *amount))
    }

    fn ensure_not_frozen(&self, account: &AccountId) -> StorageResult<()> {
        if self.frozen.contains(account) {
            return Err(StorageError::AccountFrozen {
                account: account.clone(),
            });
        }
        Ok(())
    }
}

impl ValueLedger for MemoryValueLedger {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn deposit(&mut self, account: &AccountId, amount: Amount) -> StorageResult<()> {
        self.ensure_not_frozen(account)?;
        let current = self.balance_of(account);
        let next = current
            .checked_add(amount)
            .ok_or_else(|| StorageError::BalanceOverflow {
                account: account.clone(),
            })?;
        self.balances.insert(account.clone(), next);
        Ok(())
    }

    fn transfer_batch(&mut self, from: &AccountId, credits: &[Credit]) -> StorageResult<()> {
        self.ensure_not_frozen(from)?;

        let total = credits
            .iter()
            .try_fold(0u128, |acc, credit| acc.checked_add(credit.amount))
            .ok_or_else(|| StorageError::BalanceOverflow {
                account: from.clone(),
            })?;
        let balance = self.balance_of(from);
        if balance < total {
            return Err(StorageError::InsufficientFunds {
                account: from.clone(),
                balance,
                required: total,
            });
        }

        // Stage every touched account, then commit in one pass.
        let mut staged: BTreeMap<AccountId, Amount> = BTreeMap::new();
        staged.insert(from.clone(), balance - total);
        for credit in credits {
            self.ensure_not_frozen(&credit.to)?;
            let current = staged
                .get(&credit.to)
                .copied()
                .unwrap_or_else(|| self.balance_of(&credit.to));
            let next = current.checked_add(credit.amount).ok_or_else(|| {
                StorageError::BalanceOverflow {
                    account: credit.to.clone(),
                }
            })?;
            staged.insert(credit.to.clone(), next);
        }

        self.balances.extend(staged);
        tracing::trace!(from = %from, credits = credits.len(), total = %total, "batch transfer applied");
        Ok(())
    }

    fn total_balance(&self) -> Amount {
        self.balances
            .values()
            .fold(0u128, |acc, amount| acc.saturating_add(*amount))
    }
}

// ---------------------------------------------------------------------------
// MemoryCasStore
// ---------------------------------------------------------------------------

/// In-memory content-addressed store backed by a `HashMap<digest, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryCasStore {
    store: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CasStore for MemoryCasStore {
    async fn put(&self, data: &[u8]) -> StorageResult<ContentDigest> {
        let digest = ContentDigest::from_bytes(data);
        self.objects()
            .entry(digest.as_str().to_string())
            .or_insert_with(|| data.to_vec());
        Ok(digest)
    }

    async fn get(&self, digest: &ContentDigest) -> StorageResult<Vec<u8>> {
        self.objects()
            .get(digest.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                digest: digest.as_str().to_string(),
            })
    }

    async fn contains(&self, digest: &ContentDigest) -> StorageResult<bool> {
        Ok(self.objects().contains_key(digest.as_str()))
    }
}
