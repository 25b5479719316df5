//! Storage trait definitions for Arbiter
//!
//! These traits define the two storage abstractions the task ledger needs:
//! - `ValueLedger`: account balances with atomic batch transfers
//! - `CasStore`: content-addressed storage for task inputs and outputs
//!
//! `ValueLedger` is synchronous because every lifecycle transition is a
//! compute-then-commit step. `CasStore` is async since artifacts may live on
//! disk or behind a network service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Value in the ledger's native base unit.
pub type Amount = u128;

// ---------------------------------------------------------------------------
// ValueLedger: account balances
// ---------------------------------------------------------------------------

/// Identity of an account holding value (client, agent owner, treasury, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        AccountId(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// A single outbound payment inside a batch transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub to: AccountId,
    pub amount: Amount,
}

impl Credit {
    pub fn new(to: AccountId, amount: Amount) -> Self {
        Self { to, amount }
    }
}

/// Account balance ledger.
///
/// Guarantees:
/// - `transfer` and `transfer_batch` either apply completely or leave every
///   balance untouched.
/// - Value is only moved, never created, except through `deposit`.
pub trait ValueLedger: Send {
    /// Current balance of `account` (zero if never seen).
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Mint `amount` into `account`. Used for funding, not by the lifecycle.
    fn deposit(&mut self, account: &AccountId, amount: Amount) -> StorageResult<()>;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> StorageResult<()> {
        self.transfer_batch(from, &[Credit::new(to.clone(), amount)])
    }

    /// Pay every credit out of `from` as one atomic unit.
    fn transfer_batch(&mut self, from: &AccountId, credits: &[Credit]) -> StorageResult<()>;

    /// Sum of all balances. Constant across transfers.
    fn total_balance(&self) -> Amount;
}

// ---------------------------------------------------------------------------
// CasStore: content-addressed storage
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        ContentDigest(hex::encode(Sha256::digest(data)))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32-byte digest.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Infallible: the constructor guarantees 64 hex chars.
        if let Ok(bytes) = hex::decode(&self.0) {
            out.copy_from_slice(&bytes);
        }
        out
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-addressed blob store for task artifacts.
///
/// Guarantees:
/// - `put(data)` always returns the SHA-256 digest of `data`.
/// - `get(digest)` returns the exact bytes previously stored.
/// - Same content always yields the same digest (deduplication).
#[async_trait]
pub trait CasStore: Send + Sync {
    /// Store bytes and return their content digest.
    async fn put(&self, data: &[u8]) -> StorageResult<ContentDigest>;

    /// Retrieve bytes by digest. Returns `StorageError::NotFound` if absent.
    async fn get(&self, digest: &ContentDigest) -> StorageResult<Vec<u8>>;

    /// Check whether a digest exists in the store.
    async fn contains(&self, digest: &ContentDigest) -> StorageResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_try_from_lowercases() {
        let upper = "AB".repeat(32);
        let digest = ContentDigest::try_from(upper).unwrap();
        assert_eq!(digest.as_str(), "ab".repeat(32));
    }

    #[test]
    fn digest_try_from_rejects_short() {
        assert!(matches!(
            ContentDigest::try_from("abcd".to_string()),
            Err(StorageError::InvalidDigest { .. })
        ));
    }

    #[test]
    fn digest_to_bytes_matches_hex() {
        let digest = ContentDigest::from_bytes(b"input");
        assert_eq!(hex::encode(digest.to_bytes()), digest.as_str());
        assert_eq!(digest.short().len(), 12);
    }

    #[test]
    fn account_id_display_and_ordering() {
        let a = AccountId::from("alice");
        let b = AccountId::new("bob");
        assert_eq!(a.to_string(), "alice");
        assert!(a < b);
    }
}
