//! Trait contract tests for ValueLedger and CasStore.
//!
//! These tests verify the behavioral contracts of the storage traits.
//! Any conforming implementation must pass these.

use arbiter_state::fakes::{MemoryCasStore, MemoryValueLedger};
use arbiter_state::storage_traits::*;
use arbiter_state::{FsCasStore, StorageError};

fn acct(s: &str) -> AccountId {
    AccountId::from(s)
}

// ===========================================================================
// ValueLedger contract tests
// ===========================================================================

#[test]
fn ledger_unknown_account_has_zero_balance() {
    let ledger = MemoryValueLedger::new();
    assert_eq!(ledger.balance_of(&acct("nobody")), 0);
}

#[test]
fn ledger_deposit_then_transfer() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("alice"), 500).unwrap();
    ledger.transfer(&acct("alice"), &acct("bob"), 200).unwrap();

    assert_eq!(ledger.balance_of(&acct("alice")), 300);
    assert_eq!(ledger.balance_of(&acct("bob")), 200);
}

#[test]
fn ledger_transfer_rejects_overdraft() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("alice"), 10).unwrap();
    let err = ledger
        .transfer(&acct("alice"), &acct("bob"), 11)
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::InsufficientFunds {
            balance: 10,
            required: 11,
            ..
        }
    ));
    assert_eq!(ledger.balance_of(&acct("alice")), 10);
    assert_eq!(ledger.balance_of(&acct("bob")), 0);
}

#[test]
fn ledger_batch_is_all_or_nothing_on_frozen_recipient() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("escrow"), 100).unwrap();
    ledger.freeze(&acct("treasury"));

    let err = ledger
        .transfer_batch(
            &acct("escrow"),
            &[
                Credit::new(acct("agent"), 90),
                Credit::new(acct("treasury"), 10),
            ],
        )
        .unwrap_err();

    assert!(matches!(err, StorageError::AccountFrozen { .. }));
    assert_eq!(ledger.balance_of(&acct("escrow")), 100);
    assert_eq!(ledger.balance_of(&acct("agent")), 0);
}

#[test]
fn ledger_batch_preserves_total_balance() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("escrow"), 1_000).unwrap();
    ledger.deposit(&acct("client"), 7).unwrap();
    let before = ledger.total_balance();

    ledger
        .transfer_batch(
            &acct("escrow"),
            &[
                Credit::new(acct("agent"), 925),
                Credit::new(acct("treasury"), 75),
            ],
        )
        .unwrap();

    assert_eq!(ledger.total_balance(), before);
    assert_eq!(ledger.balance_of(&acct("escrow")), 0);
}

#[test]
fn ledger_deposit_overflow_is_rejected() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("whale"), u128::MAX).unwrap();
    let err = ledger.deposit(&acct("whale"), 1).unwrap_err();
    assert!(matches!(err, StorageError::BalanceOverflow { .. }));
}

#[test]
fn ledger_frozen_sender_cannot_pay() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("alice"), 10).unwrap();
    ledger.freeze(&acct("alice"));
    assert!(ledger.transfer(&acct("alice"), &acct("bob"), 1).is_err());

    ledger.unfreeze(&acct("alice"));
    ledger.transfer(&acct("alice"), &acct("bob"), 1).unwrap();
    assert_eq!(ledger.balance_of(&acct("bob")), 1);
}

#[test]
fn ledger_empty_batch_is_noop() {
    let mut ledger = MemoryValueLedger::new();
    ledger.deposit(&acct("escrow"), 3).unwrap();
    ledger.transfer_batch(&acct("escrow"), &[]).unwrap();
    assert_eq!(ledger.balance_of(&acct("escrow")), 3);
}

// ===========================================================================
// CasStore contract tests
// ===========================================================================

async fn check_cas_contract(store: &dyn CasStore) {
    let data = b"task input payload";
    let digest = store.put(data).await.unwrap();
    assert_eq!(digest, ContentDigest::from_bytes(data));
    assert_eq!(store.get(&digest).await.unwrap(), data);
    assert!(store.contains(&digest).await.unwrap());

    let again = store.put(data).await.unwrap();
    assert_eq!(digest, again);

    let other = store.put(b"different payload").await.unwrap();
    assert_ne!(digest, other);

    let bogus = ContentDigest::from_bytes(b"never stored");
    assert!(!store.contains(&bogus).await.unwrap());
    let err = store.get(&bogus).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn memory_cas_satisfies_contract() {
    let store = MemoryCasStore::new();
    check_cas_contract(&store).await;
}

#[tokio::test]
async fn fs_cas_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsCasStore::open(dir.path()).await.unwrap();
    check_cas_contract(&store).await;
}

#[tokio::test]
async fn fs_cas_empty_blob_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsCasStore::open(dir.path()).await.unwrap();
    let digest = store.put(b"").await.unwrap();
    assert_eq!(store.get(&digest).await.unwrap(), b"");
}
