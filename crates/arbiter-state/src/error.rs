//! Error types for arbiter-state

use thiserror::Error;

use crate::storage_traits::{AccountId, Amount};

/// Errors raised by value ledgers and artifact stores.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Debit larger than the account balance
    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: Amount,
        required: Amount,
    },

    /// Credit would overflow the account balance
    #[error("balance overflow for {account}")]
    BalanceOverflow { account: AccountId },

    /// Account is frozen and cannot send or receive value
    #[error("account frozen: {account}")]
    AccountFrozen { account: AccountId },

    /// Artifact not present in the store
    #[error("artifact not found: {digest}")]
    NotFound { digest: String },

    /// Digest string is not 64 hex characters
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
