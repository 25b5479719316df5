//! Arbiter-State: value and artifact storage for Arbiter
//!
//! This crate is the persistence boundary of the verification engine. The
//! task lifecycle never touches balances or blobs directly; it goes through
//! the traits defined here.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: atomic value movement and content-addressed artifacts.
//!
//! ## Key Components
//!
//! - `ValueLedger`: account balances with all-or-nothing batch transfers
//! - `CasStore`: content-addressed task inputs and outputs
//! - `MemoryValueLedger` / `MemoryCasStore`: in-memory implementations
//! - `FsCasStore`: sharded on-disk artifact store

mod error;
pub mod fakes;
pub mod fs_cas;
pub mod storage_traits;

pub use error::StorageError;
pub use fakes::{MemoryCasStore, MemoryValueLedger};
pub use fs_cas::FsCasStore;
pub use storage_traits::{
    AccountId, Amount, CasStore, ContentDigest, Credit, StorageResult, ValueLedger,
};
