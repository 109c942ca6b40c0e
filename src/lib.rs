//! Economy Core
//!
//! Transactional ledger core of a multi-currency virtual economy: player
//! balances across concurrently defined currencies, debit/credit/set
//! mutations with concurrency-safe semantics, an append-only audit trail,
//! and full-state snapshots with point-in-time rollback.
//!
//! # Architecture
//!
//! - **Write-behind cache**: the cached mutation path answers from a
//!   concurrent in-memory map and persists asynchronously
//! - **Optimistic concurrency**: every persisted account update carries a
//!   version; the direct path retries a bounded number of times
//! - **Append-only audit**: one record per committed mutation, never
//!   updated or deleted
//! - **Snapshot/rollback**: batched full-state copies restored through
//!   forced, still-versioned updates
//!
//! # Invariants
//!
//! - Persisted balances never go negative
//! - Audit arithmetic is internally consistent per record
//! - At most one non-deleted currency is primary at any instant
//! - Soft-deleted identifiers are reserved forever

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod accounts;
pub mod audit;
pub mod backup;
pub mod config;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod registry;
pub mod store;
pub mod types;

// Re-exports
pub use accounts::AccountStore;
pub use audit::AuditWriter;
pub use backup::BackupEngine;
pub use config::{Config, RoundingMode};
pub use error::{Error, Result};
pub use executor::{AsyncExecutor, TaskHandle};
pub use hooks::{HookBus, PostChangeHook, PreChangeEvent, PreChangeHook};
pub use ledger::{EconomyApi, Ledger};
pub use metrics::Metrics;
pub use registry::CurrencyRegistry;
pub use store::Database;
pub use types::{
    Account, AccountView, BackupRow, BalanceChange, Currency, EconomyResponse, FailureKind,
    SnapshotInfo, TransactionRecord, TxKind,
};
