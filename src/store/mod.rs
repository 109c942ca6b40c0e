//! Persistence layer
//!
//! Typed repositories over the four ledger tables, implemented on sqlx with
//! an embedded SQLite store. SQLite is the single logical writer the core
//! assumes; balances are stored as exact decimal text to avoid floating
//! point. Every repository operation gates on readiness: the flag is set
//! only after schema sync commits, and cleared again on close.

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

mod accounts;
mod audit;
mod currencies;
mod snapshots;

pub use accounts::MAX_VERSION_RETRIES;

/// Schema sync statements, applied in order inside one transaction
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS currency (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        identifier TEXT NOT NULL,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        precision INTEGER NOT NULL,
        default_max_balance INTEGER NOT NULL DEFAULT -1,
        is_primary INTEGER NOT NULL DEFAULT 0,
        enabled INTEGER NOT NULL DEFAULT 1,
        deleted INTEGER NOT NULL DEFAULT 0,
        console_log INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // deleted identifiers stay reserved, so uniqueness spans deleted rows too
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_currency_identifier ON currency (identifier)"#,
    r#"
    CREATE TABLE IF NOT EXISTS account (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_uuid TEXT NOT NULL DEFAULT '',
        player_name TEXT NOT NULL,
        currency_id INTEGER NOT NULL,
        balance TEXT NOT NULL,
        max_balance INTEGER NOT NULL DEFAULT -1,
        version INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (player_name, currency_id)
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_account_currency ON account (currency_id)"#,
    r#"
    CREATE TABLE IF NOT EXISTS transaction_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_uuid TEXT NOT NULL DEFAULT '',
        player_name TEXT NOT NULL,
        currency_id INTEGER NOT NULL,
        type TEXT NOT NULL,
        amount TEXT NOT NULL,
        balance_before TEXT NOT NULL,
        balance_after TEXT NOT NULL,
        reason TEXT NOT NULL,
        operator TEXT NOT NULL,
        occurred_at TEXT NOT NULL
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_txlog_player_currency ON transaction_log (player_name, currency_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_txlog_occurred ON transaction_log (occurred_at)"#,
    r#"
    CREATE TABLE IF NOT EXISTS backup_snapshot (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id TEXT NOT NULL,
        player_uuid TEXT NOT NULL DEFAULT '',
        player_name TEXT NOT NULL,
        currency_id INTEGER NOT NULL,
        balance TEXT NOT NULL,
        memo TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_backup_snapshot_id ON backup_snapshot (snapshot_id)"#,
];

/// Durable store handle: connection pool plus readiness gate
pub struct Database {
    pool: SqlitePool,
    ready: AtomicBool,
}

impl Database {
    /// Open the connection pool; the store is not ready until
    /// [`Database::sync_schema`] has run
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(Error::Database)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Ok(Database {
            pool,
            ready: AtomicBool::new(false),
        })
    }

    /// Run code-first schema sync in one transaction and mark the store ready
    pub async fn sync_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        self.ready.store(true, Ordering::SeqCst);
        info!("schema synchronized, store is ready");
        Ok(())
    }

    /// Whether the store is online with a synchronized schema
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool; the store reports not-ready afterwards
    pub async fn close(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.pool.close().await;
    }
}

/// Decode a decimal stored as text
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).map_err(Error::from)
}
