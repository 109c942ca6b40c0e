//! Ledger facade
//!
//! Single entry point owning every component. All write paths to accounts
//! run through this type; the choice between the cached and the direct path
//! belongs to the caller and is never switched silently. External callers
//! hold the [`EconomyApi`] trait rather than the concrete type, so thin
//! host-facing modules carry no compile-time dependency on the wiring.

use crate::accounts::AccountStore;
use crate::audit::AuditWriter;
use crate::backup::BackupEngine;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::AsyncExecutor;
use crate::hooks::{HookBus, PostChangeHook, PreChangeHook};
use crate::metrics::Metrics;
use crate::registry::CurrencyRegistry;
use crate::store::Database;
use crate::types::{
    Account, AccountView, Currency, EconomyResponse, SnapshotInfo, TransactionRecord,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Programmatic interface held by external collaborators
///
/// The `*_direct` variants share signatures with their cached counterparts
/// and differ only in path: they bypass the balance cache and linearize on
/// the store's version column.
#[async_trait]
pub trait EconomyApi: Send + Sync {
    /// Cached balance lookup
    async fn get_balance(&self, player: &str, currency: &str) -> Result<Decimal>;

    /// Persisted balance lookup
    async fn get_balance_direct(&self, player: &str, currency: &str) -> Result<Decimal>;

    /// All persisted accounts of one player
    async fn list_accounts(&self, player: &str) -> Result<Vec<AccountView>>;

    /// Credit through the cache
    async fn deposit(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse;

    /// Debit through the cache
    async fn withdraw(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse;

    /// Overwrite through the cache
    async fn set_balance(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse;

    /// Credit against persistence
    async fn deposit_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse;

    /// Debit against persistence
    async fn withdraw_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse;

    /// Overwrite against persistence
    async fn set_balance_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse;

    /// Persist a per-account cap override
    async fn set_max_balance(&self, player: &str, currency: &str, max: i64) -> Result<()>;

    /// Whether the durable store is online with a synchronized schema
    fn is_ready(&self) -> bool;
}

/// The long-lived economy core instance
pub struct Ledger {
    config: Config,
    db: Arc<Database>,
    registry: Arc<CurrencyRegistry>,
    audit: Arc<AuditWriter>,
    accounts: Arc<AccountStore>,
    backup: Arc<BackupEngine>,
    executor: Arc<AsyncExecutor>,
    hooks: Arc<HookBus>,
    metrics: Metrics,
}

impl Ledger {
    /// Open the store, synchronize the schema, and wire every component
    ///
    /// A persistence failure here is fatal: the core never reaches the
    /// ready state.
    pub async fn open(config: Config) -> Result<Self> {
        let db = Arc::new(Database::connect(&config.database).await?);
        db.sync_schema().await?;

        let metrics =
            Metrics::new().map_err(|err| Error::Internal(format!("metrics registry: {err}")))?;

        let registry = Arc::new(CurrencyRegistry::new(
            db.clone(),
            config.default_currency.clone(),
        ));
        registry.init().await?;

        let executor = Arc::new(AsyncExecutor::start(
            config.executor.queue_capacity,
            config.executor.workers,
        ));
        let hooks = Arc::new(HookBus::new());
        let audit = Arc::new(AuditWriter::new(db.clone(), metrics.clone()));
        let accounts = Arc::new(AccountStore::new(
            db.clone(),
            registry.clone(),
            audit.clone(),
            executor.clone(),
            hooks.clone(),
            metrics.clone(),
            config.rounding_mode,
        ));
        let backup = Arc::new(BackupEngine::new(
            db.clone(),
            registry.clone(),
            audit.clone(),
            accounts.clone(),
            metrics.clone(),
            config.backup.max_snapshots,
        ));

        info!("economy core ready (datasource {})", config.database.url);
        Ok(Self {
            config,
            db,
            registry,
            audit,
            accounts,
            backup,
            executor,
            hooks,
            metrics,
        })
    }

    /// Whether the durable store is online with a synchronized schema
    pub fn is_ready(&self) -> bool {
        self.db.is_ready()
    }

    /// Metrics collector for scraping
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register a cancellable pre-change subscriber
    pub fn subscribe_pre(&self, hook: Arc<dyn PreChangeHook>) {
        self.hooks.subscribe_pre(hook);
    }

    /// Register a post-change subscriber
    pub fn subscribe_post(&self, hook: Arc<dyn PostChangeHook>) {
        self.hooks.subscribe_post(hook);
    }

    /// Wait for pending write-behind work to complete
    pub async fn flush(&self) -> bool {
        self.executor
            .drain(Duration::from_secs(self.config.executor.shutdown_wait_secs))
            .await
    }

    /// Stop accepting async work, drain within the configured wait, close
    /// the store
    pub async fn shutdown(&self) -> Result<()> {
        self.executor.shutdown();
        let drained = self
            .executor
            .drain(Duration::from_secs(self.config.executor.shutdown_wait_secs))
            .await;
        if !drained {
            warn!("shutdown wait elapsed with persist tasks still pending");
        }
        self.db.close().await;
        Ok(())
    }

    // =========================================================================
    // CURRENCY ADMINISTRATION
    // =========================================================================

    /// Create a currency definition
    pub async fn create_currency(
        &self,
        identifier: &str,
        name: &str,
        precision: i32,
        symbol: &str,
        default_max_balance: i64,
        console_log: bool,
    ) -> Result<Currency> {
        self.registry
            .create(identifier, name, precision, symbol, default_max_balance, console_log)
            .await
    }

    /// Soft-delete a currency; its identifier stays reserved
    pub async fn delete_currency(&self, identifier: &str) -> Result<()> {
        self.registry.delete(identifier).await
    }

    /// Enable a currency for deposits and withdrawals
    pub async fn enable_currency(&self, identifier: &str) -> Result<()> {
        self.registry.set_enabled(identifier, true).await
    }

    /// Disable a currency for deposits and withdrawals
    pub async fn disable_currency(&self, identifier: &str) -> Result<()> {
        self.registry.set_enabled(identifier, false).await
    }

    /// Move the primary flag onto one currency
    pub async fn set_primary_currency(&self, identifier: &str) -> Result<()> {
        self.registry.set_primary(identifier).await
    }

    /// Update display name, symbol, cap and console flag
    pub async fn update_currency(
        &self,
        identifier: &str,
        name: &str,
        symbol: &str,
        default_max_balance: i64,
        console_log: bool,
    ) -> Result<Currency> {
        self.registry
            .update_definition(identifier, name, symbol, default_max_balance, console_log)
            .await
    }

    /// Case-insensitive currency lookup
    pub async fn get_currency(&self, identifier: &str) -> Option<Currency> {
        self.registry.get_by_identifier(identifier).await
    }

    /// The currency the external single-currency bridge uses by default
    pub async fn primary_currency(&self) -> Option<Currency> {
        self.registry.get_primary().await
    }

    /// All non-deleted currencies
    pub async fn list_currencies(&self) -> Vec<Currency> {
        self.registry.list_active().await
    }

    /// All enabled currencies
    pub async fn list_enabled_currencies(&self) -> Vec<Currency> {
        self.registry.list_enabled().await
    }

    /// Identifiers of enabled currencies
    pub async fn enabled_currency_identifiers(&self) -> Vec<String> {
        self.registry.enabled_identifiers().await
    }

    /// Every account row held in one currency
    pub async fn list_currency_accounts(&self, currency: &str) -> Result<Vec<Account>> {
        let currency = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(currency.to_string()))?;
        self.db.accounts_by_currency(currency.id).await
    }

    // =========================================================================
    // AUDIT QUERIES
    // =========================================================================

    /// Page of a player's audit records, newest first; pages start at 1
    pub async fn transaction_logs(
        &self,
        player: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TransactionRecord>> {
        self.audit.logs_for_player(player, page, page_size).await
    }

    /// Page of a player's audit records for one currency, newest first
    pub async fn transaction_logs_for_currency(
        &self,
        player: &str,
        currency: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TransactionRecord>> {
        let currency = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(currency.to_string()))?;
        self.audit
            .logs_for_player_currency(player, currency.id, page, page_size)
            .await
    }

    /// Total audit records for one player
    pub async fn count_transaction_logs(&self, player: &str) -> Result<i64> {
        self.audit.count_for_player(player).await
    }

    /// Total audit records for one (player, currency) pair
    pub async fn count_transaction_logs_for_currency(
        &self,
        player: &str,
        currency: &str,
    ) -> Result<i64> {
        let currency = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(currency.to_string()))?;
        self.audit.count_for_player_currency(player, currency.id).await
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Capture every account under a fresh batch id
    pub async fn create_snapshot(&self, memo: &str) -> Result<SnapshotInfo> {
        self.backup.create_snapshot(memo).await
    }

    /// One summary per distinct batch, newest first
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        self.backup.list().await
    }

    /// Restore every account of one batch
    pub async fn rollback(&self, snapshot_id: &str) -> Result<u64> {
        self.backup.rollback(snapshot_id).await
    }

    /// Restore one player's accounts of one batch
    pub async fn rollback_player(&self, snapshot_id: &str, player: &str) -> Result<u64> {
        self.backup.rollback_player(snapshot_id, player).await
    }

    // =========================================================================
    // CACHE LIFECYCLE
    // =========================================================================

    /// Populate cache entries for a player joining this node
    pub async fn load_player(&self, player: &str, uuid: &str) -> Result<()> {
        self.accounts.load_player_balances(player, uuid).await
    }

    /// Drop a departing player's cache entries
    pub fn unload_player(&self, player: &str) {
        self.accounts.unload_player(player);
    }

    /// Empty the balance cache
    pub fn clear_cache(&self) {
        self.accounts.clear_cache();
    }

    /// One player's cache entries
    pub async fn list_accounts_cached(&self, player: &str) -> Vec<AccountView> {
        self.accounts.list_accounts_cached(player).await
    }
}

#[async_trait]
impl EconomyApi for Ledger {
    async fn get_balance(&self, player: &str, currency: &str) -> Result<Decimal> {
        self.accounts.balance(player, currency).await
    }

    async fn get_balance_direct(&self, player: &str, currency: &str) -> Result<Decimal> {
        self.accounts.balance_direct(player, currency).await
    }

    async fn list_accounts(&self, player: &str) -> Result<Vec<AccountView>> {
        self.accounts.list_accounts(player).await
    }

    async fn deposit(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.accounts
            .deposit(player, uuid, currency, amount, reason, operator)
            .await
    }

    async fn withdraw(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.accounts
            .withdraw(player, uuid, currency, amount, reason, operator)
            .await
    }

    async fn set_balance(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.accounts
            .set_balance(player, uuid, currency, amount, reason, operator)
            .await
    }

    async fn deposit_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.accounts
            .deposit_direct(player, uuid, currency, amount, reason, operator)
            .await
    }

    async fn withdraw_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.accounts
            .withdraw_direct(player, uuid, currency, amount, reason, operator)
            .await
    }

    async fn set_balance_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.accounts
            .set_balance_direct(player, uuid, currency, amount, reason, operator)
            .await
    }

    async fn set_max_balance(&self, player: &str, currency: &str, max: i64) -> Result<()> {
        self.accounts.set_max_balance(player, currency, max).await
    }

    fn is_ready(&self) -> bool {
        Ledger::is_ready(self)
    }
}
