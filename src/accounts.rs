//! Account store and balance cache
//!
//! The cache is a concurrent map from (player, currency id) to the scaled
//! balance and nothing else: caps and versions live only in persistence.
//! Two mutation paths exist. The cached path answers from memory and
//! persists write-behind through the async executor; a version conflict on
//! that persist resyncs the cache entry from the store, any other persist
//! failure rolls the entry back to its pre-mutation balance. The direct
//! path bypasses the cache and runs a bounded optimistic-retry loop against
//! the version column, recomputing from the persisted balance on every
//! attempt.
//!
//! Each cache key owns one async mutex. The cached mutation section (read
//! the balance, offer the pre-change event, commit the cache write) and the
//! write-behind persist both serialize on it, so cached mutations linearize
//! per key with no lost updates, and the store converges on the final
//! cached balance no matter how the worker pool schedules persist jobs.
//! The mutex is not a cache-entry lock: no DashMap shard guard is ever held
//! while hook subscribers run.
//!
//! Hooks wrap both paths: a cancellable pre-change event gates the
//! mutation, a post-change event follows the committed persist. No cache
//! lock is held while hook subscribers run.

use crate::audit::AuditWriter;
use crate::config::RoundingMode;
use crate::error::{Error, Result};
use crate::executor::AsyncExecutor;
use crate::hooks::HookBus;
use crate::metrics::Metrics;
use crate::money;
use crate::registry::CurrencyRegistry;
use crate::store::{Database, MAX_VERSION_RETRIES};
use crate::types::{AccountView, BalanceChange, Currency, EconomyResponse, FailureKind, TxKind};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

type CacheKey = (String, i64);

/// Per-(player, currency) balance cache with write-behind persistence
pub struct AccountStore {
    db: Arc<Database>,
    registry: Arc<CurrencyRegistry>,
    audit: Arc<AuditWriter>,
    executor: Arc<AsyncExecutor>,
    hooks: Arc<HookBus>,
    metrics: Metrics,
    rounding: RoundingMode,
    cache: Arc<DashMap<CacheKey, Decimal>>,
    persist_locks: Arc<DashMap<CacheKey, Arc<AsyncMutex<()>>>>,
}

/// Cap applicable to a deposit; None means unlimited
fn effective_limit(account_max: i64, currency_default: i64) -> Option<Decimal> {
    if account_max > 0 {
        Some(Decimal::from(account_max))
    } else if currency_default >= 0 {
        Some(Decimal::from(currency_default))
    } else {
        None
    }
}

fn audit_amount(kind: TxKind, amount: Decimal, before: Decimal, after: Decimal) -> Decimal {
    match kind {
        TxKind::Deposit | TxKind::Withdraw => amount,
        TxKind::Set | TxKind::Rollback => (after - before).abs(),
    }
}

/// The serialization point for one cache key, created on first use
fn key_lock(
    locks: &DashMap<CacheKey, Arc<AsyncMutex<()>>>,
    key: &CacheKey,
) -> Arc<AsyncMutex<()>> {
    let entry = locks
        .entry(key.clone())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())));
    Arc::clone(entry.value())
}

impl AccountStore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        db: Arc<Database>,
        registry: Arc<CurrencyRegistry>,
        audit: Arc<AuditWriter>,
        executor: Arc<AsyncExecutor>,
        hooks: Arc<HookBus>,
        metrics: Metrics,
        rounding: RoundingMode,
    ) -> Self {
        Self {
            db,
            registry,
            audit,
            executor,
            hooks,
            metrics,
            rounding,
            cache: Arc::new(DashMap::new()),
            persist_locks: Arc::new(DashMap::new()),
        }
    }

    // =========================================================================
    // CACHED (ONLINE) PATH
    // =========================================================================

    /// Credit through the cache; persistence follows asynchronously
    pub async fn deposit(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.mutate_cached(player, uuid, currency, TxKind::Deposit, amount, reason, operator)
            .await
    }

    /// Debit through the cache; persistence follows asynchronously
    pub async fn withdraw(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.mutate_cached(player, uuid, currency, TxKind::Withdraw, amount, reason, operator)
            .await
    }

    /// Overwrite through the cache; persistence follows asynchronously
    pub async fn set_balance(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.mutate_cached(player, uuid, currency, TxKind::Set, amount, reason, operator)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn mutate_cached(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        kind: TxKind,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        let currency = match self.validate_target(currency, kind).await {
            Ok(currency) => currency,
            Err(response) => return response,
        };
        let digits = currency.digits();
        let key: CacheKey = (player.to_string(), currency.id);
        let amount = money::scale(amount, digits, self.rounding);

        // the read-compute-write below linearizes on the key's lock; every
        // section inside is synchronous, so the guard never spans an await
        let lock = key_lock(&self.persist_locks, &key);
        let guard = lock.lock().await;

        let before = self.cached_or_zero(&key, digits);
        if let Err(response) = validate_amount(kind, amount, before) {
            return response;
        }
        if reason.trim().is_empty() || operator.trim().is_empty() {
            return EconomyResponse::failure(
                FailureKind::Internal,
                before,
                "reason and operator are required",
            );
        }

        let after = match kind {
            TxKind::Deposit => {
                let candidate = money::scale(before + amount, digits, self.rounding);
                // per-account overrides live in persistence; the cache path
                // checks against the currency default
                if let Some(limit) = effective_limit(-1, currency.default_max_balance) {
                    if candidate > limit {
                        return EconomyResponse::failure(
                            FailureKind::LimitExceeded,
                            before,
                            format!(
                                "deposit would exceed the balance limit of {}",
                                money::format(limit, digits)
                            ),
                        );
                    }
                }
                candidate
            }
            TxKind::Withdraw => {
                if before < amount {
                    return EconomyResponse::failure(
                        FailureKind::InsufficientFunds,
                        before,
                        format!(
                            "insufficient funds: balance {}, requested {}",
                            money::format(before, digits),
                            money::format(amount, digits)
                        ),
                    );
                }
                money::scale(before - amount, digits, self.rounding)
            }
            TxKind::Set => amount,
            TxKind::Rollback => {
                return EconomyResponse::failure(
                    FailureKind::Internal,
                    before,
                    "rollback is not a caller-facing mutation",
                );
            }
        };

        let change = BalanceChange {
            player_name: player.to_string(),
            player_uuid: uuid.to_string(),
            currency: currency.identifier.clone(),
            kind,
            amount: audit_amount(kind, amount, before, after),
            balance_before: before,
            balance_after: after,
            reason: reason.to_string(),
            operator: operator.to_string(),
        };

        if self.hooks.dispatch_pre(&change) {
            return EconomyResponse::failure(
                FailureKind::Cancelled,
                before,
                "mutation cancelled by a pre-change subscriber",
            );
        }

        self.cache.insert(key.clone(), after);
        // the persist job re-acquires this lock, release before scheduling
        drop(guard);

        self.metrics.mutations_total.inc();
        self.console_line(&currency, &change);

        let job = self.persist_job(key.clone(), currency.id, change.clone(), before);
        if let Err(err) = self.executor.try_run_async(job) {
            // durability over latency: when the queue is saturated or shut
            // down, the persist runs inline instead of being dropped
            warn!("async persist rejected ({err}), persisting inline");
            self.persist_job(key, currency.id, change, before).await;
        }

        EconomyResponse::success(after)
    }

    /// Write-behind persist for one committed cache mutation
    ///
    /// Serializes on the key's persist lock and writes the latest cache
    /// observation, so same-key jobs never fight each other over the
    /// version column and the store converges on the final cached balance.
    fn persist_job(
        &self,
        key: CacheKey,
        currency_id: i64,
        change: BalanceChange,
        before: Decimal,
    ) -> impl Future<Output = ()> + Send + 'static {
        let db = self.db.clone();
        let audit = self.audit.clone();
        let hooks = self.hooks.clone();
        let cache = self.cache.clone();
        let persist_locks = self.persist_locks.clone();
        let metrics = self.metrics.clone();

        async move {
            let lock = key_lock(&persist_locks, &key);
            let _guard = lock.lock().await;

            let target = cache
                .get(&key)
                .map(|entry| *entry)
                .unwrap_or(change.balance_after);

            let account = db
                .get_or_create_account(&key.0, &change.player_uuid, currency_id, Decimal::ZERO)
                .await;

            let mut account = match account {
                Ok(account) => account,
                Err(err) => {
                    error!(
                        "failed to load account {}/{} for write-behind persist: {err}",
                        key.0, change.currency
                    );
                    Self::roll_back_entry(&cache, key, change.balance_after, before);
                    return;
                }
            };

            account.balance = target;
            match db.update_account_versioned(&account).await {
                Ok(true) => {
                    audit.record(&change, currency_id).await;
                    hooks.dispatch_post(&change);
                }
                Ok(false) => {
                    // a direct-path writer moved the row underneath us; the
                    // store wins and the cache entry follows it
                    metrics.conflicts_total.inc();
                    warn!(
                        "version conflict persisting {}/{}, resyncing cache from store",
                        key.0, change.currency
                    );
                    match db.find_account(&key.0, currency_id).await {
                        Ok(Some(fresh)) => {
                            cache.insert(key, fresh.balance);
                            metrics.cache_resyncs_total.inc();
                        }
                        Ok(None) => {
                            cache.remove(&key);
                        }
                        Err(err) => {
                            error!("cache resync for {}/{} failed: {err}", key.0, change.currency);
                        }
                    }
                }
                Err(err) => {
                    error!(
                        "failed to persist cached mutation for {}/{}: {err}",
                        key.0, change.currency
                    );
                    Self::roll_back_entry(&cache, key, change.balance_after, before);
                }
            }
        }
    }

    /// Roll a cache entry back to its pre-mutation balance, unless a later
    /// mutation already moved it on
    fn roll_back_entry(
        cache: &DashMap<CacheKey, Decimal>,
        key: CacheKey,
        expected: Decimal,
        before: Decimal,
    ) {
        cache.entry(key).and_modify(|value| {
            if *value == expected {
                *value = before;
            }
        });
    }

    // =========================================================================
    // DIRECT (OFFLINE) PATH
    // =========================================================================

    /// Credit straight against persistence with bounded optimistic retry
    pub async fn deposit_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.mutate_direct(player, uuid, currency, TxKind::Deposit, amount, reason, operator)
            .await
    }

    /// Debit straight against persistence with bounded optimistic retry
    pub async fn withdraw_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.mutate_direct(player, uuid, currency, TxKind::Withdraw, amount, reason, operator)
            .await
    }

    /// Overwrite straight against persistence with bounded optimistic retry
    pub async fn set_balance_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        self.mutate_direct(player, uuid, currency, TxKind::Set, amount, reason, operator)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn mutate_direct(
        &self,
        player: &str,
        uuid: &str,
        currency: &str,
        kind: TxKind,
        amount: Decimal,
        reason: &str,
        operator: &str,
    ) -> EconomyResponse {
        let currency = match self.validate_target(currency, kind).await {
            Ok(currency) => currency,
            Err(response) => return response,
        };
        let digits = currency.digits();
        let zero = money::scale(Decimal::ZERO, digits, self.rounding);

        let amount = money::scale(amount, digits, self.rounding);
        if let Err(response) = validate_amount(kind, amount, zero) {
            return response;
        }
        if reason.trim().is_empty() || operator.trim().is_empty() {
            return EconomyResponse::failure(
                FailureKind::Internal,
                zero,
                "reason and operator are required",
            );
        }
        if kind == TxKind::Rollback {
            return EconomyResponse::failure(
                FailureKind::Internal,
                zero,
                "rollback is not a caller-facing mutation",
            );
        }

        let key: CacheKey = (player.to_string(), currency.id);
        let mut pre_dispatched = false;
        let mut last_balance = zero;

        for attempt in 1..=MAX_VERSION_RETRIES {
            let mut account = match self
                .db
                .get_or_create_account(player, uuid, currency.id, zero)
                .await
            {
                Ok(account) => account,
                Err(Error::NotReady) => {
                    return EconomyResponse::failure(
                        FailureKind::NotReady,
                        last_balance,
                        "economy core is not ready",
                    );
                }
                Err(err) => {
                    error!("direct {} for {player}/{} failed to load account: {err}", kind, currency.identifier);
                    return EconomyResponse::failure(
                        FailureKind::Internal,
                        last_balance,
                        "storage failure",
                    );
                }
            };

            let before = account.balance;
            last_balance = before;

            let after = match kind {
                TxKind::Deposit => {
                    let candidate = money::scale(before + amount, digits, self.rounding);
                    let limit =
                        effective_limit(account.max_balance, currency.default_max_balance);
                    if let Some(limit) = limit {
                        if candidate > limit {
                            return EconomyResponse::failure(
                                FailureKind::LimitExceeded,
                                before,
                                format!(
                                    "deposit would exceed the balance limit of {}",
                                    money::format(limit, digits)
                                ),
                            );
                        }
                    }
                    candidate
                }
                TxKind::Withdraw => {
                    if before < amount {
                        return EconomyResponse::failure(
                            FailureKind::InsufficientFunds,
                            before,
                            format!(
                                "insufficient funds: balance {}, requested {}",
                                money::format(before, digits),
                                money::format(amount, digits)
                            ),
                        );
                    }
                    money::scale(before - amount, digits, self.rounding)
                }
                TxKind::Set => amount,
                TxKind::Rollback => unreachable!("rejected above"),
            };

            let change = BalanceChange {
                player_name: player.to_string(),
                player_uuid: uuid.to_string(),
                currency: currency.identifier.clone(),
                kind,
                amount: audit_amount(kind, amount, before, after),
                balance_before: before,
                balance_after: after,
                reason: reason.to_string(),
                operator: operator.to_string(),
            };

            if !pre_dispatched {
                pre_dispatched = true;
                if self.hooks.dispatch_pre(&change) {
                    return EconomyResponse::failure(
                        FailureKind::Cancelled,
                        before,
                        "mutation cancelled by a pre-change subscriber",
                    );
                }
            }

            account.balance = after;
            match self.db.update_account_versioned(&account).await {
                Ok(true) => {
                    self.metrics.mutations_total.inc();
                    self.audit.record(&change, currency.id).await;
                    // keep a loaded player's cache entry in step with the store
                    if self.cache.contains_key(&key) {
                        self.cache.insert(key.clone(), after);
                    }
                    self.console_line(&currency, &change);

                    let hooks = self.hooks.clone();
                    let post = change.clone();
                    if self
                        .executor
                        .try_run_async(async move { hooks.dispatch_post(&post) })
                        .is_err()
                    {
                        self.hooks.dispatch_post(&change);
                    }
                    return EconomyResponse::success(after);
                }
                Ok(false) => {
                    self.metrics.conflicts_total.inc();
                    warn!(
                        "version conflict on direct {} for {player}/{} (attempt {attempt}/{MAX_VERSION_RETRIES})",
                        kind, currency.identifier
                    );
                }
                Err(err) => {
                    error!("direct {} for {player}/{} failed: {err}", kind, currency.identifier);
                    return EconomyResponse::failure(
                        FailureKind::Internal,
                        before,
                        "storage failure",
                    );
                }
            }
        }

        EconomyResponse::failure(
            FailureKind::Conflict,
            last_balance,
            "optimistic version retries exhausted",
        )
    }

    // =========================================================================
    // QUERIES AND ADMINISTRATION
    // =========================================================================

    /// Cached balance, falling back to a persistence read on a cache miss
    pub async fn balance(&self, player: &str, currency: &str) -> Result<Decimal> {
        self.db.ensure_ready()?;
        let currency = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(currency.to_string()))?;
        let key = (player.to_string(), currency.id);
        if let Some(entry) = self.cache.get(&key) {
            return Ok(*entry);
        }
        let fallback = money::scale(Decimal::ZERO, currency.digits(), self.rounding);
        Ok(self
            .db
            .find_account(player, currency.id)
            .await?
            .map(|account| account.balance)
            .unwrap_or(fallback))
    }

    /// Persisted balance, bypassing the cache
    pub async fn balance_direct(&self, player: &str, currency: &str) -> Result<Decimal> {
        self.db.ensure_ready()?;
        let currency = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(currency.to_string()))?;
        let fallback = money::scale(Decimal::ZERO, currency.digits(), self.rounding);
        Ok(self
            .db
            .find_account(player, currency.id)
            .await?
            .map(|account| account.balance)
            .unwrap_or(fallback))
    }

    /// All persisted accounts of one player
    pub async fn list_accounts(&self, player: &str) -> Result<Vec<AccountView>> {
        self.db.ensure_ready()?;
        let accounts = self.db.accounts_by_player(player).await?;
        let mut views = Vec::with_capacity(accounts.len());
        for account in accounts {
            if let Some(currency) = self.registry.get_by_id(account.currency_id).await {
                views.push(AccountView {
                    currency: currency.identifier,
                    balance: account.balance,
                    max_balance: account.max_balance,
                });
            }
        }
        Ok(views)
    }

    /// One player's cache entries; caps report -1 since they live only in
    /// persistence
    pub async fn list_accounts_cached(&self, player: &str) -> Vec<AccountView> {
        let entries: Vec<(i64, Decimal)> = self
            .cache
            .iter()
            .filter(|entry| entry.key().0 == player)
            .map(|entry| (entry.key().1, *entry.value()))
            .collect();

        let mut views = Vec::with_capacity(entries.len());
        for (currency_id, balance) in entries {
            if let Some(currency) = self.registry.get_by_id(currency_id).await {
                views.push(AccountView {
                    currency: currency.identifier,
                    balance,
                    max_balance: -1,
                });
            }
        }
        views
    }

    /// Persist a per-account cap override through the versioned path
    pub async fn set_max_balance(&self, player: &str, currency: &str, max: i64) -> Result<()> {
        self.db.ensure_ready()?;
        let currency = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(currency.to_string()))?;
        let zero = money::scale(Decimal::ZERO, currency.digits(), self.rounding);

        for _ in 0..MAX_VERSION_RETRIES {
            let mut account = self
                .db
                .get_or_create_account(player, "", currency.id, zero)
                .await?;
            account.max_balance = max;
            if self.db.update_account_versioned(&account).await? {
                return Ok(());
            }
        }
        Err(Error::Internal(format!(
            "set_max_balance for {player}/{} lost {MAX_VERSION_RETRIES} version races",
            currency.identifier
        )))
    }

    // =========================================================================
    // CACHE LIFECYCLE
    // =========================================================================

    /// Populate cache entries for every enabled currency of one player
    pub async fn load_player_balances(&self, player: &str, uuid: &str) -> Result<()> {
        self.db.ensure_ready()?;
        for currency in self.registry.list_enabled().await {
            let zero = money::scale(Decimal::ZERO, currency.digits(), self.rounding);
            let account = self
                .db
                .get_or_create_account(player, uuid, currency.id, zero)
                .await?;
            self.cache
                .insert((player.to_string(), currency.id), account.balance);
        }
        Ok(())
    }

    /// Drop every cache entry of one player
    pub fn unload_player(&self, player: &str) {
        self.cache.retain(|key, _| key.0 != player);
    }

    /// Empty the whole cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Re-read one entry from persistence when it is currently cached
    pub async fn refresh_entry(&self, player: &str, currency_id: i64) -> Result<()> {
        let key = (player.to_string(), currency_id);
        if !self.cache.contains_key(&key) {
            return Ok(());
        }
        if let Some(account) = self.db.find_account(player, currency_id).await? {
            self.cache.insert(key, account.balance);
        }
        Ok(())
    }

    /// Cached value, if present
    pub fn cached_balance(&self, player: &str, currency_id: i64) -> Option<Decimal> {
        self.cache
            .get(&(player.to_string(), currency_id))
            .map(|entry| *entry)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn validate_target(
        &self,
        currency: &str,
        kind: TxKind,
    ) -> std::result::Result<Currency, EconomyResponse> {
        if !self.db.is_ready() {
            return Err(EconomyResponse::failure(
                FailureKind::NotReady,
                Decimal::ZERO,
                "economy core is not ready",
            ));
        }
        let definition = self
            .registry
            .get_by_identifier(currency)
            .await
            .ok_or_else(|| {
                EconomyResponse::failure(
                    FailureKind::UnknownCurrency,
                    Decimal::ZERO,
                    format!("unknown currency '{currency}'"),
                )
            })?;
        if matches!(kind, TxKind::Deposit | TxKind::Withdraw) && !definition.enabled {
            return Err(EconomyResponse::failure(
                FailureKind::CurrencyDisabled,
                Decimal::ZERO,
                format!("currency '{}' is disabled", definition.identifier),
            ));
        }
        Ok(definition)
    }

    fn cached_or_zero(&self, key: &CacheKey, digits: u32) -> Decimal {
        self.cache
            .get(key)
            .map(|entry| *entry)
            .unwrap_or_else(|| money::scale(Decimal::ZERO, digits, self.rounding))
    }

    fn console_line(&self, currency: &Currency, change: &BalanceChange) {
        if !currency.console_log {
            return;
        }
        let digits = currency.digits();
        info!(
            "[economy] {} {} {}: {} ({} -> {}) reason='{}' operator='{}'",
            change.kind,
            change.player_name,
            currency.identifier,
            money::format(change.amount, digits),
            money::format(change.balance_before, digits),
            money::format(change.balance_after, digits),
            change.reason,
            change.operator
        );
    }
}

fn validate_amount(
    kind: TxKind,
    amount: Decimal,
    balance: Decimal,
) -> std::result::Result<(), EconomyResponse> {
    match kind {
        TxKind::Deposit | TxKind::Withdraw if !money::is_positive(amount) => {
            Err(EconomyResponse::failure(
                FailureKind::InvalidAmount,
                balance,
                "amount must be positive",
            ))
        }
        TxKind::Set if !money::is_non_negative(amount) => Err(EconomyResponse::failure(
            FailureKind::InvalidAmount,
            balance,
            "amount must not be negative",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_effective_limit() {
        // account override wins when positive
        assert_eq!(effective_limit(100, 50), Some(dec!(100)));
        // non-positive override inherits the currency default
        assert_eq!(effective_limit(-1, 50), Some(dec!(50)));
        assert_eq!(effective_limit(0, 50), Some(dec!(50)));
        // -1 currency default means unlimited
        assert_eq!(effective_limit(-1, -1), None);
        // a zero currency default is a hard cap at zero
        assert_eq!(effective_limit(-1, 0), Some(dec!(0)));
    }

    #[test]
    fn test_audit_amount() {
        assert_eq!(
            audit_amount(TxKind::Deposit, dec!(5), dec!(1), dec!(6)),
            dec!(5)
        );
        assert_eq!(
            audit_amount(TxKind::Set, dec!(2), dec!(10), dec!(2)),
            dec!(8)
        );
        assert_eq!(
            audit_amount(TxKind::Rollback, dec!(0), dec!(3), dec!(9)),
            dec!(6)
        );
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(TxKind::Deposit, dec!(1), dec!(0)).is_ok());
        assert!(validate_amount(TxKind::Deposit, dec!(0), dec!(0)).is_err());
        assert!(validate_amount(TxKind::Withdraw, dec!(-1), dec!(0)).is_err());
        assert!(validate_amount(TxKind::Set, dec!(0), dec!(0)).is_ok());
        assert!(validate_amount(TxKind::Set, dec!(-0.01), dec!(0)).is_err());
    }
}
