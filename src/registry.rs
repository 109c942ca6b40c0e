//! In-memory currency registry
//!
//! Two indices (lowercase identifier, store id) guarded by one lock.
//! Mutations hit persistence first, then reload both indices in a single
//! write-lock swap, so readers always observe a consistent pair.

use crate::config::DefaultCurrencyConfig;
use crate::error::{Error, Result};
use crate::store::Database;
use crate::types::Currency;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
struct Indices {
    by_identifier: HashMap<String, Currency>,
    by_id: HashMap<i64, Currency>,
}

/// Cache of currency definitions with CRUD, soft-delete and primary election
pub struct CurrencyRegistry {
    db: Arc<Database>,
    defaults: DefaultCurrencyConfig,
    indices: RwLock<Indices>,
}

impl CurrencyRegistry {
    /// Build an empty registry; call [`CurrencyRegistry::init`] before use
    pub fn new(db: Arc<Database>, defaults: DefaultCurrencyConfig) -> Self {
        Self {
            db,
            defaults,
            indices: RwLock::new(Indices::default()),
        }
    }

    /// Load all non-deleted currencies; seed the default primary currency
    /// when the table is empty
    pub async fn init(&self) -> Result<()> {
        self.reload().await?;

        if self.indices.read().await.by_id.is_empty() {
            let identifier = self.defaults.identifier.trim().to_lowercase();
            info!("no currencies defined, seeding default primary currency '{identifier}'");
            let now = Utc::now();
            let seed = Currency {
                id: 0,
                identifier,
                name: self.defaults.name.clone(),
                symbol: self.defaults.symbol.clone(),
                precision: self.defaults.precision.clamp(0, 8),
                default_max_balance: self.defaults.default_max_balance,
                primary: true,
                enabled: true,
                deleted: false,
                console_log: self.defaults.console_log,
                created_at: now,
                updated_at: now,
            };
            self.db.insert_currency(&seed).await?;
            self.reload().await?;
        }

        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let active = self.db.active_currencies().await?;

        let mut by_identifier = HashMap::with_capacity(active.len());
        let mut by_id = HashMap::with_capacity(active.len());
        for currency in active {
            by_identifier.insert(currency.identifier.clone(), currency.clone());
            by_id.insert(currency.id, currency);
        }

        let mut guard = self.indices.write().await;
        guard.by_identifier = by_identifier;
        guard.by_id = by_id;
        Ok(())
    }

    /// Create a currency; the identifier is normalized to lowercase and must
    /// be unused by every existing row, deleted ones included
    pub async fn create(
        &self,
        identifier: &str,
        name: &str,
        precision: i32,
        symbol: &str,
        default_max_balance: i64,
        console_log: bool,
    ) -> Result<Currency> {
        let identifier = identifier.trim().to_lowercase();
        if identifier.is_empty() {
            return Err(Error::Validation("currency identifier must not be empty".into()));
        }
        if self
            .db
            .currency_by_identifier(&identifier, true)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateCurrency(identifier));
        }

        let now = Utc::now();
        let currency = Currency {
            id: 0,
            identifier,
            name: name.to_string(),
            symbol: symbol.to_string(),
            precision: precision.clamp(0, 8),
            default_max_balance,
            primary: false,
            enabled: true,
            deleted: false,
            console_log,
            created_at: now,
            updated_at: now,
        };

        let created = self.db.insert_currency(&currency).await?;
        self.reload().await?;
        info!("created currency '{}' (id {})", created.identifier, created.id);
        Ok(created)
    }

    /// Soft-delete; the primary currency is protected until reassigned
    pub async fn delete(&self, identifier: &str) -> Result<()> {
        let identifier = identifier.trim().to_lowercase();
        let current = self
            .db
            .currency_by_identifier(&identifier, false)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(identifier.clone()))?;

        if current.primary {
            return Err(Error::PrimaryCurrencyProtected(identifier));
        }

        self.db.soft_delete_currency(&identifier).await?;
        self.reload().await?;
        info!("soft-deleted currency '{identifier}'");
        Ok(())
    }

    /// Enable or disable; idempotent, no persistence write when already in
    /// the target state
    pub async fn set_enabled(&self, identifier: &str, enabled: bool) -> Result<()> {
        let identifier = identifier.trim().to_lowercase();
        let current = self
            .db
            .currency_by_identifier(&identifier, false)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(identifier.clone()))?;

        if current.enabled == enabled {
            return Ok(());
        }

        self.db.set_currency_enabled(&identifier, enabled).await?;
        self.reload().await
    }

    /// Move the primary flag onto `identifier`, leaving exactly one primary
    pub async fn set_primary(&self, identifier: &str) -> Result<()> {
        let identifier = identifier.trim().to_lowercase();
        if !self.db.elect_primary(&identifier).await? {
            return Err(Error::CurrencyNotFound(identifier));
        }
        self.reload().await?;
        info!("primary currency is now '{identifier}'");
        Ok(())
    }

    /// Update display name, symbol, cap and console flag
    pub async fn update_definition(
        &self,
        identifier: &str,
        name: &str,
        symbol: &str,
        default_max_balance: i64,
        console_log: bool,
    ) -> Result<Currency> {
        let identifier = identifier.trim().to_lowercase();
        let mut current = self
            .db
            .currency_by_identifier(&identifier, false)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(identifier.clone()))?;

        current.name = name.to_string();
        current.symbol = symbol.to_string();
        current.default_max_balance = default_max_balance;
        current.console_log = console_log;

        self.db.update_currency(&current).await?;
        self.reload().await?;
        self.get_by_identifier(&identifier)
            .await
            .ok_or_else(|| Error::CurrencyNotFound(identifier))
    }

    /// Case-insensitive identifier lookup among non-deleted currencies
    pub async fn get_by_identifier(&self, identifier: &str) -> Option<Currency> {
        let identifier = identifier.trim().to_lowercase();
        self.indices.read().await.by_identifier.get(&identifier).cloned()
    }

    /// Id lookup among non-deleted currencies
    pub async fn get_by_id(&self, id: i64) -> Option<Currency> {
        self.indices.read().await.by_id.get(&id).cloned()
    }

    /// The currency currently flagged primary
    pub async fn get_primary(&self) -> Option<Currency> {
        self.indices
            .read()
            .await
            .by_id
            .values()
            .find(|currency| currency.primary)
            .cloned()
    }

    /// All non-deleted currencies, ordered by id
    pub async fn list_active(&self) -> Vec<Currency> {
        let mut active: Vec<Currency> = self.indices.read().await.by_id.values().cloned().collect();
        active.sort_by_key(|currency| currency.id);
        active
    }

    /// All non-deleted, enabled currencies, ordered by id
    pub async fn list_enabled(&self) -> Vec<Currency> {
        let mut enabled: Vec<Currency> = self
            .indices
            .read()
            .await
            .by_id
            .values()
            .filter(|currency| currency.enabled)
            .cloned()
            .collect();
        enabled.sort_by_key(|currency| currency.id);
        enabled
    }

    /// Identifiers of enabled currencies
    pub async fn enabled_identifiers(&self) -> Vec<String> {
        self.list_enabled()
            .await
            .into_iter()
            .map(|currency| currency.identifier)
            .collect()
    }
}
