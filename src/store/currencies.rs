//! Currency repository

use super::Database;
use crate::error::{Error, Result};
use crate::types::Currency;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn currency_from_row(row: &SqliteRow) -> Result<Currency> {
    Ok(Currency {
        id: row.try_get("id")?,
        identifier: row.try_get("identifier")?,
        name: row.try_get("name")?,
        symbol: row.try_get("symbol")?,
        precision: row.try_get("precision")?,
        default_max_balance: row.try_get("default_max_balance")?,
        primary: row.try_get("is_primary")?,
        enabled: row.try_get("enabled")?,
        deleted: row.try_get("deleted")?,
        console_log: row.try_get("console_log")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Database {
    /// Find by store-assigned id, deleted rows included
    pub async fn currency_by_id(&self, id: i64) -> Result<Option<Currency>> {
        self.ensure_ready()?;
        let row = sqlx::query("SELECT * FROM currency WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(currency_from_row).transpose()
    }

    /// Find by lowercase identifier
    pub async fn currency_by_identifier(
        &self,
        identifier: &str,
        include_deleted: bool,
    ) -> Result<Option<Currency>> {
        self.ensure_ready()?;
        let sql = if include_deleted {
            "SELECT * FROM currency WHERE identifier = ?"
        } else {
            "SELECT * FROM currency WHERE identifier = ? AND deleted = 0"
        };
        let row = sqlx::query(sql)
            .bind(identifier)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(currency_from_row).transpose()
    }

    /// All non-deleted currencies
    pub async fn active_currencies(&self) -> Result<Vec<Currency>> {
        self.ensure_ready()?;
        let rows = sqlx::query("SELECT * FROM currency WHERE deleted = 0 ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(currency_from_row).collect()
    }

    /// All non-deleted, enabled currencies
    pub async fn enabled_currencies(&self) -> Result<Vec<Currency>> {
        self.ensure_ready()?;
        let rows =
            sqlx::query("SELECT * FROM currency WHERE deleted = 0 AND enabled = 1 ORDER BY id")
                .fetch_all(self.pool())
                .await?;
        rows.iter().map(currency_from_row).collect()
    }

    /// The single non-deleted currency flagged primary, if any
    pub async fn primary_currency(&self) -> Result<Option<Currency>> {
        self.ensure_ready()?;
        let row = sqlx::query("SELECT * FROM currency WHERE is_primary = 1 AND deleted = 0")
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(currency_from_row).transpose()
    }

    /// Insert a definition and return the stored row
    pub async fn insert_currency(&self, currency: &Currency) -> Result<Currency> {
        self.ensure_ready()?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO currency
                (identifier, name, symbol, precision, default_max_balance,
                 is_primary, enabled, deleted, console_log, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&currency.identifier)
        .bind(&currency.name)
        .bind(&currency.symbol)
        .bind(currency.precision)
        .bind(currency.default_max_balance)
        .bind(currency.primary)
        .bind(currency.enabled)
        .bind(currency.deleted)
        .bind(currency.console_log)
        .bind(currency.created_at)
        .bind(currency.updated_at)
        .execute(self.pool())
        .await;

        let result = match inserted {
            Ok(result) => result,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(Error::DuplicateCurrency(currency.identifier.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        let id = result.last_insert_rowid();
        self.currency_by_id(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("currency {id} vanished after insert")))
    }

    /// Update the mutable definition fields, refreshing the timestamp
    pub async fn update_currency(&self, currency: &Currency) -> Result<()> {
        self.ensure_ready()?;
        sqlx::query(
            r#"
            UPDATE currency
            SET name = ?, symbol = ?, precision = ?, default_max_balance = ?,
                console_log = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&currency.name)
        .bind(&currency.symbol)
        .bind(currency.precision)
        .bind(currency.default_max_balance)
        .bind(currency.console_log)
        .bind(Utc::now())
        .bind(currency.id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Soft-delete: the row stays, the identifier stays reserved
    pub async fn soft_delete_currency(&self, identifier: &str) -> Result<bool> {
        self.ensure_ready()?;
        let result = sqlx::query(
            "UPDATE currency SET deleted = 1, updated_at = ? WHERE identifier = ? AND deleted = 0",
        )
        .bind(Utc::now())
        .bind(identifier)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip the enabled flag
    pub async fn set_currency_enabled(&self, identifier: &str, enabled: bool) -> Result<bool> {
        self.ensure_ready()?;
        let result = sqlx::query(
            "UPDATE currency SET enabled = ?, updated_at = ? WHERE identifier = ? AND deleted = 0",
        )
        .bind(enabled)
        .bind(Utc::now())
        .bind(identifier)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically move the primary flag onto `identifier`
    ///
    /// Clears primary on every non-deleted row and sets the target inside
    /// one transaction. Returns false and leaves flags untouched when the
    /// target does not exist among non-deleted rows.
    pub async fn elect_primary(&self, identifier: &str) -> Result<bool> {
        self.ensure_ready()?;
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;

        sqlx::query("UPDATE currency SET is_primary = 0, updated_at = ? WHERE deleted = 0")
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let elected = sqlx::query(
            "UPDATE currency SET is_primary = 1, updated_at = ? WHERE identifier = ? AND deleted = 0",
        )
        .bind(now)
        .bind(identifier)
        .execute(&mut *tx)
        .await?;

        if elected.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
