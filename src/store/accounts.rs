//! Account repository
//!
//! All balance writes go through the version column: a standard update
//! carries the caller's witnessed version and affects zero rows when the row
//! moved underneath it. The forced variant re-reads the live version and
//! retries the standard update, so even administrative overwrites keep the
//! version sequence intact.

use super::{decimal_column, Database};
use crate::error::{Error, Result};
use crate::types::Account;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Bounded retry for optimistic direct-path updates
pub const MAX_VERSION_RETRIES: u32 = 3;

/// Retry bound for forced updates, which must win against live writers
const FORCE_UPDATE_RETRIES: u32 = 5;

fn account_from_row(row: &SqliteRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        player_uuid: row.try_get("player_uuid")?,
        player_name: row.try_get("player_name")?,
        currency_id: row.try_get("currency_id")?,
        balance: decimal_column(row, "balance")?,
        max_balance: row.try_get("max_balance")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Database {
    /// Find the row for one (player, currency) pair
    pub async fn find_account(&self, player: &str, currency_id: i64) -> Result<Option<Account>> {
        self.ensure_ready()?;
        let row = sqlx::query("SELECT * FROM account WHERE player_name = ? AND currency_id = ?")
            .bind(player)
            .bind(currency_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    /// All rows for one player
    pub async fn accounts_by_player(&self, player: &str) -> Result<Vec<Account>> {
        self.ensure_ready()?;
        let rows = sqlx::query("SELECT * FROM account WHERE player_name = ? ORDER BY currency_id")
            .bind(player)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(account_from_row).collect()
    }

    /// All rows for one currency
    pub async fn accounts_by_currency(&self, currency_id: i64) -> Result<Vec<Account>> {
        self.ensure_ready()?;
        let rows = sqlx::query("SELECT * FROM account WHERE currency_id = ? ORDER BY player_name")
            .bind(currency_id)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(account_from_row).collect()
    }

    /// Every account row
    pub async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.ensure_ready()?;
        let rows = sqlx::query("SELECT * FROM account ORDER BY player_name, currency_id")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(account_from_row).collect()
    }

    /// Return the row, inserting a zero-balance row at the base version when
    /// missing
    ///
    /// A changed, non-empty uuid refreshes the advisory uuid column. Insert
    /// races against concurrent creators resolve by re-selecting.
    pub async fn get_or_create_account(
        &self,
        player: &str,
        uuid: &str,
        currency_id: i64,
        zero_balance: Decimal,
    ) -> Result<Account> {
        self.ensure_ready()?;

        if let Some(account) = self.find_account(player, currency_id).await? {
            if !uuid.is_empty() && account.player_uuid != uuid {
                sqlx::query("UPDATE account SET player_uuid = ? WHERE id = ?")
                    .bind(uuid)
                    .bind(account.id)
                    .execute(self.pool())
                    .await?;
                return Ok(Account {
                    player_uuid: uuid.to_string(),
                    ..account
                });
            }
            return Ok(account);
        }

        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO account
                (player_uuid, player_name, currency_id, balance, max_balance, version,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, -1, 1, ?, ?)
            "#,
        )
        .bind(uuid)
        .bind(player)
        .bind(currency_id)
        .bind(zero_balance.to_string())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await;

        match inserted {
            Ok(_) => {}
            // lost the insert race; the winner's row is the one we want
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {}
            Err(err) => return Err(err.into()),
        }

        self.find_account(player, currency_id).await?.ok_or_else(|| {
            Error::Internal(format!("account {player}/{currency_id} vanished after insert"))
        })
    }

    /// Optimistic update carrying the caller's witnessed version
    ///
    /// True when exactly one row changed; false signals a version conflict.
    pub async fn update_account_versioned(&self, account: &Account) -> Result<bool> {
        self.ensure_ready()?;
        let result = sqlx::query(
            r#"
            UPDATE account
            SET balance = ?, max_balance = ?, player_uuid = ?,
                version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(account.balance.to_string())
        .bind(account.max_balance)
        .bind(&account.player_uuid)
        .bind(Utc::now())
        .bind(account.id)
        .bind(account.version)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Forced balance overwrite that still respects the version column
    ///
    /// Re-reads the live row and performs the standard versioned update,
    /// retrying until it wins against concurrent writers. Returns the
    /// (before, after) balances of the winning attempt.
    pub async fn force_set_balance(
        &self,
        player: &str,
        uuid: &str,
        currency_id: i64,
        balance: Decimal,
    ) -> Result<(Decimal, Decimal)> {
        self.ensure_ready()?;
        for _ in 0..FORCE_UPDATE_RETRIES {
            let mut account = self
                .get_or_create_account(player, uuid, currency_id, Decimal::ZERO)
                .await?;
            let before = account.balance;
            account.balance = balance;
            if self.update_account_versioned(&account).await? {
                return Ok((before, balance));
            }
        }
        Err(Error::Internal(format!(
            "forced update for {player}/{currency_id} lost {FORCE_UPDATE_RETRIES} version races"
        )))
    }
}
