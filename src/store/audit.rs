//! Transaction-log repository
//!
//! Append-only: this module never updates or deletes rows.

use super::{decimal_column, Database};
use crate::error::{Error, Result};
use crate::types::{NewTransaction, TransactionRecord, TxKind};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn transaction_from_row(row: &SqliteRow) -> Result<TransactionRecord> {
    let kind: String = row.try_get("type")?;
    Ok(TransactionRecord {
        id: row.try_get("id")?,
        player_uuid: row.try_get("player_uuid")?,
        player_name: row.try_get("player_name")?,
        currency_id: row.try_get("currency_id")?,
        kind: TxKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("unknown transaction type '{kind}'")))?,
        amount: decimal_column(row, "amount")?,
        balance_before: decimal_column(row, "balance_before")?,
        balance_after: decimal_column(row, "balance_after")?,
        reason: row.try_get("reason")?,
        operator: row.try_get("operator")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

impl Database {
    /// Append one audit row and return its id
    pub async fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        self.ensure_ready()?;
        let result = sqlx::query(
            r#"
            INSERT INTO transaction_log
                (player_uuid, player_name, currency_id, type, amount,
                 balance_before, balance_after, reason, operator, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tx.player_uuid)
        .bind(&tx.player_name)
        .bind(tx.currency_id)
        .bind(tx.kind.as_str())
        .bind(tx.amount.to_string())
        .bind(tx.balance_before.to_string())
        .bind(tx.balance_after.to_string())
        .bind(&tx.reason)
        .bind(&tx.operator)
        .bind(tx.occurred_at)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Page of a player's records, newest first
    pub async fn transactions_for_player(
        &self,
        player: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        self.ensure_ready()?;
        let rows = sqlx::query(
            r#"
            SELECT * FROM transaction_log
            WHERE player_name = ?
            ORDER BY occurred_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(player)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    /// Page of a player's records for one currency, newest first
    pub async fn transactions_for_player_currency(
        &self,
        player: &str,
        currency_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        self.ensure_ready()?;
        let rows = sqlx::query(
            r#"
            SELECT * FROM transaction_log
            WHERE player_name = ? AND currency_id = ?
            ORDER BY occurred_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(player)
        .bind(currency_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    /// Total records for one player
    pub async fn count_transactions_for_player(&self, player: &str) -> Result<i64> {
        self.ensure_ready()?;
        let row = sqlx::query("SELECT COUNT(*) FROM transaction_log WHERE player_name = ?")
            .bind(player)
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Total records for one (player, currency) pair
    pub async fn count_transactions_for_player_currency(
        &self,
        player: &str,
        currency_id: i64,
    ) -> Result<i64> {
        self.ensure_ready()?;
        let row = sqlx::query(
            "SELECT COUNT(*) FROM transaction_log WHERE player_name = ? AND currency_id = ?",
        )
        .bind(player)
        .bind(currency_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row.try_get(0)?)
    }
}
