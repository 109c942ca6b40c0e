//! Backup-snapshot repository

use super::{decimal_column, Database};
use crate::error::Result;
use crate::types::{Account, BackupRow, SnapshotInfo};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn backup_row_from_row(row: &SqliteRow) -> Result<BackupRow> {
    Ok(BackupRow {
        id: row.try_get("id")?,
        snapshot_id: row.try_get("snapshot_id")?,
        player_uuid: row.try_get("player_uuid")?,
        player_name: row.try_get("player_name")?,
        currency_id: row.try_get("currency_id")?,
        balance: decimal_column(row, "balance")?,
        memo: row.try_get("memo")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Database {
    /// Batch-insert one row per account under a shared batch id, memo and
    /// instant; the batch commits atomically
    pub async fn insert_snapshot(
        &self,
        snapshot_id: &str,
        memo: &str,
        created_at: DateTime<Utc>,
        accounts: &[Account],
    ) -> Result<u64> {
        self.ensure_ready()?;
        let mut tx = self.pool().begin().await?;
        for account in accounts {
            sqlx::query(
                r#"
                INSERT INTO backup_snapshot
                    (snapshot_id, player_uuid, player_name, currency_id, balance, memo, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(snapshot_id)
            .bind(&account.player_uuid)
            .bind(&account.player_name)
            .bind(account.currency_id)
            .bind(account.balance.to_string())
            .bind(memo)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(accounts.len() as u64)
    }

    /// Every row of one batch
    pub async fn snapshot_rows(&self, snapshot_id: &str) -> Result<Vec<BackupRow>> {
        self.ensure_ready()?;
        let rows = sqlx::query(
            "SELECT * FROM backup_snapshot WHERE snapshot_id = ? ORDER BY player_name, currency_id",
        )
        .bind(snapshot_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(backup_row_from_row).collect()
    }

    /// One player's rows within one batch
    pub async fn snapshot_rows_for_player(
        &self,
        snapshot_id: &str,
        player: &str,
    ) -> Result<Vec<BackupRow>> {
        self.ensure_ready()?;
        let rows = sqlx::query(
            r#"
            SELECT * FROM backup_snapshot
            WHERE snapshot_id = ? AND player_name = ?
            ORDER BY currency_id
            "#,
        )
        .bind(snapshot_id)
        .bind(player)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(backup_row_from_row).collect()
    }

    /// One summary per distinct batch, newest first
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        self.ensure_ready()?;
        let rows = sqlx::query(
            r#"
            SELECT snapshot_id,
                   MAX(memo) AS memo,
                   MAX(created_at) AS created_at,
                   COUNT(*) AS accounts
            FROM backup_snapshot
            GROUP BY snapshot_id
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SnapshotInfo {
                    snapshot_id: row.try_get("snapshot_id")?,
                    memo: row.try_get("memo")?,
                    created_at: row.try_get("created_at")?,
                    accounts: row.try_get("accounts")?,
                })
            })
            .collect()
    }

    /// Number of distinct batches
    pub async fn count_snapshots(&self) -> Result<i64> {
        self.ensure_ready()?;
        let row = sqlx::query("SELECT COUNT(DISTINCT snapshot_id) FROM backup_snapshot")
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Delete every row of one batch; returns the rows removed
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<u64> {
        self.ensure_ready()?;
        let result = sqlx::query("DELETE FROM backup_snapshot WHERE snapshot_id = ?")
            .bind(snapshot_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
