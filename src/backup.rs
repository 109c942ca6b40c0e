//! Backup engine
//!
//! Snapshots copy every account row under one batch id with a shared memo
//! and instant. Restores go through forced account updates, which still run
//! the versioned path against the live row, and append one ROLLBACK audit
//! record per restored row before the corresponding cache entry is
//! refreshed. Retention keeps the newest batches and garbage-collects the
//! rest by batch id.

use crate::accounts::AccountStore;
use crate::audit::AuditWriter;
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::registry::CurrencyRegistry;
use crate::store::Database;
use crate::types::{BackupRow, BalanceChange, SnapshotInfo, TxKind};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Operator recorded on rollback audit rows
const ROLLBACK_OPERATOR: &str = "SYSTEM";

/// Snapshot and restore engine over the account table
pub struct BackupEngine {
    db: Arc<Database>,
    registry: Arc<CurrencyRegistry>,
    audit: Arc<AuditWriter>,
    accounts: Arc<AccountStore>,
    metrics: Metrics,
    max_snapshots: usize,
}

impl BackupEngine {
    pub(crate) fn new(
        db: Arc<Database>,
        registry: Arc<CurrencyRegistry>,
        audit: Arc<AuditWriter>,
        accounts: Arc<AccountStore>,
        metrics: Metrics,
        max_snapshots: usize,
    ) -> Self {
        Self {
            db,
            registry,
            audit,
            accounts,
            metrics,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Capture every account under a fresh batch id
    pub async fn create_snapshot(&self, memo: &str) -> Result<SnapshotInfo> {
        let accounts = self.db.all_accounts().await?;
        if accounts.is_empty() {
            return Err(Error::SnapshotEmpty);
        }

        let snapshot_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let rows = self
            .db
            .insert_snapshot(&snapshot_id, memo, created_at, &accounts)
            .await?;

        self.metrics.snapshots_total.inc();
        info!("created snapshot {snapshot_id} covering {rows} accounts");

        if let Err(err) = self.enforce_retention().await {
            // the new snapshot is durable; stale batches stay until the next pass
            warn!("snapshot retention pass failed: {err}");
        }

        Ok(SnapshotInfo {
            snapshot_id,
            memo: memo.to_string(),
            created_at,
            accounts: rows as i64,
        })
    }

    async fn enforce_retention(&self) -> Result<()> {
        let count = self.db.count_snapshots().await? as usize;
        if count <= self.max_snapshots {
            return Ok(());
        }

        let snapshots = self.db.list_snapshots().await?;
        for stale in snapshots.iter().skip(self.max_snapshots) {
            let removed = self.db.delete_snapshot(&stale.snapshot_id).await?;
            info!(
                "retention removed snapshot {} ({removed} rows)",
                stale.snapshot_id
            );
        }
        Ok(())
    }

    /// Restore every row of one batch
    pub async fn rollback(&self, snapshot_id: &str) -> Result<u64> {
        let rows = self.db.snapshot_rows(snapshot_id).await?;
        if rows.is_empty() {
            return Err(Error::SnapshotNotFound(snapshot_id.to_string()));
        }
        self.restore_rows(snapshot_id, &rows).await
    }

    /// Restore only one player's rows of one batch
    pub async fn rollback_player(&self, snapshot_id: &str, player: &str) -> Result<u64> {
        let rows = self.db.snapshot_rows_for_player(snapshot_id, player).await?;
        if rows.is_empty() {
            return Err(Error::SnapshotNotFound(format!(
                "{snapshot_id} (player {player})"
            )));
        }
        self.restore_rows(snapshot_id, &rows).await
    }

    async fn restore_rows(&self, snapshot_id: &str, rows: &[BackupRow]) -> Result<u64> {
        let mut restored = 0u64;
        for row in rows {
            let (before, after) = self
                .db
                .force_set_balance(&row.player_name, &row.player_uuid, row.currency_id, row.balance)
                .await?;

            let currency = self
                .registry
                .get_by_id(row.currency_id)
                .await
                .map(|currency| currency.identifier)
                .unwrap_or_else(|| row.currency_id.to_string());

            let change = BalanceChange {
                player_name: row.player_name.clone(),
                player_uuid: row.player_uuid.clone(),
                currency,
                kind: TxKind::Rollback,
                amount: (after - before).abs(),
                balance_before: before,
                balance_after: after,
                reason: format!("rollback:{snapshot_id}"),
                operator: ROLLBACK_OPERATOR.to_string(),
            };
            self.audit.record(&change, row.currency_id).await;

            self.accounts
                .refresh_entry(&row.player_name, row.currency_id)
                .await?;
            restored += 1;
        }

        info!("rollback {snapshot_id} restored {restored} accounts");
        Ok(restored)
    }

    /// One summary per distinct batch, newest first
    pub async fn list(&self) -> Result<Vec<SnapshotInfo>> {
        self.db.list_snapshots().await
    }
}
