//! Audit writer
//!
//! One append per successful mutation. An append failure never rolls back
//! the mutation it documents: the error is logged and counted, and the
//! missing row is an alertable anomaly.

use crate::error::Result;
use crate::metrics::Metrics;
use crate::store::Database;
use crate::types::{BalanceChange, NewTransaction, TransactionRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

/// Append-only writer and paged reader for the transaction log
pub struct AuditWriter {
    db: Arc<Database>,
    metrics: Metrics,
}

impl AuditWriter {
    /// New writer over the shared store
    pub fn new(db: Arc<Database>, metrics: Metrics) -> Self {
        Self { db, metrics }
    }

    /// Append one record for a committed change; never propagates failure
    pub async fn record(&self, change: &BalanceChange, currency_id: i64) {
        let tx = NewTransaction {
            player_uuid: change.player_uuid.clone(),
            player_name: change.player_name.clone(),
            currency_id,
            kind: change.kind,
            amount: change.amount,
            balance_before: change.balance_before,
            balance_after: change.balance_after,
            reason: change.reason.clone(),
            operator: change.operator.clone(),
            occurred_at: Utc::now(),
        };

        if let Err(err) = self.db.insert_transaction(&tx).await {
            self.metrics.audit_failures_total.inc();
            error!(
                "failed to append {} audit record for {}/{}: {err}",
                change.kind, change.player_name, change.currency
            );
        }
    }

    /// Page of a player's records, newest first; pages start at 1
    pub async fn logs_for_player(
        &self,
        player: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TransactionRecord>> {
        let (limit, offset) = page_window(page, page_size);
        self.db.transactions_for_player(player, limit, offset).await
    }

    /// Page of a player's records for one currency, newest first
    pub async fn logs_for_player_currency(
        &self,
        player: &str,
        currency_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TransactionRecord>> {
        let (limit, offset) = page_window(page, page_size);
        self.db
            .transactions_for_player_currency(player, currency_id, limit, offset)
            .await
    }

    /// Total records for one player
    pub async fn count_for_player(&self, player: &str) -> Result<i64> {
        self.db.count_transactions_for_player(player).await
    }

    /// Total records for one (player, currency) pair
    pub async fn count_for_player_currency(&self, player: &str, currency_id: i64) -> Result<i64> {
        self.db
            .count_transactions_for_player_currency(player, currency_id)
            .await
    }
}

fn page_window(page: u32, page_size: u32) -> (i64, i64) {
    let page = page.max(1) as i64;
    let page_size = page_size.clamp(1, 1000) as i64;
    (page_size, (page - 1) * page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(1, 10), (10, 0));
        assert_eq!(page_window(3, 25), (25, 50));
        // page 0 is treated as the first page, size is clamped
        assert_eq!(page_window(0, 0), (1, 0));
        assert_eq!(page_window(2, 100_000), (1000, 1000));
    }
}
