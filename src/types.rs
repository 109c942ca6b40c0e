//! Core types for the economy ledger
//!
//! All cross-references between rows are by store-assigned id. Balances are
//! exact decimals scaled to the owning currency's precision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ledger-wide currency definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    /// Store-assigned id
    pub id: i64,

    /// Lowercase business key, unique among all rows including deleted ones
    pub identifier: String,

    /// Display name
    pub name: String,

    /// Display symbol
    pub symbol: String,

    /// Fractional digits in [0, 8]
    pub precision: i32,

    /// Balance cap applied when an account carries no override; -1 = unlimited
    pub default_max_balance: i64,

    /// At most one non-deleted currency carries this flag
    pub primary: bool,

    /// Disabled currencies reject deposits and withdrawals
    pub enabled: bool,

    /// Soft-delete marker; the identifier stays reserved
    pub deleted: bool,

    /// Emit a console line per successful mutation
    pub console_log: bool,

    /// Creation instant
    pub created_at: DateTime<Utc>,

    /// Last update instant
    pub updated_at: DateTime<Utc>,
}

impl Currency {
    /// Fractional digits as the scaling argument
    pub fn digits(&self) -> u32 {
        self.precision.clamp(0, 8) as u32
    }

    /// True when no default balance cap applies
    pub fn unlimited(&self) -> bool {
        self.default_max_balance < 0
    }
}

/// A (player, currency) balance row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned id
    pub id: i64,

    /// Advisory uuid, refreshed on name/uuid discovery
    pub player_uuid: String,

    /// Primary lookup key together with `currency_id`
    pub player_name: String,

    /// Owning currency id
    pub currency_id: i64,

    /// Balance scaled to the currency precision; never negative at rest
    pub balance: Decimal,

    /// Per-account cap override; values > 0 replace the currency default
    pub max_balance: i64,

    /// Optimistic concurrency column, bumped on every persisted update
    pub version: i64,

    /// Creation instant
    pub created_at: DateTime<Utc>,

    /// Last update instant
    pub updated_at: DateTime<Utc>,
}

/// Mutation kind recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Credit
    Deposit,
    /// Debit
    Withdraw,
    /// Absolute overwrite
    Set,
    /// Snapshot restore
    Rollback,
}

impl TxKind {
    /// Stable wire name
    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Deposit => "DEPOSIT",
            TxKind::Withdraw => "WITHDRAW",
            TxKind::Set => "SET",
            TxKind::Rollback => "ROLLBACK",
        }
    }

    /// Parse the stable wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEPOSIT" => Some(TxKind::Deposit),
            "WITHDRAW" => Some(TxKind::Withdraw),
            "SET" => Some(TxKind::Set),
            "ROLLBACK" => Some(TxKind::Rollback),
            _ => None,
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-assigned id
    pub id: i64,

    /// Advisory player uuid
    pub player_uuid: String,

    /// Player name
    pub player_name: String,

    /// Currency id
    pub currency_id: i64,

    /// Mutation kind
    pub kind: TxKind,

    /// Absolute magnitude of the change
    pub amount: Decimal,

    /// Balance witnessed before the mutation
    pub balance_before: Decimal,

    /// Balance after the mutation
    pub balance_after: Decimal,

    /// Free-text reason, non-empty
    pub reason: String,

    /// Free-text operator, non-empty
    pub operator: String,

    /// Wall-clock instant of the append
    pub occurred_at: DateTime<Utc>,
}

/// Audit row awaiting insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub player_uuid: String,
    pub player_name: String,
    pub currency_id: i64,
    pub kind: TxKind,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reason: String,
    pub operator: String,
    pub occurred_at: DateTime<Utc>,
}

/// One account row captured in a snapshot batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRow {
    /// Store-assigned id
    pub id: i64,

    /// Batch identifier shared by all rows of one snapshot
    pub snapshot_id: String,

    /// Advisory player uuid
    pub player_uuid: String,

    /// Player name
    pub player_name: String,

    /// Currency id
    pub currency_id: i64,

    /// Balance at snapshot time
    pub balance: Decimal,

    /// Batch memo shared by all rows of one snapshot
    pub memo: String,

    /// Batch instant shared by all rows of one snapshot
    pub created_at: DateTime<Utc>,
}

/// Summary of one distinct snapshot batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Batch identifier
    pub snapshot_id: String,

    /// Batch memo
    pub memo: String,

    /// Batch instant
    pub created_at: DateTime<Utc>,

    /// Number of account rows covered
    pub accounts: i64,
}

/// Account view returned to external callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    /// Currency identifier
    pub currency: String,

    /// Current balance
    pub balance: Decimal,

    /// Per-account cap override; -1 inherits the currency default
    pub max_balance: i64,
}

/// The full change tuple carried by hooks and the audit trail
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub player_name: String,
    pub player_uuid: String,
    /// Currency identifier
    pub currency: String,
    pub kind: TxKind,
    /// Absolute magnitude of the change
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reason: String,
    pub operator: String,
}

/// Failure classification for user-visible mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Durable store offline or schema not synchronized
    NotReady,
    /// Negative, zero where positivity is required, or unparseable amount
    InvalidAmount,
    /// No such currency
    UnknownCurrency,
    /// Currency disabled for deposits and withdrawals
    CurrencyDisabled,
    /// Withdrawal larger than the current balance
    InsufficientFunds,
    /// Deposit would exceed the effective balance cap
    LimitExceeded,
    /// A pre-change hook cancelled the mutation
    Cancelled,
    /// Optimistic version retries exhausted on the direct path
    Conflict,
    /// Infrastructure failure
    Internal,
}

impl FailureKind {
    /// Stable external error code
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::NotReady => "NOT_READY",
            FailureKind::InvalidAmount => "INVALID_AMOUNT",
            FailureKind::UnknownCurrency => "UNKNOWN_CURRENCY",
            FailureKind::CurrencyDisabled => "CURRENCY_DISABLED",
            FailureKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            FailureKind::LimitExceeded => "LIMIT_EXCEEDED",
            FailureKind::Cancelled => "CANCELLED",
            FailureKind::Conflict => "CONFLICT",
            FailureKind::Internal => "GENERIC_FAILURE",
        }
    }
}

/// Outcome of a user-visible balance mutation
///
/// Mutations never return `Err`; infrastructure failures surface as
/// `Failure { kind: Internal }` with the last known balance.
#[derive(Debug, Clone, PartialEq)]
pub enum EconomyResponse {
    /// The mutation was accepted; `balance` is the resulting balance
    Success {
        /// Balance after the mutation
        balance: Decimal,
    },
    /// The mutation was rejected; no state changed
    Failure {
        /// Failure classification
        kind: FailureKind,
        /// Last known balance
        balance: Decimal,
        /// Short human-readable message
        message: String,
    },
}

impl EconomyResponse {
    /// Successful outcome
    pub fn success(balance: Decimal) -> Self {
        EconomyResponse::Success { balance }
    }

    /// Failed outcome
    pub fn failure(kind: FailureKind, balance: Decimal, message: impl Into<String>) -> Self {
        EconomyResponse::Failure {
            kind,
            balance,
            message: message.into(),
        }
    }

    /// True for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, EconomyResponse::Success { .. })
    }

    /// Balance carried by either variant
    pub fn balance(&self) -> Decimal {
        match self {
            EconomyResponse::Success { balance } => *balance,
            EconomyResponse::Failure { balance, .. } => *balance,
        }
    }

    /// Stable external code for administrator-side mapping
    pub fn code(&self) -> &'static str {
        match self {
            EconomyResponse::Success { .. } => "SUCCESS",
            EconomyResponse::Failure { kind, .. } => kind.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_kind_roundtrip() {
        for kind in [TxKind::Deposit, TxKind::Withdraw, TxKind::Set, TxKind::Rollback] {
            assert_eq!(TxKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TxKind::parse("TRANSFER"), None);
    }

    #[test]
    fn test_response_codes() {
        let ok = EconomyResponse::success(Decimal::ONE);
        assert!(ok.is_success());
        assert_eq!(ok.code(), "SUCCESS");
        assert_eq!(ok.balance(), Decimal::ONE);

        let err = EconomyResponse::failure(FailureKind::InsufficientFunds, Decimal::ZERO, "no funds");
        assert!(!err.is_success());
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(err.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_currency_digits_clamped() {
        let mut currency = Currency {
            id: 1,
            identifier: "coin".into(),
            name: "Coin".into(),
            symbol: "$".into(),
            precision: 12,
            default_max_balance: -1,
            primary: true,
            enabled: true,
            deleted: false,
            console_log: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(currency.digits(), 8);
        currency.precision = -3;
        assert_eq!(currency.digits(), 0);
        assert!(currency.unlimited());
    }
}
