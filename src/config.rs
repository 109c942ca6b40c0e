//! Configuration for the economy core

use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rounding mode applied when scaling amounts to a currency's precision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMode {
    /// Round away from zero
    Up,
    /// Truncate toward zero
    #[default]
    Down,
    /// Round toward positive infinity
    Ceiling,
    /// Round toward negative infinity
    Floor,
    /// Round half away from zero
    HalfUp,
    /// Round half toward zero
    HalfDown,
    /// Banker's rounding
    HalfEven,
}

impl RoundingMode {
    /// Map onto the decimal library's strategy
    pub fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Ceiling => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(RoundingMode::Up),
            "DOWN" => Ok(RoundingMode::Down),
            "CEILING" => Ok(RoundingMode::Ceiling),
            "FLOOR" => Ok(RoundingMode::Floor),
            "HALF_UP" => Ok(RoundingMode::HalfUp),
            "HALF_DOWN" => Ok(RoundingMode::HalfDown),
            "HALF_EVEN" => Ok(RoundingMode::HalfEven),
            other => Err(format!("unrecognized rounding mode '{other}'")),
        }
    }
}

/// Economy core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Durable store binding
    pub database: DatabaseConfig,

    /// Seed currency created when the store holds no currency at all
    pub default_currency: DefaultCurrencyConfig,

    /// Rounding mode for amount scaling
    pub rounding_mode: RoundingMode,

    /// Async executor tuning
    pub executor: ExecutorConfig,

    /// Snapshot retention
    pub backup: BackupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            default_currency: DefaultCurrencyConfig::default(),
            rounding_mode: RoundingMode::Down,
            executor: ExecutorConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Datasource URL, e.g. `sqlite://economy.db`
    pub url: String,

    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://economy.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Seed primary currency, used only when the currency table is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultCurrencyConfig {
    /// Lowercase business key
    pub identifier: String,

    /// Display name
    pub name: String,

    /// Display symbol
    pub symbol: String,

    /// Fractional digits, clamped to [0, 8]
    pub precision: i32,

    /// Balance cap; -1 means unlimited
    pub default_max_balance: i64,

    /// Emit a console line for every successful mutation
    pub console_log: bool,
}

impl Default for DefaultCurrencyConfig {
    fn default() -> Self {
        Self {
            identifier: "coin".to_string(),
            name: "Coin".to_string(),
            symbol: "$".to_string(),
            precision: 2,
            default_max_balance: -1,
            console_log: false,
        }
    }
}

/// Async executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Bounded work queue capacity
    pub queue_capacity: usize,

    /// Worker count; 0 means hardware parallelism
    pub workers: usize,

    /// Maximum time to wait for in-flight tasks on shutdown
    pub shutdown_wait_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 0,
            shutdown_wait_secs: 10,
        }
    }
}

/// Snapshot retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Retention cap for distinct snapshots
    pub max_snapshots: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { max_snapshots: 50 }
    }
}

impl Config {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Load defaults overridden by `ECONOMY_*` environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("ECONOMY_DATABASE_URL") {
            config.database.url = url;
        }

        if let Ok(mode) = std::env::var("ECONOMY_ROUNDING_MODE") {
            config.rounding_mode = mode
                .parse()
                .map_err(crate::Error::Config)?;
        }

        if let Ok(max) = std::env::var("ECONOMY_MAX_SNAPSHOTS") {
            config.backup.max_snapshots = max
                .parse()
                .map_err(|e| crate::Error::Config(format!("ECONOMY_MAX_SNAPSHOTS: {e}")))?;
        }

        if let Ok(wait) = std::env::var("ECONOMY_SHUTDOWN_WAIT_SECS") {
            config.executor.shutdown_wait_secs = wait
                .parse()
                .map_err(|e| crate::Error::Config(format!("ECONOMY_SHUTDOWN_WAIT_SECS: {e}")))?;
        }

        Ok(config)
    }
}
