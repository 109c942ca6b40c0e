//! Metrics collection for observability
//!
//! Counters live on an owned registry so that several ledger instances can
//! coexist in one process (tests open many).

use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful balance mutations, both paths
    pub mutations_total: IntCounter,

    /// Optimistic version conflicts observed
    pub conflicts_total: IntCounter,

    /// Cache entries resynced from persistence after a conflict
    pub cache_resyncs_total: IntCounter,

    /// Audit appends that failed and were only logged
    pub audit_failures_total: IntCounter,

    /// Snapshots created
    pub snapshots_total: IntCounter,

    registry: Arc<Registry>,
}

impl Metrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let mutations_total = IntCounter::new(
            "economy_mutations_total",
            "Successful balance mutations",
        )?;
        registry.register(Box::new(mutations_total.clone()))?;

        let conflicts_total = IntCounter::new(
            "economy_version_conflicts_total",
            "Optimistic version conflicts observed",
        )?;
        registry.register(Box::new(conflicts_total.clone()))?;

        let cache_resyncs_total = IntCounter::new(
            "economy_cache_resyncs_total",
            "Cache entries resynced from persistence",
        )?;
        registry.register(Box::new(cache_resyncs_total.clone()))?;

        let audit_failures_total = IntCounter::new(
            "economy_audit_failures_total",
            "Audit appends that failed",
        )?;
        registry.register(Box::new(audit_failures_total.clone()))?;

        let snapshots_total = IntCounter::new(
            "economy_snapshots_total",
            "Snapshots created",
        )?;
        registry.register(Box::new(snapshots_total.clone()))?;

        Ok(Self {
            mutations_total,
            conflicts_total,
            cache_resyncs_total,
            audit_failures_total,
            snapshots_total,
            registry,
        })
    }

    /// Prometheus registry for scraping
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
