// Private module declaration
mod server;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers:
// - Order commands (created, acknowledged, remote failures)
// - Pushed events (applied vs ignored)
// - Startup reconciliation outcomes
// - Inventory adjustments
// - Snapshot writes
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub orders_created: IntCounter,
    pub orders_acknowledged: IntCounter,
    pub remote_command_failures: IntCounterVec,

    // Event Metrics
    pub events_applied: IntCounterVec,
    pub events_ignored: IntCounterVec,

    // Reconciliation Metrics
    pub orders_reconciled: IntCounterVec,

    // Inventory Metrics
    pub inventory_adjustments: IntCounterVec,

    // Persistence Metrics
    pub persistence_writes: IntCounter,
    pub persistence_failures: IntCounter,

    pub tracked_orders: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Orders accepted by the controller")?;
        registry.register(Box::new(orders_created.clone()))?;

        let orders_acknowledged = IntCounter::new(
            "orders_acknowledged_total",
            "Acknowledgements sent to the controller",
        )?;
        registry.register(Box::new(orders_acknowledged.clone()))?;

        let remote_command_failures = IntCounterVec::new(
            Opts::new("remote_command_failures_total", "Remote commands that failed"),
            &["command"],
        )?;
        registry.register(Box::new(remote_command_failures.clone()))?;

        let events_applied = IntCounterVec::new(
            Opts::new("events_applied_total", "Pushed events applied to tracked orders"),
            &["kind"],
        )?;
        registry.register(Box::new(events_applied.clone()))?;

        let events_ignored = IntCounterVec::new(
            Opts::new("events_ignored_total", "Pushed events without a local effect"),
            &["kind"],
        )?;
        registry.register(Box::new(events_ignored.clone()))?;

        let orders_reconciled = IntCounterVec::new(
            Opts::new("orders_reconciled_total", "Startup reconciliation outcomes"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_reconciled.clone()))?;

        let inventory_adjustments = IntCounterVec::new(
            Opts::new("inventory_adjustments_total", "Article quantity adjustments"),
            &["mode"],
        )?;
        registry.register(Box::new(inventory_adjustments.clone()))?;

        let persistence_writes = IntCounter::new("persistence_writes_total", "Order snapshots written")?;
        registry.register(Box::new(persistence_writes.clone()))?;

        let persistence_failures = IntCounter::new(
            "persistence_failures_total",
            "Order snapshots that failed to write",
        )?;
        registry.register(Box::new(persistence_failures.clone()))?;

        let tracked_orders = IntGauge::new("tracked_orders", "Orders currently in the local cache")?;
        registry.register(Box::new(tracked_orders.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            orders_acknowledged,
            remote_command_failures,
            events_applied,
            events_ignored,
            orders_reconciled,
            inventory_adjustments,
            persistence_writes,
            persistence_failures,
            tracked_orders,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_remote_failure(&self, command: &str) {
        self.remote_command_failures.with_label_values(&[command]).inc();
    }

    pub fn record_event(&self, kind: &str, applied: bool) {
        if applied {
            self.events_applied.with_label_values(&[kind]).inc();
        } else {
            self.events_ignored.with_label_values(&[kind]).inc();
        }
    }

    pub fn record_reconciled(&self, outcome: &str) {
        self.orders_reconciled.with_label_values(&[outcome]).inc();
    }

    pub fn record_adjustment(&self, mode: &str) {
        self.inventory_adjustments.with_label_values(&[mode]).inc();
    }

    pub fn record_save(&self, success: bool, tracked: usize) {
        if success {
            self.persistence_writes.inc();
        } else {
            self.persistence_failures.inc();
        }
        self.tracked_orders.set(tracked as i64);
    }
}
