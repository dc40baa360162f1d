//! Prometheus metrics for the account service.
//!
//! - `cia_bots_created_total` - Bots created by add-bot requests
//! - `cia_networks_created_total` - Networks created from "other network" selections
//! - `cia_asset_conflicts_total` - Claims refused because another user owns the asset
//! - `cia_changesets_committed_total{asset}` - Changesets written to the ledger
//! - `cia_bot_cloud_lookups_total{result}` - Bot cloud cache lookups (hit, fill, placeholder)
//! - `cia_bot_server_errors_total{call,error}` - Failed bot server calls
//! - `cia_account_errors_total{error}` - Workflow errors by code

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Bots created by add-bot requests.
pub static BOTS_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// Networks created by users.
pub static NETWORKS_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// Claims answered with a conflict.
pub static ASSET_CONFLICTS: OnceLock<IntCounter> = OnceLock::new();

/// Changesets committed, by asset kind.
pub static CHANGESETS_COMMITTED: OnceLock<IntCounterVec> = OnceLock::new();

/// Bot cloud lookups by result.
pub static BOT_CLOUD_LOOKUPS: OnceLock<IntCounterVec> = OnceLock::new();

/// Bot server call failures by call and error kind.
pub static BOT_SERVER_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Workflow errors by code.
pub static ACCOUNT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(BOTS_CREATED, IntCounter::new("cia_bots_created_total", "Bots created"));
    register!(NETWORKS_CREATED, IntCounter::new("cia_networks_created_total", "Networks created by users"));
    register!(ASSET_CONFLICTS, IntCounter::new("cia_asset_conflicts_total", "Asset claims refused because of another owner"));
    register!(CHANGESETS_COMMITTED, IntCounterVec::new(Opts::new("cia_changesets_committed_total", "Changesets committed"), &["asset"]));
    register!(BOT_CLOUD_LOOKUPS, IntCounterVec::new(Opts::new("cia_bot_cloud_lookups_total", "Bot cloud cache lookups"), &["result"]));
    register!(BOT_SERVER_ERRORS, IntCounterVec::new(Opts::new("cia_bot_server_errors_total", "Failed bot server calls"), &["call", "error"]));
    register!(ACCOUNT_ERRORS, IntCounterVec::new(Opts::new("cia_account_errors_total", "Account workflow errors"), &["error"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
fn inc_vec(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

pub fn record_bot_created() {
    inc(&BOTS_CREATED);
}

pub fn record_network_created() {
    inc(&NETWORKS_CREATED);
}

pub fn record_conflict() {
    inc(&ASSET_CONFLICTS);
}

pub fn record_changeset(asset: &str) {
    inc_vec(&CHANGESETS_COMMITTED, &[asset]);
}

/// `result` is one of `hit`, `fill` or `placeholder`.
pub fn record_cloud_lookup(result: &str) {
    inc_vec(&BOT_CLOUD_LOOKUPS, &[result]);
}

pub fn record_bot_server_error(call: &str, error: &str) {
    inc_vec(&BOT_SERVER_ERRORS, &[call, error]);
}

pub fn record_account_error(error: &str) {
    inc_vec(&ACCOUNT_ERRORS, &[error]);
}
