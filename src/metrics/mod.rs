use anyhow::{anyhow, Result};
use log::info;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

// Metrics for monitoring
pub const METRIC_REWARDS_GRANTED: &str = "rewards_granted_total";
pub const METRIC_AD_WATCHES_STARTED: &str = "ad_watches_started_total";
pub const METRIC_LISTING_FETCHES: &str = "listing_fetches_total";
pub const METRIC_LISTING_FETCH_FAILURES: &str = "listing_fetch_failures_total";
pub const METRIC_LISTING_FETCH_TIME: &str = "listing_fetch_seconds";
pub const METRIC_BALANCE_PERSIST_FAILURES: &str = "balance_persist_failures_total";
pub const METRIC_PURCHASES: &str = "purchases_total";
pub const METRIC_PURCHASE_FAILURES: &str = "purchase_failures_total";

pub fn describe_metrics() {
    describe_counter!(METRIC_REWARDS_GRANTED, "Ad-watch rewards granted");
    describe_counter!(METRIC_AD_WATCHES_STARTED, "Ad-watch sessions started");
    describe_counter!(METRIC_LISTING_FETCHES, "Listing fetches against the marketplace");
    describe_counter!(METRIC_LISTING_FETCH_FAILURES, "Listing fetches that returned an error state");
    describe_histogram!(METRIC_LISTING_FETCH_TIME, "Listing fetch latency in seconds");
    describe_counter!(METRIC_BALANCE_PERSIST_FAILURES, "Balance writes that did not land");
    describe_counter!(METRIC_PURCHASES, "Confirmed purchases");
    describe_counter!(METRIC_PURCHASE_FAILURES, "Purchases that failed or reverted");
}

/// Serves `/metrics` in Prometheus text format on the given port.
pub fn install_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow!("Failed to install metrics exporter: {}", e))?;

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
