//! # Prometheus Metrics
//!
//! Operational metrics for the vending machine service. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics
//! port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the service.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it can
/// be shared across request handlers.
#[derive(Clone)]
pub struct MachineMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of coins accepted into the machine.
    pub coins_inserted_total: IntCounter,
    /// Total coin value returned to customers (ejects and change).
    pub coins_returned_total: IntCounter,
    /// Total number of items successfully dispensed.
    pub items_dispensed_total: IntCounter,
    /// Total purchase attempts rejected (unknown slot, sold out, short paid).
    pub dispense_rejections_total: IntCounter,
    /// Total admin inventory resets performed.
    pub inventory_resets_total: IntCounter,
    /// Coin balance currently held by the machine.
    pub coin_balance: IntGauge,
    /// Histogram of full dispense-cycle latency in seconds, snapshot
    /// write included.
    pub dispense_latency_seconds: Histogram,
}

impl MachineMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vendo".into()), None)
            .expect("failed to create prometheus registry");

        let coins_inserted_total =
            IntCounter::new("coins_inserted_total", "Total coins accepted by the machine")
                .expect("metric creation");
        registry
            .register(Box::new(coins_inserted_total.clone()))
            .expect("metric registration");

        let coins_returned_total = IntCounter::new(
            "coins_returned_total",
            "Total coin value returned to customers as ejects or change",
        )
        .expect("metric creation");
        registry
            .register(Box::new(coins_returned_total.clone()))
            .expect("metric registration");

        let items_dispensed_total = IntCounter::new(
            "items_dispensed_total",
            "Total items successfully dispensed",
        )
        .expect("metric creation");
        registry
            .register(Box::new(items_dispensed_total.clone()))
            .expect("metric registration");

        let dispense_rejections_total = IntCounter::new(
            "dispense_rejections_total",
            "Total purchase attempts rejected before vending",
        )
        .expect("metric creation");
        registry
            .register(Box::new(dispense_rejections_total.clone()))
            .expect("metric registration");

        let inventory_resets_total = IntCounter::new(
            "inventory_resets_total",
            "Total admin inventory resets performed",
        )
        .expect("metric creation");
        registry
            .register(Box::new(inventory_resets_total.clone()))
            .expect("metric registration");

        let coin_balance =
            IntGauge::new("coin_balance", "Coin balance currently held by the machine")
                .expect("metric creation");
        registry
            .register(Box::new(coin_balance.clone()))
            .expect("metric registration");

        let dispense_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "dispense_latency_seconds",
                "Full dispense-cycle latency in seconds, snapshot write included",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(dispense_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            coins_inserted_total,
            coins_returned_total,
            items_dispensed_total,
            dispense_rejections_total,
            inventory_resets_total,
            coin_balance,
            dispense_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for MachineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<MachineMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
