//! Prometheus export, HTTP request metrics and the counters recorded by the
//! POS client, catalog sync and order dispatch.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::services::ReconcileCounts;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Matched route template; unrouted paths all share one label.
fn route_label(req: &Request<Body>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        _ => "OTHER",
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Count requests per route and status class and time them per route.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = method_label(req.method());
    let route = route_label(&req);

    let response = next.run(req).await;

    counter!(
        "http_requests_total",
        "method" => method,
        "route" => route.clone(),
        "status" => status_class(response.status())
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(started.elapsed().as_secs_f64());

    response
}

/// Record one call to the POS provider.
pub fn record_pos_request(operation: &'static str, outcome: &'static str, duration_secs: f64) {
    counter!(
        "pos_requests_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("pos_request_duration_seconds", "operation" => operation).record(duration_secs);
}

/// Record a credential refresh against the POS provider.
pub fn record_pos_auth_refresh() {
    counter!("pos_auth_refresh_total").increment(1);
}

/// Record reconciliation counters for one entity kind.
pub fn record_sync_records(entity: &'static str, counts: &ReconcileCounts) {
    for (outcome, value) in [
        ("created", counts.created),
        ("updated", counts.updated),
        ("skipped", counts.skipped),
        ("failed", counts.failed),
    ] {
        if value > 0 {
            counter!(
                "catalog_sync_records_total",
                "entity" => entity,
                "outcome" => outcome
            )
            .increment(value);
        }
    }
}

/// Record the outcome of an order dispatch attempt.
pub fn record_order_dispatch(outcome: &'static str) {
    counter!("order_dispatch_total", "outcome" => outcome).increment(1);
}

/// GET /metrics in Prometheus text format.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once during application startup before any metrics are
/// recorded. A second call is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 30.0])?
        .install_recorder()?;

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle was initialized concurrently");
    }
    Ok(())
}
