//! # Prometheus Metrics
//!
//! One `prometheus::Registry` per app instance, so tests can build many
//! routers side by side without colliding on a global registry.
//!
//! HTTP request counts and latency are recorded in middleware. Submission
//! outcomes and stats fallbacks are recorded by the census handlers. The
//! participant and country gauges are refreshed on each `/metrics` scrape
//! (pull model), see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Path label for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,

    // -- Census handler metrics (push model) --
    submissions_total: IntCounterVec,
    stats_fallbacks_total: IntCounter,

    // -- Tally gauges (pull model, updated on /metrics scrape) --
    participants: IntGauge,
    countries: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("stats_fallbacks", &self.stats_fallbacks())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("census_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "census_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )?;

        let submissions_total = IntCounterVec::new(
            Opts::new(
                "census_submissions_total",
                "Census submissions by outcome (created, refreshed, moved, rejected, failed)",
            ),
            &["outcome"],
        )?;

        let stats_fallbacks_total = IntCounter::new(
            "census_stats_fallbacks_total",
            "Stats requests answered with an empty census after a store failure",
        )?;

        let participants = IntGauge::new(
            "census_participants",
            "Distinct addresses with a census entry",
        )?;

        let countries = IntGauge::new(
            "census_countries",
            "Nationalities with a non-zero count",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(stats_fallbacks_total.clone()))?;
        registry.register(Box::new(participants.clone()))?;
        registry.register(Box::new(countries.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                submissions_total,
                stats_fallbacks_total,
                participants,
                countries,
            }),
        })
    }

    /// Total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        for mf in &self.inner.http_requests_total.collect() {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Number of submissions recorded with `outcome`.
    pub fn submissions(&self, outcome: &str) -> u64 {
        self.inner
            .submissions_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Number of stats fallbacks served.
    pub fn stats_fallbacks(&self) -> u64 {
        self.inner.stats_fallbacks_total.get()
    }

    /// Count one submission by outcome label.
    pub fn record_submission(&self, outcome: &str) {
        self.inner
            .submissions_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count one stats request answered with the empty census.
    pub fn record_stats_fallback(&self) {
        self.inner.stats_fallbacks_total.inc();
    }

    /// Set the tally gauges from a fresh snapshot.
    pub fn set_tally(&self, participants: u64, countries: usize) {
        self.inner
            .participants
            .set(i64::try_from(participants).unwrap_or(i64::MAX));
        self.inner
            .countries
            .set(i64::try_from(countries).unwrap_or(i64::MAX));
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

/// Middleware that records HTTP request metrics via Prometheus.
///
/// Labels requests by their route template so static-file paths and
/// unmatched URLs do not explode label cardinality.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_PATH.to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.stats_fallbacks(), 0);
        assert_eq!(m.submissions("created"), 0);
    }

    #[test]
    fn requests_increment() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/api/census", 200, 0.01);
        m.record_request("POST", "/api/submit", 400, 0.02);
        assert_eq!(m.requests(), 2);
    }

    #[test]
    fn submissions_are_counted_per_outcome() {
        let m = ApiMetrics::new().unwrap();
        m.record_submission("created");
        m.record_submission("created");
        m.record_submission("moved");
        assert_eq!(m.submissions("created"), 2);
        assert_eq!(m.submissions("moved"), 1);
        assert_eq!(m.submissions("failed"), 0);
    }

    #[test]
    fn separate_instances_do_not_share_counters() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.record_stats_fallback();
        assert_eq!(a.stats_fallbacks(), 1);
        assert_eq!(b.stats_fallbacks(), 0);
    }

    #[test]
    fn encoded_output_contains_census_metrics() {
        let m = ApiMetrics::new().unwrap();
        m.record_submission("refreshed");
        m.record_stats_fallback();
        m.set_tally(3, 2);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("census_submissions_total{outcome=\"refreshed\"} 1"));
        assert!(text.contains("census_stats_fallbacks_total 1"));
        assert!(text.contains("census_participants 3"));
        assert!(text.contains("census_countries 2"));
    }

    #[test]
    fn concurrent_increments_are_safe() {
        let m = ApiMetrics::new().unwrap();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        m.record_request("GET", "/api/census", 200, 0.001);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(m.requests(), 4000);
    }
}
