//! # census-api: HTTP Service for the zk-census Tally
//!
//! Participants prove wallet ownership in the browser and post their
//! nationality here; anyone can read the ranked per-country tally.
//!
//! ## API Surface
//!
//! | Route                    | Module                 | Purpose                  |
//! |--------------------------|------------------------|--------------------------|
//! | `POST /api/submit`       | [`routes::census`]     | Record a submission      |
//! | `GET  /api/census`       | [`routes::census`]     | Ranked tally             |
//! | `GET  /openapi.json`     | [`openapi`]            | OpenAPI document         |
//! | `GET  /health/liveness`  | here                   | Process is up            |
//! | `GET  /health/readiness` | here                   | Store answers a ping     |
//! | `GET  /metrics`          | here                   | Prometheus scrape        |
//!
//! Unmatched paths fall through to the static front-end bundle when
//! `CENSUS_STATIC_DIR` is set, otherwise to a JSON 404.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → DefaultBodyLimit → Handler
//! ```

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Largest accepted request body. A submission is two short strings.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::census::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(state.metrics.clone()));
    }

    let mut probes = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        probes = probes.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    let router = Router::new().merge(probes).merge(api);

    let router = match &state.config.static_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "serving static front-end");
            router.fallback_service(ServeDir::new(dir))
        }
        None => router.fallback(not_found),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// GET /metrics: Prometheus metrics scrape endpoint.
///
/// Refreshes the tally gauges from the store on each scrape (pull model),
/// then gathers and encodes all metrics in Prometheus text format.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let metrics: &ApiMetrics = &state.metrics;

    match state.store.get_stats().await {
        Ok(stats) => metrics.set_tally(stats.total, stats.countries.len()),
        Err(e) => tracing::warn!(error = %e, "tally gauges not refreshed"),
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" once the tally store answers a ping,
/// otherwise 503.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(backend = %state.store.kind(), error = %e, "store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "census store unreachable").into_response()
        }
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
