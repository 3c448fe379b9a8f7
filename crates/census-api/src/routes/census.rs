//! # Census Routes
//!
//! - `POST /api/submit`: record a participant's nationality
//! - `GET  /api/census`: ranked per-country tally
//!
//! Both handlers are thin: validation happens in [`Validate`], tally logic in
//! [`census_store::CensusStore`].

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use census_core::{Address, CensusStats, CountryCount, Nationality, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Outcome label for submissions that failed validation.
const OUTCOME_REJECTED: &str = "rejected";
/// Outcome label for submissions the store failed to record.
const OUTCOME_FAILED: &str = "failed";

/// Assemble the census router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/submit", post(submit))
        .route("/api/census", get(census_stats))
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/submit`.
///
/// Fields are optional at the serde level so that a missing field is reported
/// as a validation error naming it, rather than a generic parse failure.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Wallet address of the participant. Compared case-insensitively.
    #[serde(default)]
    pub address: Option<String>,
    /// Nationality label, stored verbatim.
    #[serde(default)]
    pub nationality: Option<String>,
}

impl Validate for SubmitRequest {
    type Valid = (Address, Nationality);

    fn validate(self) -> Result<Self::Valid, ValidationError> {
        let address = Address::new(self.address.unwrap_or_default())?;
        let nationality = Nationality::new(self.nationality.unwrap_or_default())?;
        Ok((address, nationality))
    }
}

/// Body returned by a successful submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
}

/// One row of the ranked tally.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountryCountResponse {
    pub country: String,
    pub count: u64,
}

/// Body of `GET /api/census`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CensusResponse {
    /// Countries with a non-zero count, highest first, ties by name.
    pub countries: Vec<CountryCountResponse>,
    /// Distinct participating addresses.
    pub total: u64,
}

impl From<CountryCount> for CountryCountResponse {
    fn from(row: CountryCount) -> Self {
        Self {
            country: row.country,
            count: row.count,
        }
    }
}

impl From<CensusStats> for CensusResponse {
    fn from(stats: CensusStats) -> Self {
        Self {
            countries: stats.countries.into_iter().map(Into::into).collect(),
            total: stats.total,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/submit: record a participant's nationality.
#[utoipa::path(
    post,
    path = "/api/submit",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Submission recorded", body = SubmitResponse),
        (status = 400, description = "Missing, empty or mistyped field", body = crate::error::ErrorBody),
        (status = 500, description = "Store failure", body = crate::error::ErrorBody),
        (status = 503, description = "Store unreachable or timed out", body = crate::error::ErrorBody),
    ),
    tag = "census"
)]
pub(crate) async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let (address, nationality) = match extract_validated_json(body) {
        Ok(valid) => valid,
        Err(e) => {
            state.metrics.record_submission(OUTCOME_REJECTED);
            return Err(e);
        }
    };

    match state.store.record(&address, &nationality).await {
        Ok(outcome) => {
            state.metrics.record_submission(outcome.as_str());
            Ok(Json(SubmitResponse { success: true }))
        }
        Err(e) => {
            state.metrics.record_submission(OUTCOME_FAILED);
            Err(e.into())
        }
    }
}

/// GET /api/census: ranked per-country tally.
///
/// A store failure is logged and answered with an empty census, so the
/// display keeps rendering while the backend recovers.
#[utoipa::path(
    get,
    path = "/api/census",
    responses(
        (status = 200, description = "Ranked tally (empty if the store is failing)", body = CensusResponse),
    ),
    tag = "census"
)]
pub(crate) async fn census_stats(State(state): State<AppState>) -> Json<CensusResponse> {
    let stats = match state.store.get_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %e, "serving empty census after stats failure");
            state.metrics.record_stats_fallback();
            CensusStats::empty()
        }
    };
    Json(stats.into())
}
