//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented census routes into one OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the census API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "zk-census API",
        description = "Anonymous nationality census: participants submit their nationality once per wallet address and anyone can read the ranked per-country tally.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::census::submit,
        crate::routes::census::census_stats,
    ),
    components(schemas(
        crate::routes::census::SubmitRequest,
        crate::routes::census::SubmitResponse,
        crate::routes::census::CensusResponse,
        crate::routes::census::CountryCountResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "census", description = "Census submission and tally"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_census_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/submit"));
        assert!(doc.paths.paths.contains_key("/api/census"));
    }

    #[test]
    fn document_carries_error_schema() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().unwrap().schemas;
        assert!(schemas.contains_key("ErrorBody"));
        assert!(schemas.contains_key("CensusResponse"));
    }
}
