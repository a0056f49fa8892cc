use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use carsearch_common::{CarSearchError, FieldCatalog, SearchPage, SearchRequest};
use carsearch_core::search::{DEFAULT_Q, DEFAULT_SORT_BY};
use carsearch_core::{SearchDeps, SearchOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(deps: Arc<SearchDeps>, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/search", post(search))
        .route("/api/cars", get(cars))
        .route("/api/catalog", get(catalog))
        .route("/api/catalog/invalidate", post(invalidate_catalog))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(deps)
}

// =============================================================================
// Errors
// =============================================================================

pub struct ApiError(CarSearchError);

impl From<CarSearchError> for ApiError {
    fn from(e: CarSearchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CarSearchError::Generation(_) | CarSearchError::Search(_) => StatusCode::BAD_GATEWAY,
            CarSearchError::Validation(_) => StatusCode::BAD_REQUEST,
            CarSearchError::Config(_) | CarSearchError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "Request failed");
        } else {
            tracing::info!(kind = self.0.kind(), error = %self.0, "Request rejected");
        }

        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub q: String,
}

async fn search(
    State(deps): State<Arc<SearchDeps>>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let Json(body) = body.map_err(|rejection| CarSearchError::Validation(rejection.body_text()))?;
    Ok(Json(deps.search_cars(&body.q).await?))
}

/// Parameters of an earlier translation, for fetching further pages.
#[derive(Debug, Deserialize)]
pub struct CarsQuery {
    pub q: Option<String>,
    pub filter_by: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
}

impl CarsQuery {
    fn into_request(self) -> (SearchRequest, u32) {
        let request = SearchRequest {
            q: self
                .q
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_Q.to_string()),
            filter_by: self.filter_by.unwrap_or_default(),
            sort_by: self
                .sort_by
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SORT_BY.to_string()),
        };
        (request, self.page.unwrap_or(1))
    }
}

async fn cars(
    State(deps): State<Arc<SearchDeps>>,
    Query(query): Query<CarsQuery>,
) -> Result<Json<SearchPage>, ApiError> {
    let (request, page) = query.into_request();
    Ok(Json(deps.search_page(&request, page).await?))
}

async fn catalog(State(deps): State<Arc<SearchDeps>>) -> Result<Json<FieldCatalog>, ApiError> {
    let catalog = deps.catalog().await?;
    Ok(Json(catalog.as_ref().clone()))
}

#[derive(Serialize)]
struct Invalidated {
    invalidated: bool,
}

async fn invalidate_catalog(State(deps): State<Arc<SearchDeps>>) -> Json<Invalidated> {
    Json(Invalidated {
        invalidated: deps.invalidate_catalog(),
    })
}
