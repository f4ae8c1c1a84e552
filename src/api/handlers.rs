use crate::api::error::ApiResult;
use crate::api::principal::principal_from_headers;
use crate::api::AppState;
use crate::service::{ListFilter, Stats, SubmitRequest};
use crate::state::Application;
use crate::error::Error;
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Body of approve/reject requests
#[derive(Debug, Default, Deserialize)]
pub struct DecisionBody {
    #[serde(default)]
    pub remarks: Option<String>,
}

impl DecisionBody {
    /// An empty body means "no remarks"; anything else must be the JSON object.
    /// The content type is not checked.
    fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(DecisionBody::default());
        }
        serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidInput(format!("Invalid decision body: {}", e)))
    }
}

pub async fn list_applications(
    State(state): State<AppState>,
    headers: HeaderMap,
    filter: Result<Query<ListFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Application>>> {
    let principal = principal_from_headers(&headers)?;
    let Query(filter) = filter?;
    let apps = state.listing.list(&principal, &filter)?;
    Ok(Json(apps))
}

pub async fn application_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Stats>> {
    let principal = principal_from_headers(&headers)?;
    Ok(Json(state.listing.stats(&principal)?))
}

pub async fn get_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Application>> {
    let principal = principal_from_headers(&headers)?;
    Ok(Json(state.listing.get(&principal, &id)?))
}

pub async fn submit_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let principal = principal_from_headers(&headers)?;
    let Json(request) = request?;
    let app = state.applications.submit(&principal, request)?;
    Ok((StatusCode::CREATED, Json(app)))
}

pub async fn approve_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Application>> {
    let principal = principal_from_headers(&headers)?;
    let body = DecisionBody::parse(&body)?;
    Ok(Json(state.applications.approve(&principal, &id, body.remarks)?))
}

pub async fn reject_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Application>> {
    let principal = principal_from_headers(&headers)?;
    let body = DecisionBody::parse(&body)?;
    Ok(Json(state.applications.reject(&principal, &id, body.remarks)?))
}
