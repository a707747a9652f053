//! Set endpoints
//!
//! /api/v1/sets and its sub-resources.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use mbrick_common::models::{Set, SetUpdate, SetWithMissingParts, SetWithParts};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body of the create and sync endpoints
#[derive(Debug, Deserialize)]
pub struct SetNumRequest {
    pub set_num: String,
}

#[derive(Debug, Serialize)]
pub struct SetListResponse {
    pub sets: Vec<Set>,
}

/// GET /api/v1/sets
pub async fn list_sets(State(state): State<AppState>) -> ApiResult<Json<SetListResponse>> {
    let sets = state.sets.get_all().await?;
    Ok(Json(SetListResponse { sets }))
}

/// GET /api/v1/sets/:id
pub async fn get_set(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Set>> {
    let Path(id) = id?;
    Ok(Json(state.sets.get(id).await?))
}

/// GET /api/v1/sets/by-num/:set_num
pub async fn get_set_by_num(
    State(state): State<AppState>,
    Path(set_num): Path<String>,
) -> ApiResult<Json<Set>> {
    Ok(Json(state.sets.get_by_set_num(&set_num).await?))
}

/// GET /api/v1/sets/:id/missing-parts
pub async fn get_set_with_missing_parts(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SetWithMissingParts>> {
    let Path(id) = id?;
    Ok(Json(state.sets.get_with_missing_parts(id).await?))
}

/// GET /api/v1/sets/:id/with-parts
pub async fn get_set_with_parts(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SetWithParts>> {
    let Path(id) = id?;
    Ok(Json(state.sets.get_with_parts(id).await?))
}

/// GET /api/v1/sets/:id/parts
pub async fn get_set_parts(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let set = state.sets.get(id).await?;
    let set_parts = state.set_parts.get_set_parts(set.id).await?;
    Ok(Json(json!({ "set_parts": set_parts })))
}

/// POST /api/v1/sets
///
/// Creates the set from the catalog and imports its part list.
pub async fn create_set(
    State(state): State<AppState>,
    body: Result<Json<SetNumRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Set>)> {
    let Json(request) = body?;
    let set = state.sets.create_with_parts(&request.set_num).await?;
    Ok((StatusCode::CREATED, Json(set)))
}

/// POST /api/v1/sets/sync
pub async fn sync_set(
    State(state): State<AppState>,
    body: Result<Json<SetNumRequest>, JsonRejection>,
) -> ApiResult<Json<Set>> {
    let Json(request) = body?;
    Ok(Json(state.sets.sync_from_rebrickable(&request.set_num).await?))
}

/// PUT /api/v1/sets/:id
pub async fn update_set(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<SetUpdate>, JsonRejection>,
) -> ApiResult<Json<Set>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(state.sets.update(id, update).await?))
}

/// DELETE /api/v1/sets/:id
pub async fn delete_set(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.sets.delete(id).await?;
    Ok(Json(json!({ "message": "Set deleted successfully" })))
}

/// Optional body of the part resync endpoint
#[derive(Debug, Default, Deserialize)]
pub struct SyncPartsRequest {
    #[serde(default)]
    pub set_num: Option<String>,
}

/// POST /api/v1/sets/:id/sync-parts
///
/// Rebuilds the part list from the catalog. The body may name a different
/// catalog code; without one the set's own code is used.
pub async fn sync_set_parts(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let request: SyncPartsRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SyncPartsRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let count = state.sets.resync_parts(id, request.set_num).await?;
    Ok(Json(json!({
        "message": "Set parts synchronized successfully",
        "count": count,
    })))
}

pub fn set_routes() -> Router<AppState> {
    Router::new()
        .route("/sets", get(list_sets).post(create_set))
        .route("/sets/sync", post(sync_set))
        .route("/sets/by-num/:set_num", get(get_set_by_num))
        .route("/sets/:id", get(get_set).put(update_set).delete(delete_set))
        .route("/sets/:id/missing-parts", get(get_set_with_missing_parts))
        .route("/sets/:id/with-parts", get(get_set_with_parts))
        .route("/sets/:id/parts", get(get_set_parts))
        .route("/sets/:id/sync-parts", post(sync_set_parts))
}
