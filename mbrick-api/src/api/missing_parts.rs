//! Missing part and set part endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use mbrick_common::models::{MissingPart, NewSetPart, SetPart};
use mbrick_common::Error;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::services::MissingPartRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub set_id: i64,
    pub part_requests: Vec<MissingPartRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MissingPartsQuery {
    /// Only rows still flagged missing
    #[serde(default)]
    pub missing_only: bool,
}

/// POST /api/v1/missing-parts
pub async fn assign_missing_parts(
    State(state): State<AppState>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<MissingPart>>)> {
    let Json(request) = body?;
    let created = state
        .missing_parts
        .assign(request.set_id, request.part_requests)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/missing-parts/:set_id
pub async fn get_missing_parts_by_set(
    State(state): State<AppState>,
    set_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<MissingPartsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MissingPart>>> {
    let Path(set_id) = set_id?;
    let Query(query) = query?;

    let rows = if query.missing_only {
        state.missing_parts.get_missing_by_set(set_id).await?
    } else {
        state.missing_parts.get_by_set(set_id).await?
    };
    Ok(Json(rows))
}

/// PUT /api/v1/missing-parts/:id/found
pub async fn mark_found(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.missing_parts.mark_found(id).await?;
    Ok(Json(json!({ "message": "Missing part marked as found" })))
}

/// PUT /api/v1/missing-parts/:id/missing
pub async fn mark_missing(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.missing_parts.mark_missing(id).await?;
    Ok(Json(json!({ "message": "Missing part marked as missing" })))
}

/// DELETE /api/v1/missing-parts/:id
pub async fn delete_missing_part(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.missing_parts.delete(id).await?;
    Ok(Json(json!({ "message": "Missing part deleted successfully" })))
}

/// POST /api/v1/set-parts
///
/// Adds a single set part by hand, outside of catalog sync.
pub async fn create_set_part(
    State(state): State<AppState>,
    body: Result<Json<NewSetPart>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SetPart>)> {
    let Json(set_part) = body?;
    // Both ends must be live rows
    state.sets.get(set_part.set_id).await?;
    state
        .parts
        .get(set_part.part_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("part {}", set_part.part_id)))?;

    let created = state.set_parts.create(set_part).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/v1/set-parts/:id
pub async fn delete_set_part(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.set_parts.delete(id).await?;
    Ok(Json(json!({ "message": "Set part deleted successfully" })))
}

pub fn missing_part_routes() -> Router<AppState> {
    Router::new()
        .route("/missing-parts", post(assign_missing_parts))
        // `:id` is a set id for GET and a missing part id for DELETE
        .route(
            "/missing-parts/:id",
            get(get_missing_parts_by_set).delete(delete_missing_part),
        )
        .route("/missing-parts/:id/found", put(mark_found))
        .route("/missing-parts/:id/missing", put(mark_missing))
        .route("/set-parts", post(create_set_part))
        .route("/set-parts/:id", delete(delete_set_part))
}
