//! Part catalog endpoints

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use mbrick_common::models::Part;
use mbrick_common::Error;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PartsQuery {
    /// Substring of the name or part number
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PartListResponse {
    pub parts: Vec<Part>,
}

/// GET /api/v1/parts
///
/// Lists every stored part, or only those matching `q`.
pub async fn list_parts(
    State(state): State<AppState>,
    query: Result<Query<PartsQuery>, QueryRejection>,
) -> ApiResult<Json<PartListResponse>> {
    let Query(query) = query?;

    let parts = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => state.parts.search(q).await?,
        _ => state.parts.get_all().await?,
    };
    Ok(Json(PartListResponse { parts }))
}

/// GET /api/v1/parts/:id
pub async fn get_part(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Part>> {
    let Path(id) = id?;
    let part = state
        .parts
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("part {}", id)))?;
    Ok(Json(part))
}

pub fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/parts", get(list_parts))
        .route("/parts/:id", get(get_part))
}
