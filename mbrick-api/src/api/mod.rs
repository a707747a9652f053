//! HTTP API
//!
//! Resource routers are merged under `/api/v1`; `/health` sits at the root.

pub mod cors;
pub mod health;
pub mod missing_parts;
pub mod parts;
pub mod sets;

use axum::Router;

use crate::AppState;

pub use health::health_routes;

/// Every `/api/v1` route, without state
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .merge(sets::set_routes())
        .merge(missing_parts::missing_part_routes())
        .merge(parts::part_routes())
}
