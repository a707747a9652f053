//! mbrick-api library - MissingBrick REST service
//!
//! Tracks LEGO sets, their part lists (imported from Rebrickable) and the parts
//! a user is missing.

use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

use db::{PartStore, Stores};
use services::{CatalogClient, MissingPartsService, SetPartService, SetService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sets: Arc<SetService>,
    pub set_parts: Arc<SetPartService>,
    pub missing_parts: Arc<MissingPartsService>,
    /// Parts are served straight from the store
    pub parts: Arc<dyn PartStore>,
}

impl AppState {
    /// Wire the services over `stores` and `catalog`
    pub fn new(stores: Stores, catalog: Arc<dyn CatalogClient>) -> Self {
        let set_parts = Arc::new(SetPartService::new(
            stores.set_parts.clone(),
            stores.parts.clone(),
            catalog.clone(),
        ));
        let sets = Arc::new(SetService::new(stores.sets, catalog, set_parts.clone()));
        let missing_parts = Arc::new(MissingPartsService::new(
            stores.set_parts,
            stores.missing_parts,
        ));

        Self {
            sets,
            set_parts,
            missing_parts,
            parts: stores.parts,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api::v1_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        // Outermost after tracing, so every OPTIONS is answered before routing
        .layer(middleware::from_fn(api::cors::preflight))
        .layer(TraceLayer::new_for_http())
}
