//! Business services and the catalog client

pub mod memory_catalog;
pub mod missing_parts;
pub mod rebrickable_client;
pub mod set_parts;
pub mod sets;

pub use memory_catalog::InMemoryCatalog;
pub use missing_parts::{MissingPartRequest, MissingPartsService};
pub use rebrickable_client::{CatalogClient, RebrickableClient};
pub use set_parts::SetPartService;
pub use sets::SetService;
