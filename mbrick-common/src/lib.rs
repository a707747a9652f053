//! # MissingBrick Common Library
//!
//! Shared code for the MissingBrick service:
//! - Error type used by every layer
//! - Persisted entity models (sets, parts, set parts, missing parts)
//! - Configuration loading and resolution
//! - Database initialization and migrations

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
