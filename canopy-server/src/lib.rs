//! canopy-server: REST backend for trees, insects and sightings
//!
//! Exposes CRUD and search over trees and insects, plus the joined
//! routes that read the many-to-many association eagerly or lazily.

pub mod config;
pub mod db;
pub mod http;
pub mod models;

pub use config::{CanopyConfig, ConfigError};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
