//! Database layer - connection pool, schema bootstrap and repositories
//!
//! # Design Principles
//!
//! - One shared `SqlitePool`, handed to repositories by reference
//! - Natural keys are checked before insert and backed by UNIQUE constraints
//! - Deleting an entity removes its association rows in the same transaction

pub mod pool;
pub mod repos;
pub mod seed;

pub use pool::{create_pool, create_pool_with_options, open_in_memory, run_migrations};
pub use repos::*;
