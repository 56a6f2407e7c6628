//! Database module: connection engine, sessions and storage layout.
//!
//! Layout:
//! - `engine.rs`: pooled SQLite connection engine and its options
//! - `session.rs`: units of work and the factory that builds them
//! - `manager.rs`: lifecycle owner with scoped connection/session helpers
//! - `schema.rs`: SQL DDL and the create-if-absent initializer
//! - `models.rs`: Rust structs mirroring DB rows
//! - `queries.rs`: explicit lookups between related rows

pub mod engine;
pub mod manager;
pub mod models;
pub mod queries;
pub mod schema;
pub mod session;

pub use engine::{ConnectionEngine, EngineOptions, SqlitePool};
pub use manager::SessionManager;
pub use schema::{STOREFRONT_CATALOG, ensure_schema};
pub use session::{Session, SessionFactory, SessionStats};
