//! mailprobe Storage - Skip-list and blacklist persistence
//!
//! Repositories come in two flavours: PostgreSQL-backed for shared
//! deployments and in-memory for single-process use and tests.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::*;
pub use repository::*;
