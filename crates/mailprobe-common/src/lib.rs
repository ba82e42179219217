//! mailprobe Common - Shared types and utilities
//!
//! This crate provides the configuration tables, the error type and the
//! verification data model shared by every mailprobe component.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
