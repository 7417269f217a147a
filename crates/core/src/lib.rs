//! Core types and shared functionality for sevacache.
//!
//! This crate provides:
//! - The versioned store registry with a SQLite backend
//! - Generation labels and store naming
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod generation;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use generation::{Generation, StoreClass};
pub use store::{ResponseRecord, StoreDb, StoreRegistry};
