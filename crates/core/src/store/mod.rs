//! SQLite-backed versioned store registry.
//!
//! This module provides the persistent blob-store layer behind the cache
//! engine, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - One durable namespace per (generation, store-class) pair
//! - Whole-record atomic replacement (UPSERT, last-write-wins)
//! - Automatic schema migrations
//! - WAL mode for concurrent access from in-flight strategy executions
//! - Recency-ordered trimming (insertion order as LRU proxy)

pub mod connection;
pub mod key;
pub mod migrations;
pub mod record;
pub mod registry;

pub use crate::Error;

pub use connection::StoreDb;
pub use record::ResponseRecord;
pub use registry::StoreRegistry;
