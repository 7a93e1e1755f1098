//! SQLite-backed namespace store for cached responses.
//!
//! This module provides durable, named, versioned key/value stores using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Independently named namespaces, created on first open
//! - Request-derived cache keys using SHA-256 hashing
//! - Whole-namespace deletion cascading to entries
//! - An optional byte quota on stored bodies
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod namespaces;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use namespaces::{NamespaceHandle, NamespaceStats};
