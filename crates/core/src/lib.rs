//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Namespace store implementation with SQLite backend
//! - Request/response values and versioned namespace names
//! - Resource classification and the strategy table
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod namespace;
pub mod policy;
pub mod request;

pub use cache::{CacheDb, CachedEntry, NamespaceHandle, NamespaceStats};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use namespace::{NamespaceName, Registry};
pub use policy::{Classification, Classifier, Plan, ResourceClass, Strategy, StrategyTable};
pub use request::{Destination, Request, Response, ResponseSource};
