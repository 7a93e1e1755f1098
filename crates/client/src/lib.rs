//! Client code for shellcache.
//!
//! This crate provides the origin fetch interface and its HTTP
//! implementation, plus the engine that resolves requests against the
//! namespace store: strategy execution, fetch coalescing, the install and
//! activate lifecycle, and the control channel.

pub mod engine;
pub mod fetch;

#[cfg(test)]
mod testing;

pub use engine::{
    ControlHandle, ControlMessage, ControlReply, Engine, Executor, Lifecycle, LifecycleState, Resolution,
    ResolutionSummary,
};
pub use fetch::{FetchConfig, HttpOrigin, Origin, UrlError, canonicalize};
