//! Request classification and strategy selection.
//!
//! Both halves are pure: classifying a request or planning its resolution
//! never touches the store or the network.

pub mod classify;
pub mod strategy;

pub use classify::{Classification, Classifier, ResourceClass};
pub use strategy::{Binding, ContentPolicy, Fallback, Plan, Strategy, StrategyTable};
