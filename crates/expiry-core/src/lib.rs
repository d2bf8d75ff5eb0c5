//! expiry-core: Core library for the expiry engine
//!
//! This crate keeps derived password expiry dates in step with inheritable
//! expiry policies stored on a tree of records and containers.
//!
//! # Architecture
//!
//! ```text
//! Host tree mutations → EventSource → PolicyCache invalidation
//!                                          ↓
//!                    ExpiryEngine → RecalcDecision → InheritanceResolver
//!                         ↓                               ↓
//!                    TreeWriter ← target date ← PolicyValue
//! ```
//!
//! # Modules
//!
//! - `policy`: Policy values, token grammar and target-date arithmetic
//! - `tree`: Host traits, node identifiers and mutation events
//! - `resolver`: Upward walk for inherited policies
//! - `decider`: Change detection deciding when to recalculate
//! - `cache`: Per-record memo of resolved policies and display strings
//! - `engine`: The facade with the skip guard and write-back logic
//! - `actions`: Applying a chosen policy to a selection
//! - `memory`: In-memory host implementation
//! - `clock`: Time sources
//! - `config`: Configuration management
//! - `logging`: Tracing subscriber setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod actions;
pub mod cache;
pub mod clock;
pub mod config;
pub mod decider;
pub mod engine;
pub mod error;
pub mod logging;
pub mod memory;
pub mod policy;
pub mod resolver;
pub mod tree;

pub use config::EngineConfig;
pub use engine::{ExpireOutcome, ExpiryEngine, RecalcOutcome, SkipReason};
pub use error::{ConfigError, Error, Result};
pub use policy::{PolicyUnit, PolicyValue, UnitLabels};
pub use tree::{ContainerId, NodeRef, RecordId, TreeEvent};

/// Version of the expiry-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
