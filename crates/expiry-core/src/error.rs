//! Error types for the expiry engine.
//!
//! Resolution, caching and the recalculation decision are total and never
//! produce errors. The fallible surfaces are configuration, logging setup,
//! cycle detection on demand, and the event pump's round limit.

use crate::tree::NodeRef;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {0}: {1}")]
    ReadFailed(String, String),

    /// Config content is not valid TOML or has wrong field types.
    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    /// Config parsed but holds values the engine cannot use.
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The container tree loops back on itself above this node.
    #[error("Cycle detected in container tree at {node}")]
    CycleDetected {
        /// First node seen twice during the upward walk.
        node: NodeRef,
    },

    /// Write-backs kept producing notifications past the configured bound.
    #[error("Event processing did not settle after {rounds} rounds")]
    EventLoopLimit {
        /// Number of drain rounds performed.
        rounds: u32,
    },

    /// Logging subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
