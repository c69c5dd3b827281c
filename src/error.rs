//! Error types for bridge dispatch and script adapters

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The provider does not expose a method with this name
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// An argument did not have the shape a binding requires
    #[error("bad argument #{position} to '{method}' ({expected} expected, got {found})")]
    ConversionFailure {
        method: String,
        position: usize,
        expected: String,
        found: String,
    },

    /// Error surfaced by the provider, passed through unchanged
    #[error("{0}")]
    Provider(String),

    /// Operation the bridge cannot perform (e.g. calling a script closure from Rust)
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The call was cancelled before the provider answered
    #[error("call to '{0}' was cancelled")]
    Cancelled(String),

    /// Module name already taken in a registry
    #[error("module '{0}' already registered")]
    ModuleExists(String),

    /// Module name unknown to a registry
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    /// Lua runtime error
    #[error("Lua error: {0}")]
    Lua(#[from] rlua::Error),
}

impl BridgeError {
    /// Wrap any displayable provider failure
    pub fn provider(msg: impl Into<String>) -> Self {
        BridgeError::Provider(msg.into())
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Provider(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Provider(format!("serialization error: {}", err))
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
