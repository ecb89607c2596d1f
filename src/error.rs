//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Circulate.
//! Every failure inside a command handler is one of these variants; the session
//! loop prints it, rolls the command back, and keeps going.
//!
//! # Error Categories
//! - `PermissionDenied`: Command number not available to the session's tier
//! - `ConnectionFailed`: Database connection errors
//! - `QueryFailed`: Literal query execution errors
//! - `ProcedureFailed`: Stored procedure errors (constraint violations, bad ids, ...)
//! - `InvalidInput`: Malformed console input or missing arguments
//! - `EngineError`: Engine-specific database errors (transactions, catalogs)
//! - `ConfigError`: Configuration file or connection profile errors
//! - `ConsoleError`: Reading from or writing to the terminal failed

use thiserror::Error;

/// Main error type for Circulate operations
#[derive(Error, Debug)]
pub enum CirculateError {
    /// Command exists but the session's tier may not run it
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// A stored procedure call failed
    #[error("Procedure {procedure} failed: {detail}")]
    ProcedureFailed { procedure: String, detail: String },

    /// Invalid input or missing required arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Engine-specific database error
    #[error("Engine error ({engine}): {detail}")]
    EngineError { engine: String, detail: String },

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Terminal I/O error
    #[error("Console error: {0}")]
    ConsoleError(String),
}

impl CirculateError {
    /// Convert error to a stable error code string
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::ProcedureFailed { .. } => "PROCEDURE_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::EngineError { .. } => "ENGINE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConsoleError(_) => "CONSOLE_ERROR",
        }
    }

    /// Get human-readable error message
    ///
    /// Never contains the session password.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a permission denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create a procedure failed error
    pub fn procedure_failed(procedure: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ProcedureFailed { procedure: procedure.into(), detail: detail.into() }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an engine-specific error
    pub fn engine_error(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::EngineError { engine: engine.into(), detail: detail.into() }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a console error
    pub fn console_error(message: impl Into<String>) -> Self {
        Self::ConsoleError(message.into())
    }
}

impl From<std::io::Error> for CirculateError {
    fn from(err: std::io::Error) -> Self {
        Self::console_error(err.to_string())
    }
}

/// Result type alias for Circulate operations
pub type Result<T> = std::result::Result<T, CirculateError>;
