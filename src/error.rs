//! Error types for the inventory engine
//!
//! Failures fall into three classes: structural/API failures that abort a
//! discovery pass, cross-reference failures that abort the assembly they
//! occur in, and best-effort extraction gaps which never surface as errors
//! at all (they leave fields empty).

use thiserror::Error;

/// Unified error type for discovery and assembly
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Management API Errors
    // =========================================================================
    #[error("Management API session is not connected")]
    NotConnected,

    #[error("Management API error: {0}")]
    ManagementApi(String),

    #[error("Unexpected managed object: expected {expected}, got {actual}")]
    UnexpectedObject { expected: String, actual: String },

    // =========================================================================
    // Cross-reference Errors
    // =========================================================================
    #[error("Cannot find disk {name}")]
    UnresolvedDisk { name: String },

    #[error("Cannot find datastore {uuid}")]
    UnresolvedDatastore { uuid: String },

    #[error("Missing identity for {entity}")]
    MissingIdentity { entity: String },

    #[error("Duplicate identity {key} for {entity}")]
    DuplicateIdentity { key: String, entity: String },

    // =========================================================================
    // Command Gateway Errors
    // =========================================================================
    #[error("Command timed out after {timeout_secs}s: {command}")]
    CommandTimeout { command: String, timeout_secs: u64 },

    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Permission denied for tool: {tool}")]
    PermissionDenied { tool: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the caller of a discovery step should do with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Stop the whole discovery pass, no partial graph
    AbortPass,
    /// Treat the affected field or device as unavailable and continue
    SkipField,
    /// Give up on this pass; the next scheduled pass may succeed
    RetryNextPass,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // A single probe that timed out or exited badly only loses its fields
            Error::CommandTimeout { .. } | Error::CommandFailed { .. } => ErrorAction::SkipField,

            // Session and transport trouble may clear up by the next pass
            Error::NotConnected | Error::ManagementApi(_) | Error::Io(_) => {
                ErrorAction::RetryNextPass
            }

            // Data consistency bugs and bad configuration
            Error::UnresolvedDisk { .. }
            | Error::UnresolvedDatastore { .. }
            | Error::MissingIdentity { .. }
            | Error::DuplicateIdentity { .. }
            | Error::UnexpectedObject { .. }
            | Error::PermissionDenied { .. }
            | Error::Configuration(_) => ErrorAction::AbortPass,

            _ => ErrorAction::AbortPass,
        }
    }

    /// Check if this error ends the discovery pass
    pub fn is_fatal(&self) -> bool {
        !matches!(self.action(), ErrorAction::SkipField)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::NotConnected
                | Error::ManagementApi(_)
                | Error::Io(_)
                | Error::CommandTimeout { .. }
        )
    }
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, Error>;
