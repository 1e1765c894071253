/// Unified error handling for sentinel-cache
///
/// This module provides the error taxonomy shared by descriptor parsing,
/// sentinel discovery, store connections and the failover-recovery wrapper.
/// Callers distinguish three families: configuration errors (fatal), discovery
/// errors (propagated unmodified) and stale-connection errors (retry after the
/// manager has reset its cached connections).

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;

/// Main error type for sentinel-cache operations
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Malformed descriptor or invalid options; never retryable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sentinel quorum unreachable or no usable primary known
    #[error("Discovery error: {message}")]
    Discovery { message: String },

    /// Cached connections were dropped after a fatal connection error.
    /// The caller may retry; the next attempt re-discovers topology.
    #[error("Stale connection: {message}")]
    StaleConnection { message: String },

    /// Socket-level failure talking to a sentinel or a store node
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Write attempted against a node that has been demoted to replica
    #[error("Read-only node: {message}")]
    ReadOnly { message: String },

    /// Backend is loading, lost its primary link, or asked us to retry
    #[error("Backend interrupted: {message}")]
    Interrupted { message: String },

    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Any other error reported by the store for a command
    #[error("Command error: {message}")]
    Command { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for sentinel-cache operations
pub type SentinelResult<T> = Result<T, SentinelError>;

impl SentinelError {
    pub fn discovery<S: Into<String>>(message: S) -> Self {
        SentinelError::Discovery {
            message: message.into(),
        }
    }

    pub fn stale<S: Into<String>>(message: S) -> Self {
        SentinelError::StaleConnection {
            message: message.into(),
        }
    }

    pub fn read_only<S: Into<String>>(message: S) -> Self {
        SentinelError::ReadOnly {
            message: message.into(),
        }
    }

    pub fn interrupted<S: Into<String>>(message: S) -> Self {
        SentinelError::Interrupted {
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        SentinelError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn command<S: Into<String>>(message: S) -> Self {
        SentinelError::Command {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        SentinelError::Internal {
            message: message.into(),
        }
    }

    /// Errors that mean the cached connection can no longer be trusted.
    /// Timeouts are treated as transport failures.
    pub fn is_fatal_connection(&self) -> bool {
        matches!(
            self,
            SentinelError::Transport(_)
                | SentinelError::ReadOnly { .. }
                | SentinelError::Interrupted { .. }
                | SentinelError::Timeout { .. }
        )
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SentinelError::StaleConnection { .. }) || self.is_fatal_connection()
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SentinelError::Config(_) => ErrorSeverity::Critical,
            SentinelError::Internal { .. } => ErrorSeverity::Critical,
            SentinelError::Discovery { .. } => ErrorSeverity::Error,
            SentinelError::Command { .. } => ErrorSeverity::Error,
            SentinelError::StaleConnection { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Warning,
        }
    }
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require operator attention
    Critical,
    /// Errors that fail the current request
    Error,
    /// Connection problems the manager recovers from by reconnecting
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}
