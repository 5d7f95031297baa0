//! Error types for the Chorus core library.
//!
//! Every fallible operation in the crate returns [`ChorusResult`]. The variants
//! follow the three-way taxonomy the client cares about: local validation
//! failures (no request issued), transport failures (the server was never
//! reached) and server failures (the server answered with a non-success status).
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Validation | Rejected locally before any request is sent |
//! | E2001-E2099 | Config | Environment, config file, and validation errors |
//! | E3001-E3099 | Transport | Network unreachable, connect failures, timeouts |
//! | E4001-E4099 | Server | Non-success responses and undecodable bodies |
//! | E5001-E5099 | Session | Room session lifecycle errors |
//! | E9001-E9099 | General | Internal, IO and serialization errors |

use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// The main error type for the Chorus core library.
#[derive(Debug, Error)]
pub enum ChorusError {
    // ========================================================================
    // Validation Errors (E1001-E1099)
    // ========================================================================
    /// A required field was empty; nothing was sent to the server
    #[error("[E1001] Validation error: {0}")]
    ValidationFailed(String),

    /// A write of the same kind is still outstanding
    #[error("[E1002] Busy: {0} is already in progress")]
    Busy(String),

    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    /// Configuration file parse error
    #[error("[E2001] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// Invalid configuration value
    #[error("[E2002] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    /// Required configuration key is missing
    #[error("[E2003] Missing required configuration: {0}")]
    MissingRequired(String),

    // ========================================================================
    // Transport Errors (E3001-E3099)
    // ========================================================================
    /// The remote service could not be reached
    #[error("[E3001] Network failure: {0}")]
    TransportFailure(String),

    /// The request did not complete in time
    #[error("[E3002] Request timed out: {0}")]
    Timeout(String),

    // ========================================================================
    // Server Errors (E4001-E4099)
    // ========================================================================
    /// The server answered with a non-success status.
    ///
    /// `body` is the raw response text; when it is empty the display falls
    /// back to the canonical status description.
    #[error("[E4001] {}", server_detail(.status, .body))]
    ServerFailure { status: u16, body: String },

    /// A success response could not be decoded as the expected type
    #[error("[E4002] Failed to decode server response: {0}")]
    DecodeFailure(String),

    // ========================================================================
    // Session Errors (E5001-E5099)
    // ========================================================================
    /// The room session has been closed
    #[error("[E5001] Room session is closed")]
    SessionClosed,

    /// The room is not known locally
    #[error("[E5002] Room not found: {0}")]
    RoomNotFound(i64),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// Internal error (catch-all for unexpected conditions)
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("[E9002] IO error: {0}")]
    IoError(String),

    /// Serialization/deserialization error
    #[error("[E9003] Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for Chorus operations.
pub type ChorusResult<T> = Result<T, ChorusError>;

fn server_detail(status: &u16, body: &str) -> String {
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    reqwest::StatusCode::from_u16(*status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

// ============================================================================
// From trait implementations for seamless error propagation
// ============================================================================

impl From<reqwest::Error> for ChorusError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChorusError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            ChorusError::TransportFailure(err.to_string())
        } else if err.is_decode() {
            ChorusError::DecodeFailure(err.to_string())
        } else if let Some(status) = err.status() {
            ChorusError::ServerFailure {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            ChorusError::TransportFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChorusError {
    fn from(err: serde_json::Error) -> Self {
        ChorusError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for ChorusError {
    fn from(err: std::io::Error) -> Self {
        ChorusError::IoError(err.to_string())
    }
}

impl From<config::ConfigError> for ChorusError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ChorusError::InvalidConfigValue {
                key,
                message: "Key not found".to_string(),
            },
            config::ConfigError::FileParse { uri, cause } => ChorusError::ConfigParseError(
                format!("Failed to parse {}: {}", uri.unwrap_or_default(), cause),
            ),
            config::ConfigError::Type {
                origin,
                unexpected,
                expected,
                key,
            } => ChorusError::InvalidConfigValue {
                key: key.unwrap_or_else(|| origin.map(|o| o.to_string()).unwrap_or_default()),
                message: format!("Expected {}, got {}", expected, unexpected),
            },
            _ => ChorusError::ConfigParseError(err.to_string()),
        }
    }
}

// ============================================================================
// Error categorization helpers
// ============================================================================

impl ChorusError {
    /// Build a server failure from a status code and response text.
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        ChorusError::ServerFailure {
            status,
            body: body.into(),
        }
    }

    /// Returns true if a required field was empty. Nothing was sent.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, ChorusError::ValidationFailed(_))
    }

    /// Returns true if the write was refused because another one is running.
    pub fn is_busy(&self) -> bool {
        matches!(self, ChorusError::Busy(_))
    }

    /// Returns true if this error is related to configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ChorusError::ConfigParseError(_)
                | ChorusError::InvalidConfigValue { .. }
                | ChorusError::MissingRequired(_)
        )
    }

    /// Returns true if the server was never reached.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            ChorusError::TransportFailure(_) | ChorusError::Timeout(_)
        )
    }

    /// Returns true if the server answered with a non-success status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ChorusError::ServerFailure { .. })
    }

    /// HTTP status of a server failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChorusError::ServerFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The human-facing detail of the error without its code prefix.
    ///
    /// For server failures this is the response body (or the status text when
    /// the body was empty), which is what the user should see.
    pub fn detail(&self) -> String {
        match self {
            ChorusError::ServerFailure { status, body } => server_detail(status, body),
            other => {
                let full = other.to_string();
                match full.split_once("] ") {
                    Some((_, rest)) => rest.to_string(),
                    None => full,
                }
            }
        }
    }

    /// Returns true if this error is likely to resolve on its own.
    ///
    /// Poll ticks treat every error as transient; this classification is used
    /// for log severity and CLI hints only.
    pub fn is_transient(&self) -> bool {
        match self {
            ChorusError::TransportFailure(_) | ChorusError::Timeout(_) => true,
            ChorusError::ServerFailure { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChorusError::ValidationFailed(_) => "E1001",
            ChorusError::Busy(_) => "E1002",
            ChorusError::ConfigParseError(_) => "E2001",
            ChorusError::InvalidConfigValue { .. } => "E2002",
            ChorusError::MissingRequired(_) => "E2003",
            ChorusError::TransportFailure(_) => "E3001",
            ChorusError::Timeout(_) => "E3002",
            ChorusError::ServerFailure { .. } => "E4001",
            ChorusError::DecodeFailure(_) => "E4002",
            ChorusError::SessionClosed => "E5001",
            ChorusError::RoomNotFound(_) => "E5002",
            ChorusError::Internal(_) => "E9001",
            ChorusError::IoError(_) => "E9002",
            ChorusError::SerializationError(_) => "E9003",
        }
    }

    /// Returns a user-friendly suggestion for how to resolve this error.
    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            ChorusError::TransportFailure(_) => {
                Some("Check that the Chorus server is running and CHORUS_API_BASE is correct")
            }
            ChorusError::Timeout(_) => {
                Some("The server is slow to respond. Try again or raise api.request_timeout_ms")
            }
            ChorusError::ServerFailure { status: 404, .. } => {
                Some("Run 'chorus rooms list' to see the rooms that still exist")
            }
            ChorusError::Busy(_) => Some("Wait for the previous action to finish"),
            ChorusError::InvalidConfigValue { .. } | ChorusError::ConfigParseError(_) => {
                Some("Check chorus.toml and CHORUS_* environment variables")
            }
            _ => None,
        }
    }

    /// Log this error with appropriate severity level.
    pub fn log(&self) {
        let code = self.error_code();
        let suggestion = self.user_suggestion();

        if self.is_transient() {
            warn!(
                error_code = %code,
                suggestion = suggestion,
                "Transient error occurred: {}",
                self
            );
        } else {
            error!(
                error_code = %code,
                suggestion = suggestion,
                "Error occurred: {}",
                self
            );
        }
    }
}

// ============================================================================
// User-friendly error formatting for CLI
// ============================================================================

/// Format an error for CLI display with its code and suggestion.
pub struct CliErrorDisplay<'a> {
    error: &'a ChorusError,
    show_suggestion: bool,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a ChorusError) -> Self {
        Self {
            error,
            show_suggestion: true,
        }
    }

    pub fn without_suggestion(mut self) -> Self {
        self.show_suggestion = false;
        self
    }
}

impl fmt::Display for CliErrorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error.error_code(), self.error.detail())?;

        if self.show_suggestion {
            if let Some(suggestion) = self.error.user_suggestion() {
                write!(f, "\n  Suggestion: {}", suggestion)?;
            }
        }

        Ok(())
    }
}
