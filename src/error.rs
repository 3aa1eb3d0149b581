//! Error types and handling for the airport resolver
//!
//! Two layers live here. [`ResolverError`] is what the credential and
//! transport code returns when a network call goes wrong. [`ErrorType`] is the
//! closed taxonomy a resolution reports back to its caller, together with the
//! worst-of aggregation used when several names are resolved at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised by the credential and transport layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// Credentials or other required settings are missing
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream returned 5xx or could not be reached at all
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        status: Option<u16>,
        message: String,
    },

    /// Upstream answered with a non-2xx client status or a malformed body
    #[error("Upstream bad response: {message}")]
    UpstreamBadResponse {
        status: Option<u16>,
        message: String,
    },

    /// Anything else
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ResolverError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify a non-2xx HTTP status: 5xx is unavailable, everything else is a bad response
    pub fn from_status<S: Into<String>>(status: u16, message: S) -> Self {
        if status >= 500 {
            Self::UpstreamUnavailable {
                status: Some(status),
                message: message.into(),
            }
        } else {
            Self::UpstreamBadResponse {
                status: Some(status),
                message: message.into(),
            }
        }
    }

    /// A failure where no response was received
    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self::UpstreamUnavailable {
            status: None,
            message: message.into(),
        }
    }

    /// A 2xx response whose body could not be understood
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::UpstreamBadResponse {
            status: None,
            message: message.into(),
        }
    }

    /// The resolution outcome this error is reported as
    #[must_use]
    pub fn error_type(&self) -> ErrorType {
        match self {
            ResolverError::UpstreamUnavailable { .. } => ErrorType::UpstreamUnavailable,
            ResolverError::UpstreamBadResponse { .. } => ErrorType::UpstreamBadResponse,
            ResolverError::Config { .. } | ResolverError::Internal { .. } => {
                ErrorType::InternalError
            }
        }
    }
}

/// Closed set of outcomes a single resolution can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    #[default]
    None,
    NotFound,
    UpstreamUnavailable,
    UpstreamBadResponse,
    InternalError,
}

impl ErrorType {
    /// Every member, least severe first
    pub const ALL: [ErrorType; 5] = [
        ErrorType::None,
        ErrorType::InternalError,
        ErrorType::NotFound,
        ErrorType::UpstreamBadResponse,
        ErrorType::UpstreamUnavailable,
    ];

    /// Rank used when several outcomes are combined; higher is worse.
    ///
    /// `UPSTREAM_UNAVAILABLE > UPSTREAM_BAD_RESPONSE > NOT_FOUND > INTERNAL_ERROR > NONE`
    #[must_use]
    pub fn severity(self) -> u8 {
        match self {
            ErrorType::None => 0,
            ErrorType::InternalError => 1,
            ErrorType::NotFound => 2,
            ErrorType::UpstreamBadResponse => 3,
            ErrorType::UpstreamUnavailable => 4,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self != ErrorType::None
    }

    /// Wire code used in the error envelope
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorType::None => "NONE",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorType::UpstreamBadResponse => "UPSTREAM_BAD_RESPONSE",
            ErrorType::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pick the more severe of two outcomes
#[must_use]
pub fn pick_worst_error(a: ErrorType, b: ErrorType) -> ErrorType {
    if b.severity() > a.severity() { b } else { a }
}

/// Fold any number of outcomes into the single most severe one
pub fn worst_of<I>(outcomes: I) -> ErrorType
where
    I: IntoIterator<Item = ErrorType>,
{
    outcomes
        .into_iter()
        .fold(ErrorType::None, pick_worst_error)
}
