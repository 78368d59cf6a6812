#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use actix_web::http::StatusCode;

/// Everything the pressure engine can refuse or fail with.
///
/// `CeilingExceeded` is a validation failure that names the configured bound;
/// callers treat it exactly like `Validation`. Forced termination on drain
/// timeout is a process lifecycle event and deliberately has no variant here.
#[derive(Debug, thiserror::Error)]
pub enum PressureError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("{field} = {value} exceeds the configured ceiling of {ceiling}")]
    CeilingExceeded {
        field: &'static str,
        value: u64,
        ceiling: u64,
    },
    #[error("shutdown in progress, not accepting pressure requests")]
    Draining,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PressureError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::CeilingExceeded { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::CeilingExceeded { .. } => StatusCode::BAD_REQUEST,
            Self::Draining => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable label used in the `error` field of responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::CeilingExceeded { .. } => "resource_ceiling_exceeded",
            Self::Draining => "draining",
            Self::Internal(_) => "Internal Server Error",
        }
    }
}

pub type PressureResult<T> = Result<T, PressureError>;
