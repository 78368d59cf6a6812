#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use crate::domain::{Limits, PressureMode, PressureRequest, StressQuery};
use crate::error::{PressureError, PressureResult};

/// Normalizes a `/stress` query against the configured limits.
pub fn validate_stress(query: &StressQuery, limits: &Limits) -> PressureResult<PressureRequest> {
    let mode = match query.mode.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<PressureMode>()?,
        _ => limits.default_mode,
    };
    let duration_ms = bounded(
        "duration",
        query.duration,
        limits.default_duration_ms,
        limits.max_duration_ms,
    )?;
    let chunk_count = bounded(
        "chunks",
        query.chunks,
        limits.default_chunks,
        limits.max_chunks,
    )?;
    Ok(PressureRequest {
        mode,
        duration_ms,
        chunk_count,
    })
}

/// Re-checks an already built request, e.g. one constructed directly in code.
pub fn check_request(req: &PressureRequest, limits: &Limits) -> PressureResult<()> {
    if req.duration_ms > limits.max_duration_ms {
        return Err(PressureError::CeilingExceeded {
            field: "duration",
            value: req.duration_ms,
            ceiling: limits.max_duration_ms,
        });
    }
    if req.chunk_count > limits.max_chunks {
        return Err(PressureError::CeilingExceeded {
            field: "chunks",
            value: req.chunk_count,
            ceiling: limits.max_chunks,
        });
    }
    Ok(())
}

fn bounded(
    field: &'static str,
    raw: Option<i64>,
    default: u64,
    ceiling: u64,
) -> PressureResult<u64> {
    let value = match raw {
        None => default.min(ceiling),
        Some(v) => u64::try_from(v)
            .map_err(|_| PressureError::validation(field, format!("must be >= 0, got {v}")))?,
    };
    if value > ceiling {
        return Err(PressureError::CeilingExceeded {
            field,
            value,
            ceiling,
        });
    }
    Ok(value)
}
