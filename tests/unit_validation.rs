#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use pressure_agent::domain::{Limits, PressureMode, PressureRequest, StressQuery};
use pressure_agent::error::PressureError;
use pressure_agent::validation::{check_request, validate_stress};

fn q(duration: Option<i64>, chunks: Option<i64>, mode: Option<&str>) -> StressQuery {
    StressQuery {
        duration,
        chunks,
        mode: mode.map(str::to_string),
    }
}

fn req(mode: PressureMode, duration_ms: u64, chunk_count: u64) -> PressureRequest {
    PressureRequest {
        mode,
        duration_ms,
        chunk_count,
    }
}

#[test]
fn ok_defaults() {
    let l = Limits::default();
    let r = validate_stress(&StressQuery::default(), &l).expect("ok");
    assert_eq!(r, req(l.default_mode, l.default_duration_ms, l.default_chunks));
}

#[test]
fn ok_explicit_values() {
    let r = validate_stress(&q(Some(100), Some(3), Some("memory")), &Limits::default())
        .expect("ok");
    assert_eq!(r.mode, PressureMode::Memory);
    assert_eq!(r.duration_ms, 100);
    assert_eq!(r.chunk_count, 3);
}

#[test]
fn ok_zero_values() {
    let r = validate_stress(&q(Some(0), Some(0), None), &Limits::default()).expect("ok");
    assert_eq!((r.duration_ms, r.chunk_count), (0, 0));
}

#[test]
fn ok_at_ceiling() {
    let l = Limits::default();
    let max_duration = i64::try_from(l.max_duration_ms).expect("fits");
    let max_chunks = i64::try_from(l.max_chunks).expect("fits");
    assert!(validate_stress(&q(Some(max_duration), Some(max_chunks), None), &l).is_ok());
}

#[test]
fn err_negative_duration() {
    let e = validate_stress(&q(Some(-1), None, None), &Limits::default()).unwrap_err();
    assert!(matches!(e, PressureError::Validation { field: "duration", .. }));
}

#[test]
fn err_negative_chunks() {
    let e = validate_stress(&q(None, Some(-5), None), &Limits::default()).unwrap_err();
    assert!(matches!(e, PressureError::Validation { field: "chunks", .. }));
}

#[test]
fn err_duration_above_ceiling() {
    let e = validate_stress(&q(Some(200_000), None, None), &Limits::default()).unwrap_err();
    assert!(matches!(
        e,
        PressureError::CeilingExceeded {
            field: "duration",
            value: 200_000,
            ceiling: 10_000
        }
    ));
    assert!(e.is_validation());
}

#[test]
fn err_chunks_above_ceiling() {
    let e = validate_stress(&q(None, Some(101), None), &Limits::default()).unwrap_err();
    assert!(matches!(e, PressureError::CeilingExceeded { field: "chunks", .. }));
}

#[test]
fn err_mode_unsupported() {
    let e = validate_stress(&q(None, None, Some("disk")), &Limits::default()).unwrap_err();
    assert!(matches!(e, PressureError::Validation { field: "mode", .. }));
}

#[test]
fn blank_mode_falls_back_to_default() {
    let l = Limits {
        default_mode: PressureMode::Cpu,
        ..Limits::default()
    };
    let r = validate_stress(&q(None, None, Some("")), &l).expect("ok");
    assert_eq!(r.mode, PressureMode::Cpu);
}

#[test]
fn default_above_lowered_ceiling_is_clamped() {
    let l = Limits {
        max_duration_ms: 1_000,
        default_duration_ms: 3_000,
        ..Limits::default()
    };
    let r = validate_stress(&StressQuery::default(), &l).expect("ok");
    assert_eq!(r.duration_ms, 1_000);
}

#[test]
fn check_request_catches_direct_construction() {
    let l = Limits::default();
    assert!(check_request(&req(PressureMode::Cpu, 60_000, 0), &l).is_err());
    assert!(check_request(&req(PressureMode::Memory, 0, 1_000), &l).is_err());
}
