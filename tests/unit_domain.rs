#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use pressure_agent::domain::{Limits, PressureMode};
use pressure_agent::stats::to_mb;

#[test]
fn mode_parses_case_insensitively() {
    assert_eq!("CPU".parse::<PressureMode>().expect("cpu"), PressureMode::Cpu);
    assert_eq!("memory".parse::<PressureMode>().expect("mem"), PressureMode::Memory);
    assert_eq!(" Combined ".parse::<PressureMode>().expect("both"), PressureMode::Combined);
    assert!("disk".parse::<PressureMode>().is_err());
}

#[test]
fn mode_round_trips_through_display() {
    for mode in [PressureMode::Cpu, PressureMode::Memory, PressureMode::Combined] {
        assert_eq!(mode.to_string().parse::<PressureMode>().expect("parse"), mode);
    }
}

#[test]
fn mode_selects_components() {
    assert!(PressureMode::Cpu.burns_cpu() && !PressureMode::Cpu.grows_memory());
    assert!(!PressureMode::Memory.burns_cpu() && PressureMode::Memory.grows_memory());
    assert!(PressureMode::Combined.burns_cpu() && PressureMode::Combined.grows_memory());
}

#[test]
fn default_limits_are_self_consistent() {
    let l = Limits::default();
    assert!(l.default_duration_ms <= l.max_duration_ms);
    assert!(l.default_chunks <= l.max_chunks);
    assert!(l.chunk_bytes > 0 && l.yield_every_ops > 0);
}

#[test]
fn mb_rounds_to_nearest() {
    assert_eq!(to_mb(0), 0);
    assert_eq!(to_mb(3_000_000), 3);
    assert_eq!(to_mb(10_000_000), 10);
    assert_eq!(to_mb(500_000), 0);
    assert_eq!(to_mb(600_000), 1);
}
