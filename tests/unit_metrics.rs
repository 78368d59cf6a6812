#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use pressure_agent::metrics::Metrics;
use pressure_agent::shutdown::ShutdownCoordinator;
use tokio::time::Duration;

#[test]
fn create_and_encode() {
    let m = Metrics::new().expect("metrics");
    let buf = m.encode_text().expect("encode");
    assert!(!buf.is_empty());
}

#[test]
fn observe_reflects_ledger_and_drain() {
    let m = Metrics::new().expect("metrics");
    let shutdown = ShutdownCoordinator::new(Duration::from_secs(1));
    m.observe(3_000_000, 3, &shutdown);
    assert_eq!(m.reservation_bytes.get(), 3_000_000);
    assert_eq!(m.reservation_blocks.get(), 3);
    assert_eq!(m.draining.get(), 0);
    shutdown.begin_drain();
    m.observe(0, 0, &shutdown);
    assert_eq!(m.draining.get(), 1);
    let text = String::from_utf8(m.encode_text().expect("encode")).expect("utf8");
    assert!(text.contains("agent_reservation_bytes 0"));
    assert!(text.contains("agent_draining 1"));
}
