#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]
#![cfg(unix)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn spawn_agent(port: u16, drain_deadline_ms: u64) -> Child {
    Command::new(env!("CARGO_BIN_EXE_pressure-agent"))
        .env("BIND_HOST", "127.0.0.1")
        .env("PORT", port.to_string())
        .env("DRAIN_DEADLINE_MS", drain_deadline_ms.to_string())
        .env("WORKERS", "2")
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn agent")
}

fn get(port: u16, path: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )?;
    let mut out = String::new();
    stream.read_to_string(&mut out)?;
    Ok(out)
}

fn wait_ready(port: u16) {
    let until = Instant::now() + Duration::from_secs(10);
    while Instant::now() < until {
        if get(port, "/health").is_ok_and(|r| r.starts_with("HTTP/1.1 200")) {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("agent did not become ready");
}

fn sigterm(child: &Child) {
    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("kill");
    assert!(status.success());
}

fn wait_exit(child: &mut Child, limit: Duration) -> ExitStatus {
    let until = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return status;
        }
        if Instant::now() > until {
            let _ = child.kill();
            panic!("agent still running after {limit:?}");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn idle_agent_exits_cleanly_on_sigterm() {
    let port = free_port();
    let mut child = spawn_agent(port, 1_000);
    wait_ready(port);
    sigterm(&child);
    let status = wait_exit(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));
}

#[test]
fn drain_deadline_forces_exit_during_long_burn() {
    let port = free_port();
    let mut child = spawn_agent(port, 1_000);
    wait_ready(port);

    let burn = thread::spawn(move || get(port, "/stress?duration=5000&chunks=1&mode=cpu"));
    thread::sleep(Duration::from_millis(300));

    let signalled = Instant::now();
    sigterm(&child);
    let status = wait_exit(&mut child, Duration::from_secs(4));
    let took = signalled.elapsed();
    assert_eq!(status.code(), Some(1));
    assert!(took >= Duration::from_millis(900), "exited after {took:?}");
    assert!(took < Duration::from_millis(3_000), "exited after {took:?}");

    // The client never gets a stress summary.
    let reply = burn.join().expect("join");
    assert!(!reply.is_ok_and(|r| r.contains("Stress test completed")));
}
