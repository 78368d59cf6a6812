#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use clap::Parser;
use pressure_agent::{build_state, server, Config, ShutdownOutcome};
use std::process::ExitCode;
use tracing::{error, info};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

#[cfg(unix)]
async fn termination_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = term.recv() => Ok("SIGTERM"),
        res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let config = Config::parse();
    let state = build_state(&config)?;
    let dispatcher = state.dispatcher.clone();
    let srv = server(state, &config)?;
    let handle = srv.handle();
    tokio::pin!(srv);
    info!(host=%config.host, port=config.port, limits=?config.limits(), "server is running");

    tokio::select! {
        res = &mut srv => {
            res?;
            info!("server exited on its own");
            return Ok(ExitCode::SUCCESS);
        }
        sig = termination_signal() => {
            let sig = sig?;
            info!(signal = sig, "termination signal received, performing graceful shutdown");
        }
    }

    let stop_listening = async {
        let ((), res) = tokio::join!(handle.stop(true), &mut srv);
        if let Err(e) = res {
            error!(error=%e, "server stopped with error");
        }
    };
    let outcome = dispatcher
        .shutdown()
        .drain(stop_listening, dispatcher.ledger())
        .await;
    match outcome {
        ShutdownOutcome::Drained => Ok(ExitCode::SUCCESS),
        // Burns still spinning on worker threads are abandoned here.
        ShutdownOutcome::Forced => std::process::exit(outcome.exit_code()),
    }
}
