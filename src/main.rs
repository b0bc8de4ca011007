//! loopline: a loopback TCP demo pair.
//!
//! One binary, three modes:
//! - `serve`: accept a single connection and log everything it sends
//! - `send`: connect and write a fixed payload periodically
//! - `detect`: probe the host toolchain and report the operating system
//!
//! Configuration via CLI arguments or TOML file; CLI takes precedence.

mod client;
mod config;
mod server;
mod toolchain;

use clap::Parser;
use config::{CliArgs, Mode};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match Mode::load(cli)? {
        Mode::Serve(config) => {
            info!(port = config.port, "Starting loopline server");
            runtime()?.block_on(server::run(config))?;
        }
        Mode::Send(config) => {
            info!(
                port = config.port,
                local_port = ?config.local_port,
                interval_secs = config.interval.as_secs(),
                "Starting loopline sender"
            );
            runtime()?.block_on(client::run(config))?;
        }
        Mode::Detect => toolchain::run()?,
    }

    Ok(())
}

/// The whole system is sequential: one socket, one blocking call at a
/// time. A current-thread runtime keeps it that way.
fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
