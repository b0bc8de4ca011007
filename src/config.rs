//! Configuration module for loopline.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "loopline")]
#[command(version = "0.1.0")]
#[command(about = "A loopback TCP demo pair", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept one connection on loopback and log everything it sends
    Serve(ServeArgs),
    /// Connect to the server and send the payload periodically
    Send(SendArgs),
    /// Probe the host toolchain and report the operating system
    Detect,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub struct SendArgs {
    /// Server port to connect to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Local port to bind before connecting
    #[arg(short = 'b', long)]
    pub local_port: Option<u16>,

    /// Set SO_REUSEADDR on the local socket before binding
    #[arg(long)]
    pub reuse_addr: bool,

    /// Seconds between payloads
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub client: ClientSection,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Client-related configuration
#[derive(Debug, Deserialize)]
pub struct ClientSection {
    /// Server port to connect to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Local port to bind before connecting
    pub local_port: Option<u16>,
    /// Whether to set SO_REUSEADDR before binding
    #[serde(default)]
    pub reuse_addr: bool,
    /// Seconds between payloads
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            local_port: None,
            reuse_addr: false,
            interval: default_interval(),
        }
    }
}

fn default_port() -> u16 {
    10705
}

fn default_interval() -> u64 {
    5
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub port: u16,
    pub local_port: Option<u16>,
    pub reuse_addr: bool,
    pub interval: Duration,
}

/// What the process should do, with its resolved configuration
#[derive(Debug)]
pub enum Mode {
    Serve(ServerConfig),
    Send(ClientConfig),
    Detect,
}

impl Mode {
    /// Resolve the mode from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(match cli.command {
            Command::Serve(args) => Mode::Serve(resolve_server(args, &toml_config)),
            Command::Send(args) => Mode::Send(resolve_client(args, &toml_config)),
            Command::Detect => Mode::Detect,
        })
    }
}

fn resolve_server(args: ServeArgs, toml_config: &TomlConfig) -> ServerConfig {
    ServerConfig {
        port: args.port.unwrap_or(toml_config.server.port),
    }
}

fn resolve_client(args: SendArgs, toml_config: &TomlConfig) -> ClientConfig {
    ClientConfig {
        port: args.port.unwrap_or(toml_config.client.port),
        local_port: args.local_port.or(toml_config.client.local_port),
        reuse_addr: args.reuse_addr || toml_config.client.reuse_addr,
        interval: Duration::from_secs(args.interval.unwrap_or(toml_config.client.interval)),
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
