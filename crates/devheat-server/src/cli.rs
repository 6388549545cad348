//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ServerConfig;

/// devheat - GitHub and LeetCode activity as one heatmap
#[derive(Debug, Parser)]
#[command(name = "devheat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DEVHEAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Address to listen on
    #[arg(long, env = "DEVHEAT_BIND")]
    pub bind: Option<SocketAddr>,

    // --- Upstream flags ---
    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub GraphQL endpoint
    #[arg(long, env = "DEVHEAT_GITHUB_ENDPOINT")]
    pub github_endpoint: Option<String>,

    /// LeetCode GraphQL endpoint
    #[arg(long, env = "DEVHEAT_LEETCODE_ENDPOINT")]
    pub leetcode_endpoint: Option<String>,

    // --- Server flags ---
    /// Log format: pretty, compact or json
    #[arg(long, env = "DEVHEAT_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Requests allowed per client per window (0 disables)
    #[arg(long, env = "DEVHEAT_RATE_LIMIT")]
    pub rate_limit: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Layers flags and environment variables over `config`.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(bind) = self.bind {
            config = config.with_bind(bind);
        }
        if let Some(ref token) = self.github_token {
            config = config.with_github_token(token.clone());
        }
        if let Some(ref endpoint) = self.github_endpoint {
            config = config.with_github_endpoint(endpoint.clone());
        }
        if let Some(ref endpoint) = self.leetcode_endpoint {
            config = config.with_leetcode_endpoint(endpoint.clone());
        }
        if let Some(ref format) = self.log_format {
            config = config.with_log_format(format.clone());
        }
        if let Some(limit) = self.rate_limit {
            config = config.with_rate_limit(limit);
        }
        config
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
