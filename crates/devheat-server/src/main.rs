//! devheat server entry point.

use std::process::ExitCode;

use clap::Parser;
use devheat_core::{TracingConfig, init_tracing};

use devheat_server::cli::{Cli, Command, ConfigAction};
use devheat_server::config::{ConfigError, ServerConfig};
use devheat_server::error::ServerResult;
use devheat_server::run_server;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = match cli.config {
        Some(ref path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };
    let config = cli.apply(config);

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => dump(&config),
            ConfigAction::Validate => {
                config.validate()?;
                println!("Configuration is valid.");
                Ok(())
            }
            ConfigAction::Path => {
                println!("config: {}", ServerConfig::default_path().display());
                Ok(())
            }
        },
        Some(Command::Serve) | None => {
            let tracing = if cli.debug {
                TracingConfig::debug()
            } else {
                TracingConfig::server()
            };
            init_tracing(tracing.with_format(config.tracing_format()?))?;

            run_server(config).await
        }
    }
}

fn dump(config: &ServerConfig) -> ServerResult<()> {
    let mut config = config.clone();
    if config.github.token.is_some() {
        config.github.token = Some("<redacted>".to_string());
    }
    let toml_str = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
    println!("# config.toml ({})", ServerConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}
