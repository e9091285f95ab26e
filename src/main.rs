mod backend;
mod classifier;
mod cli;
mod config;
mod conversation;
mod input;
mod orchestrator;
mod preferences;
mod surface;
mod terminal;
mod upload;
mod validator;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing::Level;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    log_level: Option<String>,
    overrides: Vec<(String, String)>,
}

fn usage() -> &'static str {
    "Usage: notegen-chat [--config <path>] [--log-level <level>] [--set key=value]..."
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Args>> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--log-level" => {
                parsed.log_level = Some(args.next().context("--log-level needs a value")?);
            }
            "--set" => {
                let pair = args.next().context("--set needs key=value")?;
                let (key, value) = pair
                    .split_once('=')
                    .with_context(|| format!("Expected key=value, got: {}", pair))?;
                parsed.overrides.push((key.trim().to_string(), value.trim().to_string()));
            }
            other => bail!("Unknown argument: {}\n{}", other, usage()),
        }
    }
    Ok(Some(parsed))
}

fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::WARN);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{}", usage());
        return Ok(());
    };

    let mut config = config::load_or_create_config(args.config.as_deref())?;
    config.merge_overrides(args.overrides)?;
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }

    init_logging(&config.general.log_level);

    cli::run_cli(config).await
}
