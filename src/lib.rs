pub mod cli;
pub mod commands;
pub mod core;
pub mod shared;

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;
use crate::core::history::ConversionHistory;
use crate::shared::error::{AppError, ERR_CONVERSION_UNAVAILABLE};
use crate::shared::settings::AppSettings;

/// Exit status for conversions that are unavailable or rejected as invalid input.
const EXIT_USER_ERROR: u8 = 2;

pub fn run() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Load settings
    let loaded = match &cli.settings {
        Some(path) => AppSettings::load_from_path(path),
        None => AppSettings::load(),
    };
    let settings = loaded.unwrap_or_else(|e| {
        warn!("Failed to load settings: {}, using defaults", e);
        AppSettings::default()
    });

    let history_path = cli
        .history
        .clone()
        .unwrap_or_else(|| settings.history.file_path.clone());
    debug!(path = %history_path.display(), "using history file");
    let history = ConversionHistory::new(history_path);

    match cli::execute(cli.command, cli.json, &history, &settings) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_conversion_unavailable() => {
            debug!("{}", e);
            report(cli.json, &e, ERR_CONVERSION_UNAVAILABLE)?;
            Ok(ExitCode::from(EXIT_USER_ERROR))
        }
        Err(e @ AppError::Validation(_)) => {
            report(cli.json, &e, &e.to_string())?;
            Ok(ExitCode::from(EXIT_USER_ERROR))
        }
        // Storage and I/O failures are fatal
        Err(e) => Err(e.into()),
    }
}

fn report(json: bool, err: &AppError, message: &str) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(err)?);
    } else {
        eprintln!("{}", message);
    }
    Ok(())
}
