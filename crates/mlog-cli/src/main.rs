use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mlog_cli::commands::{detail, record, report, serve, status};
use mlog_cli::sensor::{CommandSensor, DEFAULT_TIMEOUT};
use mlog_cli::{Cli, Commands, Config};
use mlog_core::Recorder;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(mlog_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = mlog_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Record) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;

            let running = Arc::new(AtomicBool::new(true));
            let handler_flag = Arc::clone(&running);
            ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
                .context("failed to install Ctrl-C handler")?;

            let interval = Duration::from_secs(config.sample_interval_secs);
            let sensor = CommandSensor::new(config.sensor_command.clone())
                .with_timeout(interval.min(DEFAULT_TIMEOUT));
            let mut recorder = Recorder::new(sensor, config.recorder(), Utc::now());
            record::run(&mut recorder, &mut db, &running, interval);
        }
        Some(Commands::Report {
            range,
            threshold,
            json,
        }) => {
            let spec = range.spec()?;
            let (db, config) = open_database(cli.config.as_deref())?;
            let threshold = threshold.unwrap_or(config.threshold_minutes);
            report::run(&mut stdout, &db, spec, threshold, *json, &Local::now())?;
        }
        Some(Commands::Detail {
            application,
            range,
            json,
        }) => {
            let spec = range.spec()?;
            let (db, _config) = open_database(cli.config.as_deref())?;
            detail::run(&mut stdout, &db, spec, application, *json, &Local::now())?;
        }
        Some(Commands::Serve { listen }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let addr = listen.unwrap_or(config.listen_addr);
            serve::run(db, addr, config.threshold_minutes)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
