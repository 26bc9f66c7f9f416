// Ensemble - universal playlist library
// Keeps local/ as the source of truth and every {os}_{format} directory in step with it

use anyhow::{Context, Result};
use clap::Parser;
use ensemble::{Config, Synchronizer, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ensemble")]
#[command(about = "Update universal playlist library")]
struct Args {
    /// Run as daemon, updating every --interval seconds
    #[arg(short = 'D', long)]
    daemon: bool,

    /// Print debugging info
    #[arg(short = 'x', long)]
    debug: bool,

    /// Playlists location (default: current directory)
    #[arg(short, long)]
    location: Option<PathBuf>,

    /// Time between updates in daemon mode, in seconds
    #[arg(short = 't', long, default_value_t = 60.0)]
    interval: f64,

    /// Config file (default: <location>/ensemble.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a sample config file and exit
    #[arg(long)]
    init: bool,

    /// Also log to a daily rotating file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_logging(debug: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins; otherwise --debug decides how chatty we are
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            // Daily rotating file appender
            let file_appender = tracing_appender::rolling::daily(dir, "ensemble.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs get flushed on exit
    let _guard = init_logging(args.debug, args.log_dir.as_deref())?;

    let location = match args.location {
        Some(location) => location,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let config_path = args
        .config
        .unwrap_or_else(|| location.join(CONFIG_FILE_NAME));

    if args.init {
        Config::default().save(&config_path)?;
        println!("Wrote sample config to {}", config_path.display());
        return Ok(());
    }

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Could not load config: {}", e);
            std::process::exit(1);
        }
    };

    debug!("Config file dump: {:#?}", config);

    let synchronizer = Synchronizer::new(&location, &config);
    debug!("Library root: {}", synchronizer.library_root().display());
    synchronizer.ensure_layout()?;

    if args.daemon {
        let interval = interval_from_secs(args.interval)?;
        run_daemon(&synchronizer, interval).await;
        Ok(())
    } else {
        let report = synchronizer.scan_and_update()?;
        info!("{}", report);
        Ok(())
    }
}

fn interval_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("--interval must be a positive number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("--interval {} is too large", secs))
}

/// Poll forever; a pass always finishes before we sleep, ctrl-c only lands between passes
async fn run_daemon(synchronizer: &Synchronizer, interval: Duration) {
    info!("Running as daemon, updating every {:?}", interval);

    loop {
        match synchronizer.scan_and_update() {
            Ok(report) => info!("{}", report),
            // Directory trouble aborts this pass only; try again next tick
            Err(e) => error!("Update pass failed: {:#}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }
}
