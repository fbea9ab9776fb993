use anyhow::{Context, Result};
use awsweep::aws::{self, CloudApi, StaticApi};
use awsweep::config::Settings;
use awsweep::fs::OsFs;
use awsweep::{filter, Registry, Scanner};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Find AWS resources eligible for deletion
#[derive(Parser, Debug)]
#[command(name = "awsweep", version, about, long_about = None)]
struct Args {
    /// YAML filter selecting resources per resource type
    #[arg(short, long)]
    filter: Option<PathBuf>,

    /// Directory of recorded `<service>.<Operation>.json` API responses
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Resource types listed at the same time
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Timeout for a single API call, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Attempts per API call when it times out
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Only validate the filter and exit
    #[arg(long)]
    check: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("awsweep started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("awsweep").join("awsweep.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".awsweep").join("awsweep.log");
    }
    PathBuf::from("awsweep.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let settings = Settings::load();
    let filter_path = settings.effective_filter(args.filter.clone());

    // Step 1: Load and validate the filter before touching any API
    let registry = Registry::load().context("Invalid resource registry")?;
    let filter = filter::load(&OsFs, &filter_path, &registry)?;

    if args.check {
        eprintln!(
            "{:?}: {} resource type(s) OK",
            filter_path,
            filter.config().len()
        );
        return Ok(());
    }

    // Step 2: Connect the API binding
    let Some(fixtures) = settings.effective_fixtures(args.fixtures.clone()) else {
        return Err(anyhow::anyhow!(
            "No API responses configured. Use --fixtures DIR or set `fixtures` in {:?}",
            Settings::settings_path().unwrap_or_default()
        ));
    };
    let api: Arc<dyn CloudApi> = Arc::new(StaticApi::from_dir(&fixtures)?);

    // Step 3: Bind account scoped listing parameters
    let registry = if registry.needs_account_id(filter.config().kinds()) {
        let account_id = aws::account_id(api.as_ref()).await?;
        tracing::info!("Using account: {}", account_id);
        registry.bind(&account_id)
    } else {
        registry
    };

    // Step 4: Scan
    let options =
        settings.effective_scan_options(args.concurrency, args.timeout, args.max_attempts);
    let scanner = Scanner::new(api, Arc::new(registry), Arc::new(filter), options);
    let report = scanner.run().await;

    println!("{}", serde_json::to_string_pretty(&report.matches)?);

    for failure in &report.failures {
        eprintln!("warning: {}", failure);
    }
    eprintln!(
        "{} resource(s) selected across {} type(s), {} type(s) failed",
        report.matches.len(),
        report.scanned.len(),
        report.failures.len()
    );

    Ok(())
}
