use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lals::azure::auth::ArmCredentials;
use lals::azure::client::ArmClient;
use lals::azure::http::format_arm_error;
use lals::azure::linked_services::LinkedServicesClient;
use lals::config::{Config, ProcessEnv};
use lals::host::{Host, StateStore};
use lals::resource::linked_service::linked_service_schema;
use lals::resource::{LinkedServiceResource, RemoteState, ResourceLifecycle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage Azure Log Analytics workspace linked services
#[derive(Parser, Debug)]
#[command(name = "lals", version, about, long_about = None)]
struct Args {
    /// Azure subscription to use
    #[arg(short, long, global = true)]
    subscription: Option<String>,

    /// State file tracking the managed linked service
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Refuse to adopt linked services that already exist
    #[arg(long, global = true)]
    strict: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resource schema as JSON
    Schema,
    /// Show what apply would do
    Plan {
        /// YAML or JSON configuration file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Create, update or replace the linked service
    Apply {
        /// YAML or JSON configuration file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Re-read the tracked linked service
    Refresh,
    /// Start tracking an existing linked service by its resource id
    Import { id: String },
    /// Delete the tracked linked service
    Destroy,
    /// Persist provider defaults to the config file
    Configure,
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

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("lals started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("lals").join("lals.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".lals").join("lals.log");
    }
    PathBuf::from("lals.log")
}

/// Read a YAML or JSON configuration document
fn load_document(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse configuration {:?}", path))
}

fn build_resource(args: &Args, config: &Config) -> Result<LinkedServiceResource> {
    let env = ProcessEnv;
    let subscription = args
        .subscription
        .clone()
        .or_else(|| config.effective_subscription(&env))
        .unwrap_or_default();
    let endpoint = config.effective_endpoint(&env);
    let strict = args.strict || config.effective_strict_import(&env);

    tracing::info!(
        "Using subscription: {}, endpoint: {}, strict import: {}",
        subscription,
        endpoint,
        strict
    );

    let credentials = ArmCredentials::new(config.effective_token_source(&env)?, &endpoint)?;
    let client = ArmClient::new(credentials, &subscription, &endpoint)?;
    Ok(LinkedServiceResource::new(
        Arc::new(LinkedServicesClient::new(client)),
        strict,
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn host(args: &Args, config: &Config) -> Result<Host<LinkedServiceResource>> {
    let store = StateStore::new(args.state.clone().unwrap_or_else(StateStore::default_path));
    Ok(Host::new(build_resource(args, config)?, store))
}

async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    let mut config = Config::load();

    match &args.command {
        Command::Schema => print_json(&linked_service_schema()),
        Command::Configure => {
            if let Some(subscription) = &args.subscription {
                config.set_subscription(subscription)?;
            }
            if args.strict {
                config.strict_import = Some(true);
                config.save()?;
            }
            print_json(&config)
        }
        Command::Plan { file } => {
            let desired = LinkedServiceResource::decode(&load_document(file)?)?;
            print_json(&host(&args, &config)?.plan(&desired, &cancel).await?)
        }
        Command::Apply { file } => {
            let desired = LinkedServiceResource::decode(&load_document(file)?)?;
            print_json(&host(&args, &config)?.apply(&desired, &cancel).await?)
        }
        Command::Refresh => {
            let state = host(&args, &config)?.refresh(&cancel).await?;
            if let RemoteState::Absent = state {
                eprintln!("Nothing tracked, or the linked service no longer exists");
            }
            print_json(&state)
        }
        Command::Import { id } => print_json(&host(&args, &config)?.import(id, &cancel).await?),
        Command::Destroy => {
            if !host(&args, &config)?.destroy(&cancel).await? {
                eprintln!("Nothing to destroy");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight request");
            on_signal.cancel();
        }
    });

    if let Err(err) = run(args, cancel).await {
        match err.downcast_ref::<lals::Error>() {
            Some(lals::Error::Remote { operation, identity, source }) => {
                eprintln!("Error {} {}: {}", operation, identity, format_arm_error(source));
            }
            // Rejected locally, nothing was sent
            Some(local) if local.is_validation() => {
                eprintln!("Error: {local}");
                std::process::exit(2);
            }
            _ => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
