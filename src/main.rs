use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use observatory_exporter::cache::Cache;
use observatory_exporter::collector::ObservatoryClient;
use observatory_exporter::config::{Config, Settings, DEFAULT_CONFIG_FILE};
use observatory_exporter::metrics::prom::{metrics_registry, Exporter};
use observatory_exporter::scheduler::Scheduler;
use observatory_exporter::server::{create_router, AppState};

/// Exports TLS Observatory scan results as Prometheus metrics
#[derive(Parser, Debug)]
#[command(name = "observatory-exporter", version, about, long_about = None)]
struct Cli {
    /// The address to listen on for HTTP requests
    #[arg(long = "web.listen-address")]
    listen_address: Option<String>,

    /// The URL checked via Observatory (repeat for several targets)
    #[arg(long = "observatory.target-url")]
    target_urls: Vec<String>,

    /// The Observatory API endpoint used
    #[arg(long = "observatory.api-url")]
    api_url: Option<String>,

    /// Interval in seconds used for running checks against the Observatory API
    #[arg(long = "observatory.interval")]
    interval: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,
}

fn load_settings(cli: Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::from_file(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };

    let cli_config =
        Config::from_cli_args(cli.target_urls, cli.listen_address, cli.api_url, cli.interval);

    let settings = Config::defaults()
        .merge_with(file_config)
        .merge_with(cli_config)
        .into_settings()?;
    Ok(settings)
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let cache = Arc::new(Cache::new());

    let client = ObservatoryClient::new(&settings.api_url, settings.request_timeout)?
        .with_polling(settings.poll_interval, settings.poll_timeout);
    Scheduler::new(
        Arc::new(client),
        Arc::clone(&cache),
        settings.targets.clone(),
        settings.interval,
    )
    .spawn();

    let registry = metrics_registry(Exporter::new(cache)?)?;
    let app = create_router(AppState {
        registry: Arc::new(registry),
    });

    let listener = tokio::net::TcpListener::bind(&settings.listen_address).await?;
    info!(address = %settings.listen_address, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Exits with status 1 on SIGINT or SIGTERM. In-flight scrapes are dropped.
fn register_signals() {
    tokio::spawn(async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, exiting..."),
            _ = terminate() => info!("Received SIGTERM, exiting..."),
        }
        exit(1);
    });
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.example_config {
        println!("{}", Config::example_toml());
        return;
    }

    register_signals();

    let settings = match load_settings(cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    info!(
        targets = ?settings.targets.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        api_url = %settings.api_url,
        interval = ?settings.interval,
        "Starting observatory-exporter {}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(settings).await {
        error!("{}", e);
        exit(1);
    }
}
