use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waveforge_studio_server::config::{AppConfig, CliConfig, FileConfig};
use waveforge_studio_server::library::{SoundLibrary, SqliteSoundLibrary};
use waveforge_studio_server::lineage::{LineageStore, SqliteLineageStore};
use waveforge_studio_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use waveforge_studio_server::synthesis::HttpSynthesisClient;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite databases (library.db, lineage.db).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to an optional TOML config file. TOML values override CLI args.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// URL of the synthesis service that performs the actual generation.
    #[clap(long)]
    pub synthesis_url: Option<String>,

    /// Timeout in seconds for synthesis requests.
    #[clap(long, default_value_t = 300)]
    pub synthesis_timeout_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
        synthesis_url: cli_args.synthesis_url,
        synthesis_timeout_sec: cli_args.synthesis_timeout_sec,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening sound library at {:?}...", config.library_db_path());
    let library = Arc::new(SqliteSoundLibrary::new(&config.library_db_path())?);

    info!("Opening lineage store at {:?}...", config.lineage_db_path());
    let lineages = Arc::new(SqliteLineageStore::new(&config.lineage_db_path())?);

    // Initialize metrics system
    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::init_store_metrics(
        library.count(),
        lineages.count_lineages(),
        lineages.count_nodes(),
    );

    let synthesis = Arc::new(HttpSynthesisClient::new(
        config.synthesis.url.clone(),
        config.synthesis.timeout_sec,
    ));
    if let Err(err) = synthesis.health_check().await {
        warn!(
            "Synthesis service at {} is not reachable yet: {:#}",
            config.synthesis.url, err
        );
    }

    // Metrics server on its own port
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(err) = server::metrics::run_metrics_server(metrics_port).await {
            warn!("Metrics server terminated: {:#}", err);
        }
    });

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };
    run_server(
        server_config,
        library,
        lineages,
        synthesis,
        config.synthesis.availability(),
    )
    .await
}
