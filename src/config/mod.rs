mod file_config;

pub use file_config::{FileConfig, SynthesisConfig};

use crate::server::RequestsLoggingLevel;
use crate::synthesis::{Engine, EngineAvailability};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub synthesis_url: Option<String>,
    pub synthesis_timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    // Synthesis collaborator
    pub synthesis: SynthesisSettings,
}

#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub url: String,
    pub timeout_sec: u64,
    pub disabled_engines: Vec<Engine>,
}

impl SynthesisSettings {
    pub fn availability(&self) -> EngineAvailability {
        EngineAvailability::with_disabled(self.disabled_engines.iter().copied())
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let synthesis_url = file
            .synthesis_url
            .clone()
            .or_else(|| cli.synthesis_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "synthesis_url must be specified via --synthesis-url or in config file"
                )
            })?;

        let synthesis_timeout_sec = file
            .synthesis_timeout_sec
            .unwrap_or(cli.synthesis_timeout_sec);

        let mut disabled_engines = Vec::new();
        if let Some(synthesis_file) = file.synthesis {
            for name in synthesis_file.disabled_engines.unwrap_or_default() {
                match Engine::from_str(&name) {
                    Some(engine) => disabled_engines.push(engine),
                    None => bail!("Unknown engine in disabled_engines: {}", name),
                }
            }
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            synthesis: SynthesisSettings {
                url: synthesis_url,
                timeout_sec: synthesis_timeout_sec,
                disabled_engines,
            },
        })
    }

    pub fn library_db_path(&self) -> PathBuf {
        self.db_dir.join("library.db")
    }

    pub fn lineage_db_path(&self) -> PathBuf {
        self.db_dir.join("lineage.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
