use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{LogDestination, DEFAULT_LOG_FILE};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use splitter_core::{OutputFormat, Stem, StemSet};
use splitter_engine::ClientSettings;
use thiserror::Error;

use super::args::Cli;

const CONFIG_FILENAME: &str = "splitter.ron";
const DEFAULT_OUTPUT_DIR: &str = "separated";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid format in config: {0}")]
    Format(#[from] splitter_core::ParseFormatError),
}

/// On-disk settings. Every field is optional; command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_upload_mb: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub input: PathBuf,
    pub client: ClientSettings,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub stems: StemSet,
    pub retries: u32,
    pub download: bool,
    pub log_destination: LogDestination,
    pub log_level: LevelFilter,
    /// Config file the settings were read from, if one was found.
    pub config_path: Option<PathBuf>,
}

/// Reads a config file. A missing default file yields `None`; a missing explicit one is an error.
pub fn load_file_config(path: &Path, explicit: bool) -> Result<Option<FileConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(Some(config))
}

pub fn resolve(cli: Cli) -> Result<RunSettings, ConfigError> {
    let (config_path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(CONFIG_FILENAME), false),
    };
    let file = load_file_config(&config_path, explicit)?;
    let loaded = file.is_some();
    let mut settings = merge(cli, file.unwrap_or_default())?;
    settings.config_path = loaded.then_some(config_path);
    Ok(settings)
}

fn merge(cli: Cli, file: FileConfig) -> Result<RunSettings, ConfigError> {
    let defaults = ClientSettings::default();
    let client = ClientSettings {
        base_url: cli
            .base_url
            .or(file.base_url)
            .unwrap_or(defaults.base_url),
        connect_timeout: file
            .connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout),
        request_timeout: file
            .request_timeout_secs
            .map(Duration::from_secs)
            .or(defaults.request_timeout),
        max_upload_bytes: file
            .max_upload_mb
            .map(|mb| mb.saturating_mul(1024 * 1024))
            .unwrap_or(defaults.max_upload_bytes),
    };

    let format = match (cli.format, file.format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(raw)) => raw.parse()?,
        (None, None) => OutputFormat::default(),
    };

    let stems: StemSet = match (cli.vocals, cli.instrumental) {
        (false, false) => Stem::ALL.into_iter().collect(),
        (vocals, instrumental) => [(Stem::Vocals, vocals), (Stem::Instrumental, instrumental)]
            .into_iter()
            .filter_map(|(stem, wanted)| wanted.then_some(stem))
            .collect(),
    };

    let log_path = cli
        .log_file
        .or(file.log_file)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let (log_destination, log_level) = match cli.verbose {
        0 => (LogDestination::File(log_path), LevelFilter::Info),
        1 => (LogDestination::Both(log_path), LevelFilter::Debug),
        _ => (LogDestination::Both(log_path), LevelFilter::Trace),
    };

    Ok(RunSettings {
        input: cli.input,
        client,
        output_dir: cli
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        format,
        stems,
        retries: cli.retries,
        download: !cli.no_download,
        log_destination,
        log_level,
        config_path: None,
    })
}
