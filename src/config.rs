// Configuration: command-line flags, the optional JSON config file, and
// validation of both into `Settings` before any map file I/O happens.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::api::{SyncTarget, UploadRequestBuilder, DEFAULT_ENDPOINT};
use crate::error::ConfigError;
use crate::sync::Mode;

/// Command-line flags. Anything left out may come from the config file.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "upmap")]
#[command(version, about = "Upload a map file to its game page whenever it changes")]
pub struct Cli {
    /// The id of the planet
    #[arg(long)]
    pub id: Option<u64>,
    /// The spaceship cookie
    #[arg(long)]
    pub space: Option<String>,
    /// The map file
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Skip checking for update, just update it now
    #[arg(long)]
    pub now: bool,
    /// Don't print that it's updating
    #[arg(long)]
    pub silent: bool,
    /// Base URL of the hosting service
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Config file (defaults to <config dir>/upmap/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Optional defaults read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub id: Option<u64>,
    pub space: Option<String>,
    pub file: Option<PathBuf>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub silent: bool,
}

/// Config file path: `~/.config/upmap/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("upmap").join("config.json"))
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit` if given (it must exist), otherwise the default
    /// path if there is a file there.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Validated startup parameters.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: SyncTarget,
    pub file: PathBuf,
    pub mode: Mode,
    pub silent: bool,
    pub request_builder: UploadRequestBuilder,
}

impl Settings {
    /// Merges flags over file values and validates the result: file, then
    /// id, then space.
    pub fn resolve(cli: Cli, file_config: FileConfig) -> Result<Self, ConfigError> {
        let file = cli
            .file
            .or(file_config.file)
            .filter(|f| !f.as_os_str().is_empty())
            .ok_or(ConfigError::MissingFile)?;
        let id = cli.id.or(file_config.id).unwrap_or(0);
        let space = cli.space.or(file_config.space).unwrap_or_default();
        let target = SyncTarget::new(id, space)?;

        let endpoint = cli
            .endpoint
            .or(file_config.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let request_builder = UploadRequestBuilder::new(&endpoint)?;

        let mode = if cli.now { Mode::Immediate } else { Mode::Watch };

        Ok(Self {
            target,
            file,
            mode,
            silent: cli.silent || file_config.silent,
            request_builder,
        })
    }
}
