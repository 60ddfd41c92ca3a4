use serde::Deserialize;
use splitdl_io::DEFAULT_BUFFER_SIZE;
use splitdl_protocol::ClientOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CHUNKS: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings read from `config.toml`; command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub chunks: usize,
    pub output_dir: Option<PathBuf>,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: Option<u64>,
    pub write_buffer_kib: usize,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunks: DEFAULT_CHUNKS,
            output_dir: None,
            user_agent: concat!("splitdl/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: None,
            write_buffer_kib: DEFAULT_BUFFER_SIZE / 1024,
            progress: true,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("splitdl").join("config.toml"))
    }

    /// Loads `explicit` if given, otherwise the per-user file when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: self.read_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_kib.max(1) * 1024
    }
}
