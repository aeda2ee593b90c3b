#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_positive_number, Validate};
use std::path::{Path, PathBuf};
use toml_config::TomlConfig;

pub const DEFAULT_DATABASE_PATH: &str = "parking.redb";
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 5;

/// Effective runtime settings. Command line beats the TOML file, which beats
/// the built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub json_logs: bool,
    pub log_level: Option<String>,
    pub concurrent_requests: usize,
}

impl Settings {
    pub fn resolve(
        database: Option<PathBuf>,
        json_logs: bool,
        concurrent_requests: Option<usize>,
        file: Option<&TomlConfig>,
    ) -> Self {
        let database_path = database
            .or_else(|| file.and_then(|f| f.storage_path()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        Self {
            database_path,
            json_logs: json_logs || file.is_some_and(|f| f.json_logs()),
            log_level: file.and_then(|f| f.log_level()).map(str::to_string),
            concurrent_requests: concurrent_requests
                .or_else(|| file.and_then(|f| f.concurrent_requests()))
                .unwrap_or(DEFAULT_CONCURRENT_REQUESTS),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(None, false, None, None)
    }
}

impl ConfigProvider for Settings {
    fn database_path(&self) -> &Path {
        &self.database_path
    }

    fn json_logs(&self) -> bool {
        self.json_logs
    }

    fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_path("database", &self.database_path.to_string_lossy())?;
        validate_positive_number("concurrent_requests", self.concurrent_requests, 1)?;
        Ok(())
    }
}
