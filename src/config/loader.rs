//! Configuration File Loading
//!
//! Finds the configuration file, parses it, applies environment toggles
//! and validates the result.
//!
//! Search order: an explicit path (`--config`), `$FICTION_PILOT_CONFIG`,
//! `<config_dir>/fiction-pilot/config.toml`, `./fiction-pilot.toml`, then
//! built-in defaults.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file
pub const CONFIG_PATH_ENV: &str = "FICTION_PILOT_CONFIG";

/// Configuration file loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Path that must exist if set
    explicit_path: Option<PathBuf>,
    /// Locations tried in order when no explicit path is given
    search_paths: Vec<PathBuf>,
    /// File the configuration was loaded from, if any
    current_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader over the default search paths
    pub fn new() -> Self {
        Self {
            explicit_path: None,
            search_paths: Self::get_search_paths(),
            current_path: None,
        }
    }

    /// Require a specific file, as given by `--config`
    pub fn with_explicit_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_path = path;
        self
    }

    /// Load using the process environment
    pub fn load(&mut self) -> Result<Config> {
        self.load_with_env(|key| env::var(key).ok())
    }

    /// Load using `lookup` for every environment variable read
    pub fn load_with_env<F>(&mut self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = self
            .explicit_path
            .clone()
            .or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                let config = Self::load_file(&path)?;
                info!("Configuration loaded from {}", path.display());
                self.current_path = Some(path);
                config
            }
            None => self.find_and_load_config(),
        };

        config.apply_env_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parse a single configuration file
    pub fn load_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| Error::ConfigParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Try each search path; unreadable files are skipped with a warning
    fn find_and_load_config(&mut self) -> Config {
        for path in &self.search_paths {
            if !path.is_file() {
                continue;
            }
            match Self::load_file(path) {
                Ok(config) => {
                    info!("Configuration loaded from {}", path.display());
                    self.current_path = Some(path.clone());
                    return config;
                }
                Err(e) => {
                    warn!("Skipping config {}: {}", path.display(), e);
                }
            }
        }

        debug!("No configuration file found, using defaults");
        Config::default()
    }

    /// Default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("fiction-pilot").join("config.toml"));
        }
        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join("fiction-pilot.toml"));
        }

        paths
    }

    /// File the configuration came from
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
