//! Dashboard configuration
//! Optional JSON file plus environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str =
    "https://www.sanidad.gob.es/profesionales/saludPublica/ccayes/alertasActual/nCov/documentos";

const CONFIG_ENV: &str = "CAPACIDAD_CONFIG";
const BASE_URL_ENV: &str = "CAPACIDAD_BASE_URL";
const TIMEOUT_ENV: &str = "CAPACIDAD_TIMEOUT_SECS";
const DEFAULT_CONFIG_FILE: &str = "capacidad.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// URL prefix or local directory holding the dated snapshots.
    pub base_url: String,
    pub timeout_secs: u64,
    pub separator: char,
    /// Date formats offered for the `Fecha` column.
    pub date_formats: Vec<String>,
    pub table_cache_capacity: usize,
    pub region_cache_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            separator: ';',
            date_formats: vec!["%d/%m/%Y".to_string(), "%m/%d/%Y".to_string()],
            table_cache_capacity: 1,
            region_cache_capacity: 3,
        }
    }
}

impl DashboardConfig {
    /// Load from `$CAPACIDAD_CONFIG` or `./capacidad.json`, then apply
    /// environment overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = var(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(timeout) = var(TIMEOUT_ENV) {
            match timeout.parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => log::warn!("Ignoring {}={:?}: not a number", TIMEOUT_ENV, timeout),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Separator as the single byte the CSV reader expects.
    pub fn separator_byte(&self) -> u8 {
        if self.separator.is_ascii() {
            self.separator as u8
        } else {
            log::warn!("Separator {:?} is not a single byte, using ';'", self.separator);
            b';'
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_secs": 5, "separator": ","}}"#).unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.separator_byte(), b',');
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.table_cache_capacity, 1);
    }

    #[test]
    fn invalid_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = DashboardConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = DashboardConfig::default();
        config.apply_env(|key| match key {
            BASE_URL_ENV => Some("/srv/snapshots".to_string()),
            TIMEOUT_ENV => Some("12".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "/srv/snapshots");
        assert_eq!(config.timeout_secs, 12);
    }

    #[test]
    fn bad_timeout_override_is_ignored() {
        let mut config = DashboardConfig::default();
        config.apply_env(|key| (key == TIMEOUT_ENV).then(|| "soon".to_string()));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn non_ascii_separator_falls_back() {
        let config = DashboardConfig {
            separator: '¦',
            ..DashboardConfig::default()
        };
        assert_eq!(config.separator_byte(), b';');
    }
}
