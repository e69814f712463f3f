//! Finder configuration (`bladematch.toml`).
//!
//! Every section is optional; missing keys fall back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::{LogConfig, LogLevel};

/// Match engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cap on each result list (brand listing, matches, similar).
    pub max_results: usize,
    /// Score at or above which a vehicle is an exact match.
    pub accept_threshold: f64,
    /// Lowest score still reported as similar.
    pub similar_floor: f64,
    pub max_query_tokens: usize,
    pub max_token_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            accept_threshold: 1.0,
            similar_floor: 0.6,
            max_query_tokens: 8,
            max_token_chars: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Live session tokens kept before LRU eviction.
    pub token_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoritesConfig {
    pub page_size: usize,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self { page_size: 5 }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    pub search: SearchConfig,
    pub sessions: SessionConfig,
    pub favorites: FavoritesConfig,
    pub logging: LogConfig,
}

impl FinderConfig {
    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;
        let config = Self::from_toml(&data)?;
        tracing::debug!(path = %path.display(), "Loaded finder config");
        Ok(config)
    }

    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(data).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let search = &self.search;
        for (name, value) in [
            ("search.accept_threshold", search.accept_threshold),
            ("search.similar_floor", search.similar_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if search.similar_floor > search.accept_threshold {
            return Err(ConfigError::ValidationError(format!(
                "search.similar_floor ({}) must not exceed search.accept_threshold ({})",
                search.similar_floor, search.accept_threshold
            )));
        }
        for (name, value) in [
            ("search.max_results", search.max_results),
            ("search.max_query_tokens", search.max_query_tokens),
            ("search.max_token_chars", search.max_token_chars),
            ("sessions.token_capacity", self.sessions.token_capacity),
            ("favorites.page_size", self.favorites.page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        self.logging
            .level
            .parse::<LogLevel>()
            .map_err(ConfigError::ValidationError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn empty_file_yields_defaults() {
        let config = FinderConfig::from_toml("").unwrap();
        assert_eq!(config, FinderConfig::default());
        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.sessions.token_capacity, 10_000);
        assert_eq!(config.favorites.page_size, 5);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = FinderConfig::from_toml(
            r#"
            [search]
            max_results = 5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.max_results, 5);
        assert!((config.search.similar_floor - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn floor_above_threshold_is_rejected() {
        let err = FinderConfig::from_toml(
            "[search]\naccept_threshold = 0.5\nsimilar_floor = 0.7\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = FinderConfig::from_toml("[sessions]\ntoken_capacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("sessions.token_capacity"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = FinderConfig::from_toml("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = FinderConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = FinderConfig::from_toml("[search\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }
}
