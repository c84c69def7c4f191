use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::data::filter::{default_crime_types, CrimeTypeOption, FilterState, ALL_TYPES};
use crate::data::loader::DatasetSource;
use crate::data::model::Month;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CRIME_LENS_CONFIG";
/// Environment variable overriding `access_token`.
pub const TOKEN_ENV: &str = "CRIME_LENS_ACCESS_TOKEN";
/// Looked up in the working directory when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "crime-lens.toml";

const DEFAULT_DATASET_URL: &str =
    "https://api.mapbox.com/datasets/v1/liuhaoran3025828/cm783fsc99wyx1mmx0jbgr0w0/features";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Viewer settings, read from TOML. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// GeoJSON features endpoint, without the token.
    pub dataset_url: String,
    pub access_token: String,
    /// Year prefixed to the selected month when matching `Month` values.
    pub year: u16,
    pub initial_month: u8,
    /// Initial map centre as `[longitude, latitude]`.
    pub center: [f64; 2],
    /// Web-map zoom level of the initial view.
    pub zoom: f64,
    /// Point radius in screen pixels.
    pub point_radius: f32,
    /// Heatmap kernel radius in screen pixels.
    pub heatmap_radius: f32,
    pub heatmap_opacity: f32,
    pub crime_types: Vec<CrimeTypeOption>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            access_token: String::new(),
            year: 2024,
            initial_month: 1,
            center: [-0.089932, 51.514442],
            zoom: 14.0,
            point_radius: 10.0,
            heatmap_radius: 20.0,
            heatmap_opacity: 0.7,
            crime_types: default_crime_types(),
        }
    }
}

impl Config {
    /// Resolve, read and validate the configuration for this process.
    ///
    /// Uses `$CRIME_LENS_CONFIG` if set, else `./crime-lens.toml` if present,
    /// else the defaults. `$CRIME_LENS_ACCESS_TOKEN` overrides the token.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let config = match path {
            Some(path) => {
                log::info!("Reading configuration from {}", path.display());
                Self::from_path(&path)?
            }
            None => {
                log::info!("No configuration file, using defaults");
                Self::default()
            }
        };

        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.access_token = token;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if Month::try_from(self.initial_month).is_err() {
            return invalid(format!("initial_month {} is outside 1..=12", self.initial_month));
        }
        if !(0.0..=22.0).contains(&self.zoom) {
            return invalid(format!("zoom {} is outside 0..=22", self.zoom));
        }
        if !(-180.0..=180.0).contains(&self.center[0]) || !(-85.0..=85.0).contains(&self.center[1]) {
            return invalid(format!("center {:?} is not a valid [lon, lat]", self.center));
        }
        if self.point_radius <= 0.0 || self.heatmap_radius <= 0.0 {
            return invalid("point_radius and heatmap_radius must be positive".to_string());
        }
        if !(self.heatmap_opacity > 0.0 && self.heatmap_opacity <= 1.0) {
            return invalid(format!("heatmap_opacity {} is outside (0, 1]", self.heatmap_opacity));
        }

        let mut seen = BTreeSet::new();
        for opt in &self.crime_types {
            if opt.value == ALL_TYPES {
                return invalid(format!("crime type value {ALL_TYPES:?} is reserved"));
            }
            if !seen.insert(opt.value.as_str()) {
                return invalid(format!("duplicate crime type value {:?}", opt.value));
            }
        }
        Ok(())
    }

    pub fn dataset_source(&self) -> DatasetSource {
        DatasetSource::Remote {
            url: self.dataset_url.clone(),
            access_token: self.access_token.clone(),
        }
    }

    /// The filter shown before any input: every type in `initial_month`.
    pub fn initial_filter(&self) -> FilterState {
        let month = Month::try_from(self.initial_month).unwrap_or(Month::JANUARY);
        FilterState::new(self.year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.initial_filter().month_key(), "2024-01");
        assert_eq!(config.crime_types.len(), 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            year = 2023
            initial_month = 6

            [[crime_types]]
            value = "burglary"
            label = "Burglary"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.initial_filter().month_key(), "2023-06");
        assert_eq!(config.zoom, 14.0);
        assert_eq!(config.crime_types, vec![CrimeTypeOption::new("burglary", "Burglary")]);
    }

    #[test]
    fn example_file_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../crime-lens.example.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("colour = \"red\"").is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let bad_month = Config {
            initial_month: 13,
            ..Config::default()
        };
        assert!(matches!(bad_month.validate(), Err(ConfigError::Invalid(_))));

        let bad_opacity = Config {
            heatmap_opacity: 0.0,
            ..Config::default()
        };
        assert!(bad_opacity.validate().is_err());

        let mut reserved = Config::default();
        reserved.crime_types.push(CrimeTypeOption::new("all", "Everything"));
        assert!(reserved.validate().is_err());

        let mut duplicate = Config::default();
        duplicate.crime_types.push(CrimeTypeOption::new("drugs", "Drugs"));
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn token_comes_from_environment() {
        let config = Config::default().with_env_overrides(|key| {
            (key == TOKEN_ENV).then(|| "pk.test".to_string())
        });
        assert_eq!(
            config.dataset_source(),
            DatasetSource::Remote {
                url: DEFAULT_DATASET_URL.to_string(),
                access_token: "pk.test".to_string(),
            }
        );
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = Config::from_path(Path::new("/nonexistent/crime-lens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
