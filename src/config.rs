use crate::core::duplicate::DEFAULT_DEDUP_RADIUS_M;
use crate::core::gazetteer::DEFAULT_MATCH_RADIUS_KM;
use crate::core::location::GeoPoint;
use crate::core::web_photo::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_PHOTO_PX};
use crate::services::gazetteer::DEFAULT_OVERPASS_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Optional per-project overrides, read from the project root.
pub const CONFIG_FILE_NAME: &str = "village-signs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {error}")]
    Parse {
        path: PathBuf,
        #[source]
        error: toml::de::Error,
    },

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Settings for one site build. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Project root; all directories below are relative to it.
    #[serde(skip)]
    pub root: PathBuf,
    pub photos_dir: PathBuf,
    pub site_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Distances in the unvisited list are measured from here.
    pub home: GeoPoint,
    pub dedup_radius_m: f64,
    pub match_radius_km: f64,
    pub max_photo_px: u32,
    pub jpeg_quality: u8,
    pub overpass_url: String,
    /// Name of the admin_level 6 area settlements are fetched for.
    pub area: String,
    pub fetch_timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            photos_dir: PathBuf::from("photos"),
            site_dir: PathBuf::from("docs"),
            data_dir: PathBuf::from("data"),
            // Elmswell, IP30 9HD (approx.)
            home: GeoPoint {
                lat: 52.2355,
                lon: 0.9014,
            },
            dedup_radius_m: DEFAULT_DEDUP_RADIUS_M,
            match_radius_km: DEFAULT_MATCH_RADIUS_KM,
            max_photo_px: DEFAULT_MAX_PHOTO_PX,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            area: "Suffolk".to_string(),
            fetch_timeout_secs: 120,
        }
    }
}

impl BuildConfig {
    /// Defaults for `root`, overridden by `root/village-signs.toml` when present.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|error| ConfigError::Read {
                path: path.clone(),
                error,
            })?;
            let config: BuildConfig =
                toml::from_str(&content).map_err(|error| ConfigError::Parse { path, error })?;
            config
        } else {
            BuildConfig::default()
        };
        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| {
            Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };

        if !self.home.is_valid() {
            return invalid("home", "latitude must be within ±90 and longitude within ±180");
        }
        if !(self.dedup_radius_m > 0.0) {
            return invalid("dedup_radius_m", "must be positive");
        }
        if !(self.match_radius_km > 0.0) {
            return invalid("match_radius_km", "must be positive");
        }
        if self.max_photo_px == 0 {
            return invalid("max_photo_px", "must be positive");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return invalid("jpeg_quality", "must be between 1 and 100");
        }
        if self.area.trim().is_empty() {
            return invalid("area", "must not be empty");
        }
        Ok(())
    }

    pub fn photos_in(&self) -> PathBuf {
        self.root.join(&self.photos_dir)
    }

    pub fn site_path(&self) -> PathBuf {
        self.root.join(&self.site_dir)
    }

    pub fn photos_out(&self) -> PathBuf {
        self.site_path().join("photos")
    }

    pub fn data_json_path(&self) -> PathBuf {
        self.site_path().join("data.json")
    }

    pub fn unvisited_csv_path(&self) -> PathBuf {
        self.site_path().join("unvisited.csv")
    }

    pub fn settlements_cache_path(&self) -> PathBuf {
        self.root.join(&self.data_dir).join("settlements.json")
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = BuildConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config.root, temp_dir.path());
        assert_eq!(config.home, GeoPoint::new(52.2355, 0.9014).unwrap());
        assert_eq!(config.dedup_radius_m, 50.0);
        assert_eq!(config.match_radius_km, 1.5);
        assert_eq!(config.max_photo_px, 1200);
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.photos_in(), temp_dir.path().join("photos"));
        assert_eq!(config.photos_out(), temp_dir.path().join("docs").join("photos"));
        assert_eq!(config.data_json_path(), temp_dir.path().join("docs").join("data.json"));
        assert_eq!(
            config.settlements_cache_path(),
            temp_dir.path().join("data").join("settlements.json")
        );
    }

    #[test]
    fn test_file_overrides_selected_values() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"
area = "Norfolk"
match_radius_km = 2.0

[home]
lat = 52.63
lon = 1.29
"#,
        )
        .unwrap();

        let config = BuildConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.area, "Norfolk");
        assert_eq!(config.match_radius_km, 2.0);
        assert_eq!(config.home, GeoPoint::new(52.63, 1.29).unwrap());
        assert_eq!(config.dedup_radius_m, 50.0);
        assert_eq!(config.root, temp_dir.path());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "jpeg_quality = 0\n").unwrap();

        let err = BuildConfig::load(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "jpeg_quality"));

        let config = BuildConfig {
            dedup_radius_m: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "match_radius_km = \"far\"\n").unwrap();

        assert!(matches!(
            BuildConfig::load(temp_dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
