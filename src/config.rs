use crate::models::Coordinate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub api: ApiConfig,
    pub retrieval: RetrievalConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub auto_geolocate: bool, // Ask the IP geolocation service on startup
    pub lookup_ip: String,    // Empty means "this host's public address"
    pub default_lat: f64,     // Used when geolocation fails or is off
    pub default_lon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub backend_url: String,
    pub geocoder_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Drop completions of retrievals that were superseded by a newer one.
    /// Turning this off lets whichever response lands last win.
    pub fence_stale_results: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub default_view: String, // "Dashboard" or "Map"
    pub tick_rate_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub level: String, // trace, debug, info, warn or error
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            auto_geolocate: true,
            lookup_ip: String::new(),
            default_lat: 34.0522,
            default_lon: -118.2437,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000/api".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fence_stale_results: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_view: "Dashboard".to_string(),
            tick_rate_ms: 150,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            level: "info".to_string(),
        }
    }
}

impl LocationConfig {
    pub fn default_center(&self) -> Coordinate {
        Coordinate::new(self.default_lat, self.default_lon)
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, writes the defaults there and uses them.
    pub fn load() -> Self {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if let Ok(content) = fs::read_to_string(path) {
            return match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Config::default()
                }
            };
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [api]
            backend_url = "http://fires.internal:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.backend_url, "http://fires.internal:8080");
        assert_eq!(config.api.request_timeout_seconds, 10);
        assert_eq!(config.location.default_center(), Coordinate::new(34.0522, -118.2437));
        assert!(config.retrieval.fence_stale_results);
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(Config::parse("[location\nauto_geolocate = yes").is_err());
    }

    #[test]
    fn test_load_from_missing_file_writes_defaults() {
        let dir = std::env::temp_dir().join(format!("ember-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path);

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(path.exists());

        fs::write(&path, "[location]\nauto_geolocate = false\n").unwrap();
        assert!(!Config::load_from(&path).location.auto_geolocate);

        let _ = fs::remove_dir_all(&dir);
    }
}
