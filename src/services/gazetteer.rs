use crate::core::gazetteer::{Settlement, SettlementKind};
use crate::core::location::GeoPoint;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Error)]
pub enum GazetteerError {
    #[error("HTTP error fetching settlements: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error on settlement cache {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Malformed settlement cache {path}: {error}")]
    Cache {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    #[error("Malformed settlement response: {message}")]
    MalformedResponse { message: String },
}

/// Something that can produce the full settlement list from a live source.
pub trait SettlementFetcher {
    fn fetch(&self) -> Result<Vec<Settlement>, GazetteerError>;
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Fetches place nodes inside an administrative area from an Overpass endpoint.
pub struct OverpassClient {
    client: reqwest::blocking::Client,
    url: String,
    area: String,
}

impl OverpassClient {
    pub fn new(url: impl Into<String>, area: impl Into<String>, timeout: Duration) -> Result<Self, GazetteerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            area: area.into(),
        })
    }

    pub fn query(&self) -> String {
        overpass_query(&self.area)
    }
}

/// Overpass QL selecting every hamlet, village, town and city node in a county-level area.
pub fn overpass_query(area: &str) -> String {
    format!(
        r#"[out:json][timeout:90];
area["name"="{area}"]["boundary"="administrative"]["admin_level"="6"]->.county;
(
  node["place"~"^(hamlet|village|town|city)$"](area.county);
);
out body;
"#
    )
}

impl SettlementFetcher for OverpassClient {
    fn fetch(&self) -> Result<Vec<Settlement>, GazetteerError> {
        log::info!("Fetching {} settlements from OpenStreetMap (this may take ~30s)", self.area);
        let query = self.query();
        let body = self
            .client
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()?
            .error_for_status()?
            .text()?;

        let settlements = parse_overpass_response(&body)?;
        log::info!("Found {} settlements", settlements.len());
        Ok(settlements)
    }
}

/// Turn an Overpass JSON body into settlements sorted by name.
///
/// Unnamed elements are dropped. A named element without usable coordinates
/// makes the whole response malformed.
pub fn parse_overpass_response(body: &str) -> Result<Vec<Settlement>, GazetteerError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| GazetteerError::MalformedResponse {
            message: e.to_string(),
        })?;

    let mut settlements = Vec::with_capacity(response.elements.len());
    for element in response.elements {
        let Some(name) = element.tags.get("name") else {
            continue;
        };
        let coords = element.lat.zip(element.lon).and_then(|(lat, lon)| GeoPoint::new(lat, lon));
        let Some(coords) = coords else {
            return Err(GazetteerError::MalformedResponse {
                message: format!("settlement {name} has no usable coordinates"),
            });
        };
        let kind = element
            .tags
            .get("place")
            .map(|place| SettlementKind::from(place.as_str()))
            .unwrap_or_default();
        settlements.push(Settlement::new(name.clone(), coords, kind));
    }

    // Overpass gives no ordering guarantee
    settlements.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(settlements)
}

/// Loads the gazetteer from its cache file, or fetches and caches it.
pub struct GazetteerService<F: SettlementFetcher> {
    cache_path: PathBuf,
    fetcher: F,
}

impl<F: SettlementFetcher> GazetteerService<F> {
    pub fn new(cache_path: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            cache_path: cache_path.into(),
            fetcher,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Cached settlements unless `refresh` is set or there is no cache yet.
    pub fn load(&self, refresh: bool) -> Result<Vec<Settlement>, GazetteerError> {
        if !refresh && self.cache_path.exists() {
            log::info!("Loading cached settlements from {}", self.cache_path.display());
            return self.read_cache();
        }

        let settlements = self.fetcher.fetch()?;
        self.write_cache(&settlements)?;
        Ok(settlements)
    }

    pub fn read_cache(&self) -> Result<Vec<Settlement>, GazetteerError> {
        let content = fs::read_to_string(&self.cache_path).map_err(|error| self.io_error(error))?;
        serde_json::from_str(&content).map_err(|error| GazetteerError::Cache {
            path: self.cache_path.clone(),
            error,
        })
    }

    pub fn write_cache(&self, settlements: &[Settlement]) -> Result<(), GazetteerError> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
        }
        let json = serde_json::to_string_pretty(settlements).map_err(|error| GazetteerError::Cache {
            path: self.cache_path.clone(),
            error,
        })?;
        fs::write(&self.cache_path, json).map_err(|error| self.io_error(error))
    }

    fn io_error(&self, error: std::io::Error) -> GazetteerError {
        GazetteerError::Io {
            path: self.cache_path.clone(),
            error,
        }
    }
}
