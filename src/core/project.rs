use crate::config::BuildConfig;
use crate::core::duplicate::DuplicateDetector;
use crate::core::gazetteer::SettlementMatcher;
use crate::core::resolver::{AssignmentResolver, PhotoWriter, ResolveError};
use crate::core::scanner::{ScanError, ScannerService};
use crate::services::dataset::{DatasetError, write_data_json, write_unvisited_csv};
use crate::services::gazetteer::{GazetteerError, GazetteerService, SettlementFetcher};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to create output directory {path}: {error}")]
    OutputDir {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Gazetteer(#[from] GazetteerError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// What a finished build reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub visited: usize,
    pub total: usize,
    pub data_path: PathBuf,
    pub csv_path: PathBuf,
}

impl BuildSummary {
    /// Share of the gazetteer visited, in percent.
    pub fn percent_visited(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.visited as f64 * 100.0 / self.total as f64
    }
}

/// Runs one full build: photos in, dataset and web photos out.
pub struct SiteBuilder<'a, F: SettlementFetcher, W: PhotoWriter> {
    config: &'a BuildConfig,
    gazetteer: GazetteerService<F>,
    writer: W,
    scanner: ScannerService,
}

impl<'a, F: SettlementFetcher, W: PhotoWriter> SiteBuilder<'a, F, W> {
    pub fn new(config: &'a BuildConfig, fetcher: F, writer: W) -> Self {
        Self {
            config,
            gazetteer: GazetteerService::new(config.settlements_cache_path(), fetcher),
            writer,
            scanner: ScannerService::new(),
        }
    }

    pub fn build(&self, refresh_settlements: bool, generated: NaiveDate) -> Result<BuildSummary, BuildError> {
        let photos_out = self.config.photos_out();
        fs::create_dir_all(&photos_out).map_err(|error| BuildError::OutputDir {
            path: photos_out.clone(),
            error,
        })?;

        let photos_in = self.config.photos_in();
        let photos = timed("loading photos", || self.scanner.load_photos(&photos_in))?;
        log::info!("{} photos with GPS data", photos.len());

        let detector = DuplicateDetector::new(self.config.dedup_radius_m);
        let photos = timed("deduplicating", || detector.deduplicate(photos));
        log::info!("{} unique locations after deduplication", photos.len());

        let settlements = timed("loading settlements", || self.gazetteer.load(refresh_settlements))?;

        let matcher = SettlementMatcher::new(&settlements, self.config.match_radius_km);
        let resolver = AssignmentResolver::new(matcher, &self.writer, &photos_out, self.config.home);
        let result = timed("matching photos", || resolver.resolve(&photos, generated))?;

        let data_path = self.config.data_json_path();
        let csv_path = self.config.unvisited_csv_path();
        write_data_json(&result, &data_path)?;
        write_unvisited_csv(&result.unvisited, &csv_path)?;

        Ok(BuildSummary {
            visited: result.stats.visited,
            total: result.stats.total,
            data_path,
            csv_path,
        })
    }
}

fn timed<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!("{} took {:.2?}", label, start.elapsed());
    result
}
