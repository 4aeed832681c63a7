use crate::core::gazetteer::{SettlementMatcher, distance_from_home};
use crate::core::image::PhotoError;
use crate::core::location::GeoPoint;
use crate::core::scanner::PhotoRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Site-relative directory the web photos are referenced from.
pub const WEB_PHOTO_PREFIX: &str = "photos";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to write web photo for {source_path} to {dest}: {error}")]
    PhotoOutput {
        source_path: PathBuf,
        dest: PathBuf,
        #[source]
        error: PhotoError,
    },
}

/// Output side of the resolver: writes the web copy of a claimed photo.
pub trait PhotoWriter {
    fn write_web_photo(&self, photo: &PhotoRecord, dest: &Path) -> Result<(), PhotoError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedEntry {
    pub name: String,
    /// Where the photo was taken.
    #[serde(flatten)]
    pub coords: GeoPoint,
    pub photo: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnvisitedEntry {
    pub name: String,
    #[serde(flatten)]
    pub coords: GeoPoint,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    pub visited: usize,
    pub total: usize,
    pub generated: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub visited: Vec<VisitedEntry>,
    pub unvisited: Vec<UnvisitedEntry>,
    pub stats: BuildStats,
}

/// Assigns deduplicated photos to settlements.
///
/// Photos are processed in the order given. A settlement is claimed by the
/// first photo that matches it; later matches for the same settlement are
/// dropped. With deduplicator output this makes the winner depend on file
/// name order, which is deterministic for a given photo folder.
pub struct AssignmentResolver<'a, W: PhotoWriter> {
    matcher: SettlementMatcher<'a>,
    writer: &'a W,
    photos_out: &'a Path,
    home: GeoPoint,
}

impl<'a, W: PhotoWriter> AssignmentResolver<'a, W> {
    pub fn new(matcher: SettlementMatcher<'a>, writer: &'a W, photos_out: &'a Path, home: GeoPoint) -> Self {
        Self {
            matcher,
            writer,
            photos_out,
            home,
        }
    }

    pub fn resolve(&self, photos: &[PhotoRecord], generated: NaiveDate) -> Result<BuildResult, ResolveError> {
        let settlements = self.matcher.settlements();
        let mut claimed = vec![false; settlements.len()];
        let mut visited = Vec::new();

        for photo in photos {
            let Some(found) = self.matcher.nearest(&photo.coords) else {
                log::info!("no match  {}  (nearest settlement too far)", photo.file_name());
                continue;
            };

            let name = &found.settlement.name;
            if claimed[found.index] {
                log::info!("dup match {}  -> {}, skipping", photo.file_name(), name);
                continue;
            }
            claimed[found.index] = true;

            let out_name = photo.web_file_name();
            let dest = self.photos_out.join(&out_name);
            self.writer
                .write_web_photo(photo, &dest)
                .map_err(|error| ResolveError::PhotoOutput {
                    source_path: photo.path.clone(),
                    dest: dest.clone(),
                    error,
                })?;

            visited.push(VisitedEntry {
                name: name.clone(),
                coords: photo.coords,
                photo: format!("{WEB_PHOTO_PREFIX}/{out_name}"),
                date: photo.captured_at.map(|t| t.format("%Y-%m-%d").to_string()),
            });
            log::info!("visited   {:<30}  {:.2} km", name, found.distance_km);
        }

        let unvisited: Vec<UnvisitedEntry> = settlements
            .iter()
            .zip(&claimed)
            .filter(|(_, is_claimed)| !**is_claimed)
            .map(|(settlement, _)| UnvisitedEntry {
                name: settlement.name.clone(),
                coords: settlement.coords,
                distance_km: distance_from_home(&self.home, settlement),
            })
            .collect();

        let stats = BuildStats {
            visited: visited.len(),
            total: visited.len() + unvisited.len(),
            generated,
        };

        Ok(BuildResult {
            visited,
            unvisited,
            stats,
        })
    }
}
