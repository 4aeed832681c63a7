use crate::core::exif::ExifService;
use crate::core::image::{HEIF_SUPPORTED, is_heif, probe_dimensions};
use crate::core::location::GeoPoint;
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions the loader accepts, compared case-insensitively.
pub const SUPPORTED_FORMATS: [&str; 5] = ["heic", "heif", "jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{path} is HEIC/HEIF but this build has no HEIF support; rebuild with `--features heif`")]
    HeifUnsupported { path: PathBuf },
}

/// A geotagged photo ready for clustering and matching.
///
/// Pixels are not kept in memory: the path and orientation are enough to
/// decode the image once, when its web copy is written.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub path: PathBuf,
    pub coords: GeoPoint,
    pub captured_at: Option<NaiveDateTime>,
    pub orientation: u16,
}

impl PhotoRecord {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }

    /// Output name for the web copy: original stem with a `.jpg` extension.
    pub fn web_file_name(&self) -> String {
        let stem = self.path.file_stem().unwrap_or_default().to_string_lossy();
        format!("{stem}.jpg")
    }
}

pub struct ScannerService {
    exif_service: ExifService,
}

impl ScannerService {
    pub fn new() -> Self {
        Self {
            exif_service: ExifService::new(),
        }
    }

    pub fn is_supported_format(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                SUPPORTED_FORMATS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// Supported files directly inside `dir`, sorted by file name.
    pub fn discover_files(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Could not read directory entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.is_supported_format(path))
            .collect()
    }

    /// Load every supported photo in `dir` that carries GPS coordinates.
    ///
    /// Undecodable files and files without coordinates are logged and skipped.
    /// A missing directory yields no photos. HEIC/HEIF files in a build without
    /// HEIF support stop the load before any file is read.
    pub fn load_photos(&self, dir: &Path) -> Result<Vec<PhotoRecord>, ScanError> {
        if !dir.is_dir() {
            log::warn!("Photo directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let files = self.discover_files(dir);
        if !HEIF_SUPPORTED {
            if let Some(path) = files.iter().find(|path| is_heif(path)) {
                return Err(ScanError::HeifUnsupported { path: path.clone() });
            }
        }
        let progress = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{bar:30}] {pos}/{len} {msg}") {
            progress.set_style(style);
        }

        let mut photos = Vec::new();
        for path in files {
            progress.set_message(
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned(),
            );
            if let Some(photo) = self.process_single_file(&path) {
                photos.push(photo);
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(photos)
    }

    fn process_single_file(&self, file_path: &Path) -> Option<PhotoRecord> {
        let name = file_path.file_name().unwrap_or_default().to_string_lossy();

        if let Err(e) = probe_dimensions(file_path) {
            log::warn!("error {}: {}", name, e);
            return None;
        }

        let metadata = self.exif_service.read_metadata(file_path);
        let Some(coords) = metadata.coords else {
            log::info!("skip  {}  (no GPS)", name);
            return None;
        };

        Some(PhotoRecord {
            path: file_path.to_path_buf(),
            coords,
            captured_at: metadata.captured_at,
            orientation: metadata.orientation,
        })
    }
}

impl Default for ScannerService {
    fn default() -> Self {
        Self::new()
    }
}
