use crate::core::resolver::{BuildResult, UnvisitedEntry};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: [&str; 2] = ["Settlement", "Distance from home (km)"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error writing {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write `data.json`. The file is replaced in one rename so a reader never
/// sees a half-written dataset.
pub fn write_data_json(result: &BuildResult, path: &Path) -> Result<(), DatasetError> {
    let json = serde_json::to_string_pretty(result)?;
    write_atomically(path, json.as_bytes())
}

/// Write the unvisited settlements as CSV, nearest first.
pub fn write_unvisited_csv(unvisited: &[UnvisitedEntry], path: &Path) -> Result<(), DatasetError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for entry in sorted_by_distance(unvisited) {
        let distance = format!("{:.1}", entry.distance_km);
        writer.write_record([entry.name.as_str(), distance.as_str()])?;
    }
    let bytes = writer.into_inner().map_err(|e| DatasetError::Io {
        path: path.to_path_buf(),
        error: e.into_error(),
    })?;
    write_atomically(path, &bytes)
}

/// Unvisited entries ordered by ascending distance; ties keep gazetteer order.
pub fn sorted_by_distance(unvisited: &[UnvisitedEntry]) -> Vec<&UnvisitedEntry> {
    let mut sorted: Vec<&UnvisitedEntry> = unvisited.iter().collect();
    sorted.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    sorted
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), DatasetError> {
    let io_error = |error| DatasetError::Io {
        path: path.to_path_buf(),
        error,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents).map_err(io_error)?;
    fs::rename(&tmp_path, path).map_err(io_error)
}
