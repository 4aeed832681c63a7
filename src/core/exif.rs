use crate::core::location::GeoPoint;
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Tags checked for the capture time, highest priority first.
const TIMESTAMP_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

#[derive(Debug, Error)]
pub enum ExifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EXIF parsing error: {0}")]
    Parse(#[from] exif::Error),
}

/// What the pipeline needs from a photo's embedded metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMetadata {
    pub coords: Option<GeoPoint>,
    /// `None` when no timestamp tag was present or parseable; sorts before any known time.
    pub captured_at: Option<NaiveDateTime>,
    /// EXIF orientation, 1..=8.
    pub orientation: u16,
}

impl Default for PhotoMetadata {
    fn default() -> Self {
        Self {
            coords: None,
            captured_at: None,
            orientation: 1,
        }
    }
}

/// Ways of pulling an EXIF block out of a container, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadStrategy {
    /// Whole-container parse that fails on the first malformed entry.
    Strict,
    /// Keeps whatever parsed before the first error.
    Tolerant,
}

impl ReadStrategy {
    const ALL: [ReadStrategy; 2] = [ReadStrategy::Strict, ReadStrategy::Tolerant];

    fn read(self, path: &Path) -> Result<Exif, ExifError> {
        let file = File::open(path)?;
        let mut buf_reader = BufReader::new(file);

        match self {
            ReadStrategy::Strict => Ok(Reader::new().read_from_container(&mut buf_reader)?),
            ReadStrategy::Tolerant => {
                let mut reader = Reader::new();
                reader.continue_on_error(true);
                match reader.read_from_container(&mut buf_reader) {
                    Ok(exif) => Ok(exif),
                    Err(exif::Error::PartialResult(partial)) => {
                        let (exif, errors) = partial.into_inner();
                        log::debug!(
                            "Partial EXIF for {} ({} entries ignored)",
                            path.display(),
                            errors.len()
                        );
                        Ok(exif)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}

/// Service for extracting location and capture time from image files
pub struct ExifService;

impl ExifService {
    pub fn new() -> Self {
        Self
    }

    /// Read the EXIF block, falling back to the tolerant reader when the strict one fails.
    /// Returns `None` when neither strategy finds anything usable.
    pub fn read_exif(&self, file_path: &Path) -> Option<Exif> {
        for strategy in ReadStrategy::ALL {
            match strategy.read(file_path) {
                Ok(exif) => return Some(exif),
                Err(e) => log::debug!(
                    "{:?} EXIF read failed for {}: {}",
                    strategy,
                    file_path.display(),
                    e
                ),
            }
        }
        None
    }

    /// Extract metadata from an image file. Missing metadata is not an error.
    pub fn read_metadata(&self, file_path: &Path) -> PhotoMetadata {
        self.read_exif(file_path)
            .map(|exif| metadata_from_exif(&exif))
            .unwrap_or_default()
    }
}

impl Default for ExifService {
    fn default() -> Self {
        Self::new()
    }
}

pub fn metadata_from_exif(exif: &Exif) -> PhotoMetadata {
    PhotoMetadata {
        coords: gps_from_exif(exif),
        captured_at: captured_at_from_exif(exif),
        orientation: orientation_from_exif(exif),
    }
}

/// Decode the GPS block into a point. Hemisphere refs default to N and E.
pub fn gps_from_exif(exif: &Exif) -> Option<GeoPoint> {
    let lat_dms = dms_from_value(&exif.get_field(Tag::GPSLatitude, In::PRIMARY)?.value)?;
    let lon_dms = dms_from_value(&exif.get_field(Tag::GPSLongitude, In::PRIMARY)?.value)?;

    let lat_ref = exif
        .get_field(Tag::GPSLatitudeRef, In::PRIMARY)
        .and_then(|f| ascii_value(&f.value))
        .unwrap_or_else(|| "N".to_string());
    let lon_ref = exif
        .get_field(Tag::GPSLongitudeRef, In::PRIMARY)
        .and_then(|f| ascii_value(&f.value))
        .unwrap_or_else(|| "E".to_string());

    let (d, m, s) = lat_dms;
    let lat = dms_to_decimal(d, m, s, &lat_ref);
    let (d, m, s) = lon_dms;
    let lon = dms_to_decimal(d, m, s, &lon_ref);

    GeoPoint::new(lat, lon)
}

/// `deg + min/60 + sec/3600`, negated for the southern and western hemispheres.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, hemisphere: &str) -> f64 {
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    if hemisphere.eq_ignore_ascii_case("S") || hemisphere.eq_ignore_ascii_case("W") {
        -decimal
    } else {
        decimal
    }
}

/// Capture time from the first timestamp tag that parses.
pub fn captured_at_from_exif(exif: &Exif) -> Option<NaiveDateTime> {
    TIMESTAMP_TAGS.iter().find_map(|&tag| {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let raw = ascii_value(&field.value)?;
        let parsed = parse_exif_datetime(&raw);
        if parsed.is_none() {
            log::debug!("Unparseable {} value {:?}", tag, raw);
        }
        parsed
    })
}

pub fn orientation_from_exif(exif: &Exif) -> u16 {
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .filter(|o| (1..=8).contains(o))
        .map(|o| o as u16)
        .unwrap_or(1)
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` string.
pub fn parse_exif_datetime(datetime_str: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(datetime_str.trim(), EXIF_DATETIME_FORMAT).ok()
}

fn dms_from_value(value: &Value) -> Option<(f64, f64, f64)> {
    Some((
        component(value, 0)?,
        component(value, 1)?,
        component(value, 2)?,
    ))
}

/// One numeric component of a field, whatever its storage type.
/// A zero denominator reads as zero.
fn component(value: &Value, index: usize) -> Option<f64> {
    fn ratio(num: f64, denom: f64) -> f64 {
        if denom == 0.0 { 0.0 } else { num / denom }
    }

    match value {
        Value::Rational(vec) => vec.get(index).map(|r| ratio(r.num as f64, r.denom as f64)),
        Value::SRational(vec) => vec.get(index).map(|r| ratio(r.num as f64, r.denom as f64)),
        Value::Float(vec) => vec.get(index).map(|&v| v as f64),
        Value::Double(vec) => vec.get(index).copied(),
        Value::Short(vec) => vec.get(index).map(|&v| v as f64),
        Value::Long(vec) => vec.get(index).map(|&v| v as f64),
        _ => None,
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(vec) => vec.first().map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        _ => None,
    }
}
