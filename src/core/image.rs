use image::{DynamicImage, ImageReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("HEIF decoding error: {message}")]
    Heif { message: String },
}

/// Pixels of a photo plus whether the decoder already applied its rotation.
pub struct DecodedPhoto {
    pub image: DynamicImage,
    pub orientation_applied: bool,
}

/// Whether this build can decode HEIC/HEIF files.
pub const HEIF_SUPPORTED: bool = cfg!(feature = "heif");

pub fn is_heif(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "heic" || ext == "heif"
        })
        .unwrap_or(false)
}

/// Check that a file can be decoded by reading only its header.
/// Returns the pixel dimensions.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), PhotoError> {
    if is_heif(path) {
        return heif::probe(path);
    }
    let dimensions = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dimensions)
}

/// Fully decode a photo.
pub fn decode_photo(path: &Path) -> Result<DecodedPhoto, PhotoError> {
    if is_heif(path) {
        return heif::decode(path);
    }
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(DecodedPhoto {
        image,
        orientation_applied: false,
    })
}

#[cfg(feature = "heif")]
mod heif {
    use super::{DecodedPhoto, PhotoError};
    use image::{DynamicImage, RgbImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
    use std::path::Path;

    fn heif_error(e: libheif_rs::HeifError) -> PhotoError {
        PhotoError::Heif {
            message: e.to_string(),
        }
    }

    fn open(path: &Path) -> Result<HeifContext<'static>, PhotoError> {
        let path_str = path.to_str().ok_or_else(|| PhotoError::Heif {
            message: format!("non UTF-8 path {}", path.display()),
        })?;
        HeifContext::read_from_file(path_str).map_err(heif_error)
    }

    pub fn probe(path: &Path) -> Result<(u32, u32), PhotoError> {
        let ctx = open(path)?;
        let handle = ctx.primary_image_handle().map_err(heif_error)?;
        Ok((handle.width(), handle.height()))
    }

    // libheif applies the container's irot/imir transforms while decoding.
    pub fn decode(path: &Path) -> Result<DecodedPhoto, PhotoError> {
        let lib_heif = LibHeif::new();
        let ctx = open(path)?;
        let handle = ctx.primary_image_handle().map_err(heif_error)?;
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(heif_error)?;

        let planes = decoded.planes();
        let plane = planes.interleaved.ok_or_else(|| PhotoError::Heif {
            message: "no interleaved RGB plane".to_string(),
        })?;

        let (width, height) = (plane.width, plane.height);
        let row_len = width as usize * 3;
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in plane.data.chunks(plane.stride).take(height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| PhotoError::Heif {
            message: "pixel buffer size mismatch".to_string(),
        })?;

        Ok(DecodedPhoto {
            image: DynamicImage::ImageRgb8(image),
            orientation_applied: true,
        })
    }
}

#[cfg(not(feature = "heif"))]
mod heif {
    use super::{DecodedPhoto, PhotoError};
    use std::path::Path;

    fn unsupported(path: &Path) -> PhotoError {
        PhotoError::UnsupportedFormat {
            format: format!(
                "{} (build with the `heif` feature)",
                path.extension().unwrap_or_default().to_string_lossy()
            ),
        }
    }

    pub fn probe(path: &Path) -> Result<(u32, u32), PhotoError> {
        Err(unsupported(path))
    }

    pub fn decode(path: &Path) -> Result<DecodedPhoto, PhotoError> {
        Err(unsupported(path))
    }
}
