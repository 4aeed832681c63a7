use crate::core::image::{PhotoError, decode_photo};
use crate::core::resolver::PhotoWriter;
use crate::core::scanner::PhotoRecord;
use image::{DynamicImage, imageops::FilterType};
use std::fs;
use std::path::Path;

pub const DEFAULT_MAX_PHOTO_PX: u32 = 1200;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Writes the web-sized JPEG copy of a claimed photo.
pub struct WebPhotoService {
    max_px: u32,
    quality: u8,
}

impl WebPhotoService {
    pub fn new(max_px: u32, quality: u8) -> Self {
        Self { max_px, quality }
    }

    /// Decode, orient, shrink and save `source` as a JPEG at `dest`.
    pub fn generate(&self, source: &Path, orientation: u16, dest: &Path) -> Result<(), PhotoError> {
        let decoded = decode_photo(source)?;
        let img = if decoded.orientation_applied {
            decoded.image
        } else {
            apply_orientation(decoded.image, orientation)
        };
        let resized = fit_within(img, self.max_px);
        self.save_jpeg(&resized, dest)
    }

    fn save_jpeg(&self, img: &DynamicImage, path: &Path) -> Result<(), PhotoError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // JPEG has no alpha channel
        let rgb_img = img.to_rgb8();
        let mut output = fs::File::create(path)?;
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, self.quality);
        rgb_img.write_with_encoder(encoder)?;

        Ok(())
    }
}

impl Default for WebPhotoService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PHOTO_PX, DEFAULT_JPEG_QUALITY)
    }
}

impl PhotoWriter for WebPhotoService {
    fn write_web_photo(&self, photo: &PhotoRecord, dest: &Path) -> Result<(), PhotoError> {
        self.generate(&photo.path, photo.orientation, dest)
    }
}

/// Rotate/flip pixels so the image displays upright for the given EXIF orientation.
pub fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Downscale to fit a `max_px` square, keeping the aspect ratio. Never upscales.
pub fn fit_within(img: DynamicImage, max_px: u32) -> DynamicImage {
    if img.width() <= max_px && img.height() <= max_px {
        return img;
    }
    img.resize(max_px, max_px, FilterType::Lanczos3)
}
