//! EXIF blocks and JPEGs carrying them, for the unit tests in `src/core`
//! (mounted there as `core::test_support`) and the integration tests.

#![allow(dead_code)]

use exif::experimental::Writer;
use exif::{Exif, Field, In, Rational, Reader, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};
use std::io::Cursor;
use std::path::Path;

pub fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn dms_rationals(decimal: f64) -> Value {
    let abs = decimal.abs();
    let degrees = abs.trunc();
    let minutes_full = (abs - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;
    Value::Rational(vec![
        Rational::from((degrees as u32, 1)),
        Rational::from((minutes as u32, 1)),
        Rational::from(((seconds * 10_000.0).round() as u32, 10_000)),
    ])
}

/// GPS latitude/longitude fields (with refs) for a decimal coordinate.
pub fn gps_fields(lat: f64, lon: f64) -> Vec<Field> {
    vec![
        ascii_field(Tag::GPSLatitudeRef, if lat < 0.0 { "S" } else { "N" }),
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: dms_rationals(lat),
        },
        ascii_field(Tag::GPSLongitudeRef, if lon < 0.0 { "W" } else { "E" }),
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: dms_rationals(lon),
        },
    ]
}

pub fn orientation_field(orientation: u16) -> Field {
    Field {
        tag: Tag::Orientation,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![orientation]),
    }
}

/// Serialize fields into a raw TIFF-structured EXIF block.
pub fn tiff_bytes(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    buf.into_inner()
}

pub fn exif_from_fields(fields: &[Field]) -> Exif {
    Reader::new().read_raw(tiff_bytes(fields)).unwrap()
}

/// Write a gradient JPEG with the given EXIF fields in an APP1 segment.
pub fn write_jpeg_with_exif(
    path: &Path,
    width: u32,
    height: u32,
    fields: &[Field],
) -> Result<(), Box<dyn std::error::Error>> {
    write_jpeg_with_tiff(path, width, height, &tiff_bytes(fields))
}

/// Like `write_jpeg_with_exif`, but with an already serialized TIFF block.
pub fn write_jpeg_with_tiff(
    path: &Path,
    width: u32,
    height: u32,
    tiff: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let intensity = ((x + y) % 256) as u8;
        Rgb([intensity, intensity, intensity])
    });

    let mut jpeg = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 90))?;

    let segment_len = u16::try_from(2 + 6 + tiff.len())?;
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    // SOI, then APP1 "Exif\0\0", then the rest of the encoded stream
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);

    std::fs::write(path, out)?;
    Ok(())
}

/// Point the out-of-line value of `tag` in IFD0 past the end of the block.
/// Expects the big-endian layout `tiff_bytes` produces.
pub fn corrupt_value_offset(tiff: &mut [u8], tag: Tag) {
    let read_u16 = |at: usize| u16::from_be_bytes([tiff[at], tiff[at + 1]]);
    let ifd0 = u32::from_be_bytes([tiff[4], tiff[5], tiff[6], tiff[7]]) as usize;
    let count = read_u16(ifd0) as usize;
    let entry = (0..count)
        .map(|i| ifd0 + 2 + i * 12)
        .find(|&at| read_u16(at) == tag.number())
        .expect("tag not in IFD0");
    tiff[entry + 8..entry + 12].copy_from_slice(&0xFFFF_FF00u32.to_be_bytes());
}

/// Small geotagged JPEG, optionally with a capture time.
pub fn write_geotagged_jpeg(path: &Path, lat: f64, lon: f64, taken: Option<&str>) {
    let mut fields = gps_fields(lat, lon);
    if let Some(taken) = taken {
        fields.push(ascii_field(Tag::DateTimeOriginal, taken));
    }
    write_jpeg_with_exif(path, 96, 64, &fields).unwrap();
}

/// Write a plain gradient image; the format follows the extension.
pub fn create_test_image(
    path: &Path,
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let intensity = ((x + y) % 256) as u8;
        Rgb([intensity, intensity, intensity])
    });

    img.save(path)?;
    Ok(())
}
