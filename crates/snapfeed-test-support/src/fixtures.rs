//! Scratch directories and encoded image payloads for tests.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

/// Create a scratch snapshot directory removed on drop.
///
/// # Errors
///
/// Returns an error if the temporary directory cannot be created.
pub fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("snapfeed-")
        .tempdir()
        .context("failed to create scratch directory")
}

/// Encode a solid-colour PNG of the given dimensions.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encoded_png(width: u32, height: u32, shade: u8) -> Result<Vec<u8>> {
    encode(width, height, shade, ImageFormat::Png)
}

/// Encode a solid-colour JPEG of the given dimensions.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encoded_jpeg(width: u32, height: u32, shade: u8) -> Result<Vec<u8>> {
    encode(width, height, shade, ImageFormat::Jpeg)
}

/// Truncate an encoded payload to simulate a half-written file.
#[must_use]
pub fn truncated(bytes: &[u8], keep: usize) -> Vec<u8> {
    bytes[..keep.min(bytes.len())].to_vec()
}

fn encode(width: u32, height: u32, shade: u8, format: ImageFormat) -> Result<Vec<u8>> {
    let pixel = Rgb([shade, shade.wrapping_add(64), shade.wrapping_add(128)]);
    let img = RgbImage::from_pixel(width, height, pixel);
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format)
        .context("failed to encode fixture image")?;
    Ok(cursor.into_inner())
}
