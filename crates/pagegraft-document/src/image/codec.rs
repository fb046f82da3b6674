// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec — decoding embedded images, forcing them to plain RGB, and
// lossless re-encoding. Backed by the `image` crate.

use image::{DynamicImage, ImageFormat, RgbImage};
use pagegraft_core::error::{PagegraftError, Result};
use tracing::{debug, instrument};

/// Identify the encoding of `data` from its magic bytes.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}

/// Decode any supported encoding (JPEG, PNG, TIFF, BMP, GIF, ...).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| PagegraftError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "Image decoded"
    );
    Ok(img)
}

/// Force a decoded image into the 8-bit, 3-channel RGB colour model. Alpha is
/// dropped, grey is expanded, deeper samples are narrowed.
pub fn to_rgb(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

/// Encode as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    encode_to_format(image, ImageFormat::Png)
}

/// Decode `data`, convert it to RGB and re-encode it losslessly. This is the
/// second chance given to embedded images the output document rejected.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn convert_to_rgb_png(data: &[u8]) -> Result<Vec<u8>> {
    let decoded = decode(data)?;
    let rgb = DynamicImage::ImageRgb8(to_rgb(&decoded));
    encode_png(&rgb)
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| PagegraftError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
