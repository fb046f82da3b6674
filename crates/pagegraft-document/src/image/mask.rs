// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background masking — turn near-white pixels of a rendered page transparent
// so the page can be laid over a letterhead.

use image::{DynamicImage, RgbImage, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Convert `image` to RGBA and clear the alpha of every pixel whose luminance
/// (mean of R, G and B) is strictly above `threshold`.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn remove_background(image: RgbImage, threshold: u8) -> RgbaImage {
    let mut rgba = DynamicImage::ImageRgb8(image).into_rgba8();
    mask_in_place(&mut rgba, threshold);
    rgba
}

/// Apply the luminance mask to an RGBA buffer. Pixels at or below the
/// threshold keep their alpha.
pub fn mask_in_place(image: &mut RgbaImage, threshold: u8) {
    // mean(r, g, b) > t  <=>  r + g + b > 3t, which stays in integers.
    let limit = 3 * u16::from(threshold);

    let masked: usize = image
        .par_chunks_exact_mut(4)
        .map(|px| {
            let sum = u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2]);
            if sum > limit {
                px[3] = 0;
                1
            } else {
                0
            }
        })
        .sum();

    debug!(threshold, masked, "Background masked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn alpha_at(image: &RgbaImage, x: u32, y: u32) -> u8 {
        image.get_pixel(x, y).0[3]
    }

    #[test]
    fn bright_pixels_become_transparent() {
        let mut img = RgbImage::from_pixel(4, 1, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([10, 20, 30]));
        img.put_pixel(2, 0, Rgb([251, 251, 251]));
        img.put_pixel(3, 0, Rgb([250, 250, 250]));

        let out = remove_background(img, 250);

        assert_eq!(out.dimensions(), (4, 1));
        assert_eq!(alpha_at(&out, 0, 0), 0);
        assert_eq!(alpha_at(&out, 1, 0), 255);
        assert_eq!(alpha_at(&out, 2, 0), 0);
        // Exactly at the threshold is not masked.
        assert_eq!(alpha_at(&out, 3, 0), 255);
    }

    #[test]
    fn luminance_is_the_channel_mean() {
        // Mean is 250.33, above 250 although no single channel tells you so.
        let img = RgbImage::from_pixel(1, 1, Rgb([251, 250, 250]));
        assert_eq!(alpha_at(&remove_background(img, 250), 0, 0), 0);

        // Mean is 249.67.
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 255, 239]));
        assert_eq!(alpha_at(&remove_background(img, 250), 0, 0), 255);
    }

    #[test]
    fn threshold_255_never_masks_pure_white() {
        let img = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let out = remove_background(img, 255);
        assert!(out.pixels().all(|px| px.0[3] == 255));
    }

    #[test]
    fn threshold_zero_masks_everything_but_black() {
        let mut img = RgbImage::from_pixel(3, 3, Rgb([1, 0, 0]));
        img.put_pixel(1, 1, Rgb([0, 0, 0]));

        let out = remove_background(img, 0);

        assert_eq!(alpha_at(&out, 1, 1), 255);
        let masked = out.pixels().filter(|px| px.0[3] == 0).count();
        assert_eq!(masked, 8);
    }

    #[test]
    fn colour_channels_are_untouched() {
        let img = RgbImage::from_pixel(2, 2, Rgb([252, 253, 254]));
        let out = remove_background(img, 100);
        assert!(out.pixels().all(|px| px.0 == [252, 253, 254, 0]));
    }
}
