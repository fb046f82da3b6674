// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization with the letterhead band cut off the top.

use image::RgbImage;
use image::imageops;
use pagegraft_core::error::{PagegraftError, Result};
use tracing::{debug, instrument};

use crate::pdf::SourceDocument;

/// Renders source pages for RASTER transfers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRasterizer {
    pub scale: f32,
    /// Height of the band removed from the top, in unscaled points.
    pub skip_height: f32,
}

impl PageRasterizer {
    pub fn new(scale: f32, skip_height: f32) -> Self {
        Self { scale, skip_height }
    }

    /// Number of pixel rows the skip band covers at this scale.
    pub fn skipped_rows(&self) -> u32 {
        let rows = (self.skip_height * self.scale).round();
        if rows <= 0.0 { 0 } else { rows as u32 }
    }

    /// Render page `index` and drop the top band.
    #[instrument(skip(self, source), fields(scale = self.scale, skip_height = self.skip_height))]
    pub fn rasterize(&self, source: &dyn SourceDocument, index: usize) -> Result<RgbImage> {
        let rendered = source.render_page(index, self.scale)?;
        let rows = self.skipped_rows();

        if rows >= rendered.height() {
            return Err(PagegraftError::Render {
                page: index,
                reason: format!(
                    "cropping {} rows leaves nothing of a {} row render",
                    rows,
                    rendered.height()
                ),
            });
        }

        debug!(
            width = rendered.width(),
            height = rendered.height(),
            rows,
            "Cropping top band"
        );
        Ok(crop_top(&rendered, rows))
    }
}

/// Remove the first `rows` pixel rows of `image`. Asking for more rows than
/// the image has yields an image of height zero.
pub fn crop_top(image: &RgbImage, rows: u32) -> RgbImage {
    let rows = rows.min(image.height());
    imageops::crop_imm(image, 0, rows, image.width(), image.height() - rows).to_image()
}
