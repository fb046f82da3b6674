// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font-size normalization — pull the sizes found on a source page into a
// narrower band so the transferred text reads evenly on the letterhead.

use pagegraft_core::{SizeStatistics, TransferConfig};

/// Maps source font sizes onto the configured target band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizeNormalizer {
    pub min_size: f32,
    pub max_size: f32,
    pub size_scale: f32,
}

impl FontSizeNormalizer {
    pub fn new(min_size: f32, max_size: f32, size_scale: f32) -> Self {
        Self {
            min_size,
            max_size,
            size_scale,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(
            config.min_font_size,
            config.max_font_size,
            config.size_scale_factor,
        )
    }

    /// Normalized size for `size`, given the size distribution of its page.
    ///
    /// The relative position of `size` between the page's smallest and
    /// largest size is squeezed into the middle half of the band, so that no
    /// run ends up at either extreme. A page with a single size maps to the
    /// middle. `min_size` is added once more after the band mapping, which
    /// shifts every result up by that amount.
    pub fn normalize(&self, size: f32, stats: &SizeStatistics) -> f32 {
        let range = stats.max - stats.min;
        let normalized = if range == 0.0 {
            0.5
        } else {
            (size - stats.min) / range
        };
        let adjusted = normalized * 0.5 + 0.25;
        let compressed = self.min_size + adjusted * (self.max_size - self.min_size);
        (compressed + self.min_size) * self.size_scale
    }
}

impl From<&TransferConfig> for FontSizeNormalizer {
    fn from(config: &TransferConfig) -> Self {
        Self::from_config(config)
    }
}
