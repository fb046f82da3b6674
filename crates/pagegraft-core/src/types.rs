// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: page geometry, extracted page content, and transfer
// bookkeeping.
//
// All geometry is expressed in page space: PDF points with the origin at the
// top-left corner of the page and y growing downward.

use std::path::PathBuf;

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one transfer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(pub Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three files involved in a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPaths {
    pub source: PathBuf,
    pub background: PathBuf,
    pub output: PathBuf,
}

// -- Geometry -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle; `(x0, y0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// The same rectangle moved `dy` points down the page.
    pub fn translate_y(&self, dy: f32) -> Self {
        Self {
            y0: self.y0 + dy,
            y1: self.y1 + dy,
            ..*self
        }
    }
}

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

// -- Colour -------------------------------------------------------------------

/// RGB colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Resolve raw colour components to a usable RGB triple.
///
/// Anything that is not a sequence of at least three finite numbers becomes
/// opaque black. Longer sequences keep their first three components.
pub fn safe_color(components: &[f32]) -> Rgb {
    match components {
        [r, g, b, ..] if r.is_finite() && g.is_finite() && b.is_finite() => Rgb::new(*r, *g, *b),
        _ => Rgb::BLACK,
    }
}

// -- Extracted content --------------------------------------------------------

/// One word of text lifted from a source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// Baseline start of the run.
    pub origin: Point,
    pub font_size: f32,
    /// Raw colour components as reported by the PDF engine.
    pub color: Vec<f32>,
}

impl TextRun {
    pub fn new(text: impl Into<String>, origin: Point, font_size: f32, color: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            origin,
            font_size,
            color,
        }
    }

    /// The run's colour after the colour-safety rule.
    pub fn rgb(&self) -> Rgb {
        safe_color(&self.color)
    }
}

/// An embedded raster image lifted from a source page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRun {
    pub raw_bytes: Vec<u8>,
    pub bbox: Rect,
    /// Encoding of `raw_bytes`, when recognisable.
    pub source_format: Option<ImageFormat>,
}

impl ImageRun {
    /// Wrap extracted bytes, sniffing their encoding.
    pub fn new(raw_bytes: Vec<u8>, bbox: Rect) -> Self {
        let source_format = image::guess_format(&raw_bytes).ok();
        Self {
            raw_bytes,
            bbox,
            source_format,
        }
    }
}

/// Snapshot of everything transferable on one source page, in extraction
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub text_runs: Vec<TextRun>,
    pub images: Vec<ImageRun>,
}

/// Font size distribution of a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeStatistics {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
}

impl SizeStatistics {
    /// Value used for every statistic when a page carries no text.
    pub const NEUTRAL_SIZE: f32 = 12.0;

    pub fn from_sizes(sizes: impl IntoIterator<Item = f32>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        for size in sizes {
            count += 1;
            sum += f64::from(size);
            min = min.min(size);
            max = max.max(size);
        }

        if count == 0 {
            return Self {
                mean: Self::NEUTRAL_SIZE,
                min: Self::NEUTRAL_SIZE,
                max: Self::NEUTRAL_SIZE,
            };
        }

        Self {
            mean: (sum / count as f64) as f32,
            min,
            max,
        }
    }

    pub fn from_runs(runs: &[TextRun]) -> Self {
        Self::from_sizes(runs.iter().map(|run| run.font_size))
    }
}
