// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Production PDF engine. Pdfium renders pages and reads their text; lopdf
// handles page geometry, page export, image extraction and the output
// document.

use std::path::{Path, PathBuf};

use image::RgbImage;
use pagegraft_core::error::{PagegraftError, Result};
use pagegraft_core::{PageContent, PageSize, Point, TextRun};
use pdfium_render::prelude::{PdfBitmapFormat, PdfDocument, PdfRenderConfig, Pdfium};
use tracing::{debug, info, instrument};

use super::engine::{OutputDocument, PdfEngine, Release, SourceDocument};
use super::objects;
use super::reader::PdfReader;
use super::writer::PdfWriter;

/// Environment variable naming a directory that holds the Pdfium library.
pub const PDFIUM_DIR_ENV: &str = "PAGEGRAFT_PDFIUM_DIR";

/// [`PdfEngine`] backed by Pdfium and lopdf.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind the Pdfium library, trying the working directory,
    /// `./vendor/pdfium/lib/`, `$PAGEGRAFT_PDFIUM_DIR` and finally the system
    /// library path.
    pub fn new() -> Result<Self> {
        let mut candidates = vec![
            Pdfium::pdfium_platform_library_name_at_path(Path::new("./")),
            Pdfium::pdfium_platform_library_name_at_path(Path::new("./vendor/pdfium/lib/")),
        ];
        if let Ok(dir) = std::env::var(PDFIUM_DIR_ENV) {
            candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(&dir)));
        }

        for path in candidates {
            if let Ok(bindings) = Pdfium::bind_to_library(&path) {
                info!(path = %path.display(), "Pdfium bound");
                return Ok(Self {
                    pdfium: Pdfium::new(bindings),
                });
            }
        }

        let bindings = Pdfium::bind_to_system_library().map_err(|err| {
            PagegraftError::EngineUnavailable(format!(
                "{} not found locally, in ${} or on the system library path: {}",
                Pdfium::pdfium_platform_library_name().to_string_lossy(),
                PDFIUM_DIR_ENV,
                err
            ))
        })?;
        info!("Pdfium bound from system library");

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfEngine for PdfiumEngine {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn open(&self, path: &Path) -> Result<Box<dyn SourceDocument + '_>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|err| PagegraftError::Open {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        let structure = PdfReader::open(path)?;

        debug!(pages = document.pages().len(), "Source document opened");
        Ok(Box::new(PdfiumSource {
            document,
            structure,
            path: path.to_path_buf(),
        }))
    }

    fn create_output(&self) -> Result<Box<dyn OutputDocument + '_>> {
        Ok(Box::new(PdfWriter::new()))
    }
}

/// An opened document: the Pdfium view for pixels and text, the lopdf view
/// for structure.
struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
    structure: PdfReader,
    path: PathBuf,
}

impl PdfiumSource<'_> {
    fn pdfium_index(&self, index: usize) -> Result<u16> {
        u16::try_from(index).map_err(|_| {
            PagegraftError::PdfError(format!("page index {} beyond Pdfium's range", index))
        })
    }

    /// Characters of page `index` with positions converted to page space
    /// against the same media box used for image placement.
    #[allow(deprecated)] // PdfRect field access deprecated in 0.8.28
    fn glyphs(&self, index: usize) -> Result<Vec<Glyph>> {
        let extract_error = |reason: String| PagegraftError::Extract { page: index, reason };

        let media_box = self.structure.media_box(index)?;
        let page = self
            .document
            .pages()
            .get(self.pdfium_index(index)?)
            .map_err(|err| extract_error(err.to_string()))?;
        let text = page.text().map_err(|err| extract_error(err.to_string()))?;

        let mut glyphs = Vec::new();
        for ch in text.chars().iter() {
            let (Some(unicode), Ok(rect)) = (ch.unicode_char(), ch.tight_bounds()) else {
                continue;
            };
            // Pen position on the baseline; fall back to the glyph's lower
            // edge when Pdfium cannot report it.
            let (origin_x, origin_y) = match ch.origin() {
                Ok((x, y)) => (x.value, y.value),
                Err(_) => (rect.left.value, rect.bottom.value),
            };
            let color = match ch.fill_color() {
                Ok(color) => vec![
                    f32::from(color.red()) / 255.0,
                    f32::from(color.green()) / 255.0,
                    f32::from(color.blue()) / 255.0,
                ],
                Err(_) => Vec::new(),
            };

            let (left, _) = objects::to_page_space(media_box, rect.left.value, 0.0);
            let (right, _) = objects::to_page_space(media_box, rect.right.value, 0.0);
            let (x, baseline) = objects::to_page_space(media_box, origin_x, origin_y);
            glyphs.push(Glyph {
                ch: unicode,
                left,
                right,
                origin: Point::new(x, baseline),
                size: ch.scaled_font_size().value,
                color,
            });
        }
        Ok(glyphs)
    }
}

impl Release for PdfiumSource<'_> {
    fn release(self: Box<Self>) -> Result<()> {
        debug!(path = %self.path.display(), "Source document released");
        Ok(())
    }
}

impl SourceDocument for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        usize::from(self.document.pages().len())
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        self.structure.page_size(index)
    }

    #[instrument(skip(self))]
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbImage> {
        let render_error = |reason: String| PagegraftError::Render { page: index, reason };

        let page = self
            .document
            .pages()
            .get(self.pdfium_index(index)?)
            .map_err(|err| render_error(err.to_string()))?;
        let config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .render_form_data(true)
            .set_format(PdfBitmapFormat::BGRA);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| render_error(err.to_string()))?;

        let width = u32::try_from(bitmap.width().max(0)).unwrap_or(0);
        let height = u32::try_from(bitmap.height().max(0)).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(render_error(format!("empty bitmap {}x{}", width, height)));
        }

        debug!(width, height, "Page rendered");
        Ok(bgra_to_rgb(width, height, &bitmap.as_raw_bytes()))
    }

    #[instrument(skip(self))]
    fn page_content(&self, index: usize) -> Result<PageContent> {
        let text_runs = group_words(&self.glyphs(index)?);
        let images = self
            .structure
            .page_images(index)
            .map_err(|err| PagegraftError::Extract {
                page: index,
                reason: err.to_string(),
            })?;

        debug!(runs = text_runs.len(), images = images.len(), "Page content extracted");
        Ok(PageContent { text_runs, images })
    }

    fn export_page(&self, index: usize) -> Result<Vec<u8>> {
        self.structure.export_page(index)
    }
}

/// Convert a BGRA buffer (rows possibly padded) into RGB, compositing onto
/// white where the renderer left transparency.
fn bgra_to_rgb(width: u32, height: u32, bgra: &[u8]) -> RgbImage {
    let stride = bgra.len() / height.max(1) as usize;
    let mut rgb = RgbImage::new(width, height);

    for (y, row) in rgb.rows_mut().enumerate() {
        let base = y * stride;
        for (x, px) in row.enumerate() {
            let idx = base + x * 4;
            let Some(&[b, g, r, a]) = bgra.get(idx..idx + 4) else {
                px.0 = [255, 255, 255];
                continue;
            };
            let over_white = |c: u8| {
                let a = u16::from(a);
                ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8
            };
            px.0 = [over_white(r), over_white(g), over_white(b)];
        }
    }
    rgb
}

// -- Word grouping ------------------------------------------------------------

/// One character as reported by Pdfium, in page space.
#[derive(Debug, Clone, PartialEq)]
struct Glyph {
    ch: char,
    /// Horizontal extent of the glyph's ink.
    left: f32,
    right: f32,
    /// Pen position on the baseline, measured from the top-left corner.
    origin: Point,
    size: f32,
    color: Vec<f32>,
}

/// Baseline movement, relative to font size, that starts a new word.
const BASELINE_TOLERANCE: f32 = 0.5;
/// Horizontal gap, relative to font size, that starts a new word.
const WORD_GAP: f32 = 0.3;

/// Group characters into word-level runs. Whitespace, a baseline change, a
/// wide horizontal gap or a step backwards all end the current word.
fn group_words(glyphs: &[Glyph]) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut word: Vec<&Glyph> = Vec::new();

    for glyph in glyphs {
        if glyph.ch.is_whitespace() || glyph.ch.is_control() {
            flush_word(&mut word, &mut runs);
            continue;
        }
        if let Some(prev) = word.last() {
            let size = prev.size.max(glyph.size).max(1.0);
            let baseline_moved = (glyph.origin.y - prev.origin.y).abs() > BASELINE_TOLERANCE * size;
            let gap = glyph.left - prev.right;
            if baseline_moved || gap > WORD_GAP * size || glyph.left < prev.left - size {
                flush_word(&mut word, &mut runs);
            }
        }
        word.push(glyph);
    }
    flush_word(&mut word, &mut runs);
    runs
}

fn flush_word(word: &mut Vec<&Glyph>, runs: &mut Vec<TextRun>) {
    let Some(first) = word.first() else {
        return;
    };
    let text: String = word.iter().map(|glyph| glyph.ch).collect();
    let size = word.iter().map(|glyph| glyph.size).fold(0.0, f32::max);

    runs.push(TextRun::new(text, first.origin, size, first.color.clone()));
    word.clear();
}
