// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF engine capability.
//
// The transfer pipeline only talks to documents through these traits, so the
// rendering backend can be swapped (Pdfium + lopdf in production, an in-memory
// fake in tests) without touching the orchestration logic.

use std::path::Path;

use image::RgbImage;
use pagegraft_core::error::Result;
use pagegraft_core::{PageContent, PageSize, Point, Rect, Rgb};

/// Opens existing documents and creates new ones.
pub trait PdfEngine {
    /// Open an existing PDF for reading.
    fn open(&self, path: &Path) -> Result<Box<dyn SourceDocument + '_>>;

    /// Create an empty document to build output pages into.
    fn create_output(&self) -> Result<Box<dyn OutputDocument + '_>>;
}

/// Explicit release of an engine handle.
///
/// Handles are released exactly once; the caller decides what to do with a
/// failing release (the session logs and swallows it).
pub trait Release {
    fn release(self: Box<Self>) -> Result<()>;
}

/// Read access to an opened PDF.
pub trait SourceDocument: Release {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Dimensions of page `index` (0-based).
    fn page_size(&self, index: usize) -> Result<PageSize>;

    /// Render page `index` at `scale` times its size in points, on an opaque
    /// white background.
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbImage>;

    /// Word-level text runs and embedded images of page `index`.
    fn page_content(&self, index: usize) -> Result<PageContent>;

    /// Page `index` as a standalone single-page PDF, ready to be painted
    /// onto another page.
    fn export_page(&self, index: usize) -> Result<Vec<u8>>;
}

/// Index of a page inside an [`OutputDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(pub usize);

/// Write access to a document under construction.
pub trait OutputDocument: Release {
    /// Append a blank page.
    fn new_page(&mut self, size: PageSize) -> Result<PageHandle>;

    /// Paint the first page of `single_page_pdf` onto `page` at identity
    /// placement.
    fn show_page(&mut self, page: PageHandle, single_page_pdf: &[u8]) -> Result<()>;

    /// Draw `text` with its baseline starting at `origin`.
    fn insert_text(
        &mut self,
        page: PageHandle,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<()>;

    /// Place an encoded image inside `rect`, keeping its aspect ratio.
    fn insert_image(&mut self, page: PageHandle, rect: Rect, data: &[u8]) -> Result<()>;

    /// Number of pages created so far.
    fn page_count(&self) -> usize;

    /// Document title written into the metadata, if the backend keeps any.
    fn set_title(&mut self, _title: &str) {}

    /// Serialise the document to `path`.
    fn save(&mut self, path: &Path) -> Result<()>;
}
