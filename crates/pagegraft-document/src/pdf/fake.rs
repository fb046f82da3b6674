// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF engine for tests. Documents are registered by path, failures
// can be injected per operation, and every handle is counted so tests can
// check that nothing leaks.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{ImageFormat, Rgb as Pixel, RgbImage};
use pagegraft_core::error::{PagegraftError, Result};
use pagegraft_core::{PageContent, PageSize, Point, Rect, Rgb};

use super::engine::{OutputDocument, PageHandle, PdfEngine, Release, SourceDocument};
use super::reader::PdfReader;
use super::writer::PdfWriter;

/// White page with a black 4x4 square in the bottom-left corner.
pub fn blank_render(size: PageSize, scale: f32) -> RgbImage {
    let width = (size.width * scale).round() as u32;
    let height = (size.height * scale).round() as u32;
    RgbImage::from_fn(width, height, |x, y| {
        if x < 4 && y + 4 >= height {
            Pixel([0, 0, 0])
        } else {
            Pixel([255, 255, 255])
        }
    })
}

/// Text containing this marker is refused by fake output documents.
pub const FAILING_TEXT: &str = "FAIL";

#[derive(Debug, Clone, Default)]
struct FakeDoc {
    pages: Vec<PageSize>,
    content: HashMap<usize, PageContent>,
}

/// A page written to a fake output document.
#[derive(Debug, Clone, PartialEq)]
pub struct FakePage {
    pub size: PageSize,
    /// Exported page bytes painted onto this page.
    pub shown: Vec<Vec<u8>>,
    pub texts: Vec<(Point, String, f32, Rgb)>,
    pub images: Vec<(Rect, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct FakeState {
    docs: HashMap<PathBuf, FakeDoc>,
    failing_opens: HashSet<PathBuf>,
    failing_renders: HashSet<(PathBuf, usize)>,
    failing_extracts: HashSet<(PathBuf, usize)>,
    fail_create_output: bool,
    fail_save: bool,
    fail_release: bool,
    open_handles: usize,
    opened: Vec<PathBuf>,
    saved: Option<(PathBuf, Vec<FakePage>)>,
}

/// Engine whose documents live in memory.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    state: Rc<RefCell<FakeState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document with the given page sizes.
    pub fn add_document(&self, path: impl AsRef<Path>, pages: &[(f32, f32)]) {
        let doc = FakeDoc {
            pages: pages.iter().map(|(w, h)| PageSize::new(*w, *h)).collect(),
            content: HashMap::new(),
        };
        self.state
            .borrow_mut()
            .docs
            .insert(path.as_ref().to_path_buf(), doc);
    }

    /// Content returned for page `index` of `path`.
    pub fn set_content(&self, path: impl AsRef<Path>, index: usize, content: PageContent) {
        if let Some(doc) = self.state.borrow_mut().docs.get_mut(path.as_ref()) {
            doc.content.insert(index, content);
        }
    }

    pub fn fail_open(&self, path: impl AsRef<Path>) {
        self.state
            .borrow_mut()
            .failing_opens
            .insert(path.as_ref().to_path_buf());
    }

    pub fn fail_render_on(&self, path: impl AsRef<Path>, index: usize) {
        self.state
            .borrow_mut()
            .failing_renders
            .insert((path.as_ref().to_path_buf(), index));
    }

    pub fn fail_extract_on(&self, path: impl AsRef<Path>, index: usize) {
        self.state
            .borrow_mut()
            .failing_extracts
            .insert((path.as_ref().to_path_buf(), index));
    }

    pub fn fail_create_output(&self) {
        self.state.borrow_mut().fail_create_output = true;
    }

    pub fn fail_save(&self) {
        self.state.borrow_mut().fail_save = true;
    }

    /// Make every release report an error (the handle is still let go).
    pub fn fail_release(&self) {
        self.state.borrow_mut().fail_release = true;
    }

    /// Handles opened or created and not yet released.
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open_handles
    }

    /// Paths opened so far, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.state.borrow().opened.clone()
    }

    /// Pages of the saved output document, if one was saved.
    pub fn saved_pages(&self) -> Option<Vec<FakePage>> {
        self.state.borrow().saved.as_ref().map(|(_, pages)| pages.clone())
    }

    pub fn saved_path(&self) -> Option<PathBuf> {
        self.state.borrow().saved.as_ref().map(|(path, _)| path.clone())
    }

    fn release_handle(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.open_handles = state.open_handles.saturating_sub(1);
        if state.fail_release {
            return Err(PagegraftError::PdfError("release failed".into()));
        }
        Ok(())
    }
}

impl PdfEngine for FakeEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn SourceDocument + '_>> {
        let mut state = self.state.borrow_mut();
        state.opened.push(path.to_path_buf());

        if state.failing_opens.contains(path) {
            return Err(PagegraftError::Open {
                path: path.to_path_buf(),
                reason: "injected open failure".into(),
            });
        }
        let doc = state.docs.get(path).cloned().ok_or_else(|| PagegraftError::Open {
            path: path.to_path_buf(),
            reason: "no such fake document".into(),
        })?;

        state.open_handles += 1;
        Ok(Box::new(FakeSource {
            engine: self.clone(),
            path: path.to_path_buf(),
            doc,
        }))
    }

    fn create_output(&self) -> Result<Box<dyn OutputDocument + '_>> {
        let mut state = self.state.borrow_mut();
        if state.fail_create_output {
            return Err(PagegraftError::PdfError("injected create failure".into()));
        }
        state.open_handles += 1;
        Ok(Box::new(FakeOutput {
            engine: self.clone(),
            pages: Vec::new(),
            saved: false,
        }))
    }
}

struct FakeSource {
    engine: FakeEngine,
    path: PathBuf,
    doc: FakeDoc,
}

impl FakeSource {
    fn size(&self, index: usize) -> Result<PageSize> {
        self.doc
            .pages
            .get(index)
            .copied()
            .ok_or_else(|| PagegraftError::PdfError(format!("page {} out of range", index + 1)))
    }
}

impl Release for FakeSource {
    fn release(self: Box<Self>) -> Result<()> {
        self.engine.release_handle()
    }
}

impl SourceDocument for FakeSource {
    fn page_count(&self) -> usize {
        self.doc.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        self.size(index)
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbImage> {
        let key = (self.path.clone(), index);
        if self.engine.state.borrow().failing_renders.contains(&key) {
            return Err(PagegraftError::Render {
                page: index,
                reason: "injected render failure".into(),
            });
        }
        Ok(blank_render(self.size(index)?, scale))
    }

    fn page_content(&self, index: usize) -> Result<PageContent> {
        let key = (self.path.clone(), index);
        if self.engine.state.borrow().failing_extracts.contains(&key) {
            return Err(PagegraftError::Extract {
                page: index,
                reason: "injected extract failure".into(),
            });
        }
        self.size(index)?;
        Ok(self.doc.content.get(&index).cloned().unwrap_or_default())
    }

    fn export_page(&self, index: usize) -> Result<Vec<u8>> {
        self.size(index)?;
        Ok(format!("{}#{}", self.path.display(), index).into_bytes())
    }
}

struct FakeOutput {
    engine: FakeEngine,
    pages: Vec<FakePage>,
    saved: bool,
}

impl FakeOutput {
    fn page(&mut self, page: PageHandle) -> Result<&mut FakePage> {
        self.pages
            .get_mut(page.0)
            .ok_or_else(|| PagegraftError::PdfError(format!("no output page {}", page.0)))
    }
}

impl Release for FakeOutput {
    fn release(self: Box<Self>) -> Result<()> {
        self.engine.release_handle()
    }
}

impl OutputDocument for FakeOutput {
    fn new_page(&mut self, size: PageSize) -> Result<PageHandle> {
        self.pages.push(FakePage {
            size,
            shown: Vec::new(),
            texts: Vec::new(),
            images: Vec::new(),
        });
        Ok(PageHandle(self.pages.len() - 1))
    }

    fn show_page(&mut self, page: PageHandle, single_page_pdf: &[u8]) -> Result<()> {
        self.page(page)?.shown.push(single_page_pdf.to_vec());
        Ok(())
    }

    fn insert_text(
        &mut self,
        page: PageHandle,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<()> {
        if text.contains(FAILING_TEXT) {
            return Err(PagegraftError::PdfError(format!("cannot draw {:?}", text)));
        }
        self.page(page)?
            .texts
            .push((origin, text.to_string(), font_size, color));
        Ok(())
    }

    /// Only PNG is accepted, like a picky real backend.
    fn insert_image(&mut self, page: PageHandle, rect: Rect, data: &[u8]) -> Result<()> {
        if image::guess_format(data).ok() != Some(ImageFormat::Png) {
            return Err(PagegraftError::ImageError("only PNG accepted".into()));
        }
        self.page(page)?.images.push((rect, data.to_vec()));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let persist_error = |reason: &str| PagegraftError::Persist {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.saved {
            return Err(persist_error("already saved"));
        }
        if self.engine.state.borrow().fail_save {
            return Err(persist_error("injected save failure"));
        }
        self.saved = true;
        self.engine.state.borrow_mut().saved = Some((path.to_path_buf(), self.pages.clone()));
        Ok(())
    }
}

/// Engine over real files without Pdfium: lopdf reads structure and images,
/// pages render as [`blank_render`], and output goes through [`PdfWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderEngine;

impl PdfEngine for ReaderEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn SourceDocument + '_>> {
        Ok(Box::new(ReaderSource(PdfReader::open(path)?)))
    }

    fn create_output(&self) -> Result<Box<dyn OutputDocument + '_>> {
        Ok(Box::new(PdfWriter::new()))
    }
}

struct ReaderSource(PdfReader);

impl Release for ReaderSource {
    fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl SourceDocument for ReaderSource {
    fn page_count(&self) -> usize {
        self.0.page_count()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        self.0.page_size(index)
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbImage> {
        Ok(blank_render(self.0.page_size(index)?, scale))
    }

    fn page_content(&self, index: usize) -> Result<PageContent> {
        Ok(PageContent {
            text_runs: Vec::new(),
            images: self.0.page_images(index)?,
        })
    }

    fn export_page(&self, index: usize) -> Result<Vec<u8>> {
        self.0.export_page(index)
    }
}
