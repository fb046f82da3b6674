// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — page geometry, single-page export and embedded image
// extraction for existing PDF documents, using the `lopdf` crate.

use std::path::Path;

use lopdf::{Document, Object, dictionary};
use pagegraft_core::error::{PagegraftError, Result};
use pagegraft_core::{ImageRun, PageSize};
use tracing::{debug, info, instrument};

use super::images;
use super::objects::{self, INHERITABLE, ObjectCloner};

/// Structural view of an existing PDF file.
///
/// Wraps `lopdf::Document`. Everything that needs the object graph rather
/// than a rendered page (sizes, exporting a page, pulling out image streams)
/// goes through here.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| PagegraftError::Open {
            path: path_ref.to_path_buf(),
            reason: err.to_string(),
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PagegraftError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Size of page `index` (0-based), taken from its (possibly inherited)
    /// media box.
    pub fn page_size(&self, index: usize) -> Result<PageSize> {
        let [x0, y0, x1, y1] = self.media_box(index)?;
        Ok(PageSize::new(x1 - x0, y1 - y0))
    }

    /// Normalised media box `[llx, lly, urx, ury]` of page `index` (0-based).
    pub fn media_box(&self, index: usize) -> Result<[f32; 4]> {
        let page_id = objects::page_id(&self.document, index)?;
        Ok(objects::media_box(&self.document, page_id))
    }

    /// Embedded images of page `index` (0-based) with their page-space
    /// bounding boxes.
    pub fn page_images(&self, index: usize) -> Result<Vec<ImageRun>> {
        let page_id = objects::page_id(&self.document, index)?;
        images::page_images(&self.document, page_id)
    }

    // -- Extraction -----------------------------------------------------------

    /// Extract page `index` (0-based) into a new standalone PDF document.
    ///
    /// Attributes the page inherits from the page tree (resources, media box,
    /// crop box, rotation) are copied onto the extracted page so that it
    /// renders identically on its own.
    #[instrument(skip(self))]
    pub fn export_page(&self, index: usize) -> Result<Vec<u8>> {
        let page_id = objects::page_id(&self.document, index)?;
        let page_dict = self.document.get_dictionary(page_id).map_err(|err| {
            PagegraftError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        let mut new_doc = Document::with_version("1.5");
        let pages_id = new_doc.new_object_id();
        let mut cloner = ObjectCloner::new();

        let mut page = cloner.clone_dictionary(&self.document, &mut new_doc, page_dict);
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Some(value) = objects::inherited_attribute(&self.document, page_id, key) {
                let value = cloner.clone_object(&self.document, &mut new_doc, value);
                page.set(key.to_vec(), value);
            }
        }
        page.set("Parent", Object::Reference(pages_id));
        let new_page_id = new_doc.add_object(page);

        new_doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![new_page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = new_doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        new_doc.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        new_doc.save_to(&mut output).map_err(|err| {
            PagegraftError::PdfError(format!("failed to serialise extracted page: {}", err))
        })?;

        debug!(index, output_bytes = output.len(), "Page exported");
        Ok(output)
    }

    /// The underlying document, for callers that need raw object access.
    pub fn document(&self) -> &Document {
        &self.document
    }
}
