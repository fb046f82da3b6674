// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagegraft-document — Content transfer between PDF documents.
//
// Overlays the content of a source PDF onto the pages of a background
// (letterhead) PDF, either as a masked raster image of each page or by
// re-inserting the page's text runs and images with normalized font sizes.

pub mod image;
pub mod normalize;
pub mod observer;
pub mod pdf;
pub mod raster;
pub mod report;
pub mod session;
pub mod transfer;

#[cfg(test)]
mod testing;

// Re-export the primary structs so callers can use `pagegraft_document::ContentTransfer` etc.
pub use image::remove_background;
pub use normalize::FontSizeNormalizer;
pub use observer::{NullObserver, TracingObserver, TransferObserver};
pub use pdf::{PdfEngine, PdfReader, PdfWriter, PdfiumEngine};
pub use raster::PageRasterizer;
pub use report::{ElementKind, ElementOutcome, ElementRecord, PageReport, TransferReport};
pub use session::{DocumentSession, check_inputs};
pub use transfer::ContentTransfer;
