// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — the engine capability, its Pdfium/lopdf implementation, and
// the lopdf reader and writer underneath it.

pub mod engine;
mod images;
pub(crate) mod objects;
pub mod pdfium;
pub mod reader;
pub mod writer;

#[cfg(test)]
pub(crate) mod fake;

pub use engine::{OutputDocument, PageHandle, PdfEngine, Release, SourceDocument};
pub use pdfium::PdfiumEngine;
pub use reader::PdfReader;
pub use writer::PdfWriter;
