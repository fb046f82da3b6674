// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures shared across the crate's unit tests.

use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem};

/// An A5 document with one page per entry of `lines`, each page carrying
/// that line in 12pt Helvetica near the top.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let page_w = Mm(148.0);
    let page_h = Mm(210.0);
    let mut doc = PdfDocument::new("fixture");

    let pages = lines
        .iter()
        .map(|line| {
            let ops = vec![
                Op::StartTextSection,
                Op::SetTextCursor {
                    pos: Point {
                        x: Pt(56.0),
                        y: Pt(500.0),
                    },
                },
                Op::SetFontSizeBuiltinFont {
                    size: Pt(12.0),
                    font: BuiltinFont::Helvetica,
                },
                Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(line.to_string())],
                    font: BuiltinFont::Helvetica,
                },
                Op::EndTextSection,
            ];
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();
    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}

/// Write `bytes` to `name` inside `dir` and return the path.
pub fn write_fixture(dir: &std::path::Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}
