// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content transfer — lays the content of each source page over the matching
// background page and writes the result as a new document.

use chrono::Utc;
use image::DynamicImage;
use pagegraft_core::error::{PagegraftError, Result};
use pagegraft_core::{
    PageSize, Point, Rect, SizeStatistics, TransferConfig, TransferId, TransferMode, TransferPaths,
};
use tracing::{debug, info, info_span, instrument};

use crate::image::{codec, mask};
use crate::normalize::FontSizeNormalizer;
use crate::observer::TransferObserver;
use crate::pdf::{OutputDocument, PageHandle, PdfEngine};
use crate::raster::PageRasterizer;
use crate::report::{ElementKind, ElementOutcome, PageReport, TransferReport};
use crate::session::DocumentSession;

/// Runs transfers with a fixed configuration.
pub struct ContentTransfer<'o> {
    config: TransferConfig,
    observer: &'o dyn TransferObserver,
}

impl<'o> ContentTransfer<'o> {
    pub fn new(config: TransferConfig, observer: &'o dyn TransferObserver) -> Self {
        Self { config, observer }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Transfer every page of `paths.source` that has a counterpart in
    /// `paths.background`, and save the result to `paths.output`.
    ///
    /// Page-level failures abort the transfer; in STRUCTURED mode, failures
    /// of individual text runs and images are recorded in the report and the
    /// page carries on.
    pub fn run(&self, engine: &dyn PdfEngine, paths: &TransferPaths) -> Result<TransferReport> {
        self.config.validate()?;

        let id = TransferId::new();
        let span = info_span!("transfer", %id, mode = %self.config.mode);
        let _guard = span.enter();

        let started_at = Utc::now();
        self.observer.transfer_started(id, self.config.mode, paths);

        let mut session = DocumentSession::open(engine, paths)?;
        let outcome = self
            .transfer_pages(&mut session)
            .and_then(|pages| session.persist().map(|()| pages));
        session.close();
        let pages = outcome?;

        let report = TransferReport {
            id,
            mode: self.config.mode,
            paths: paths.clone(),
            pages,
            started_at,
            finished_at: Utc::now(),
        };
        self.observer.transfer_finished(&report);
        Ok(report)
    }

    fn transfer_pages(&self, session: &mut DocumentSession<'_>) -> Result<Vec<PageReport>> {
        let source_pages = session.source().page_count();
        let background_pages = session.background().page_count();
        let total = source_pages.min(background_pages);
        if source_pages != background_pages {
            info!(
                source_pages,
                background_pages,
                transferred = total,
                "Page counts differ, extra pages are ignored"
            );
        }

        let normalizer = FontSizeNormalizer::from_config(&self.config);
        let rasterizer = PageRasterizer::new(self.config.scale, self.config.logo_skip_height);

        let mut reports = Vec::with_capacity(total);
        for index in 0..total {
            self.observer.page_started(index, total);

            let size = session.background().page_size(index)?;
            let background = session.background().export_page(index)?;
            let output = session.output_mut();
            let page = output.new_page(size)?;
            output.show_page(page, &background)?;

            let mut report = PageReport::new(index, size);
            match self.config.mode {
                TransferMode::Raster => {
                    self.overlay_raster(session, &rasterizer, index, page, size, &mut report)?
                }
                TransferMode::Structured => {
                    self.replay_content(session, &normalizer, index, page, &mut report)?
                }
            }

            self.observer.page_finished(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    /// RASTER: render the source page, mask its background and lay it over
    /// the page below the letterhead band.
    #[instrument(skip_all, fields(page = index + 1))]
    fn overlay_raster(
        &self,
        session: &mut DocumentSession<'_>,
        rasterizer: &PageRasterizer,
        index: usize,
        page: PageHandle,
        size: PageSize,
        report: &mut PageReport,
    ) -> Result<()> {
        let rendered = rasterizer.rasterize(session.source(), index)?;
        let masked = mask::remove_background(rendered, self.config.background_threshold);
        let png = codec::encode_png(&DynamicImage::ImageRgba8(masked))?;

        let rect = raster_target(size, &self.config)?;
        debug!(?rect, png_bytes = png.len(), "Placing page image");
        session.output_mut().insert_image(page, rect, &png)?;

        report.record(ElementKind::Raster, ElementOutcome::Inserted);
        Ok(())
    }

    /// STRUCTURED: re-insert every text run, then every image, shifted down
    /// by the vertical offset.
    #[instrument(skip_all, fields(page = index + 1))]
    fn replay_content(
        &self,
        session: &mut DocumentSession<'_>,
        normalizer: &FontSizeNormalizer,
        index: usize,
        page: PageHandle,
        report: &mut PageReport,
    ) -> Result<()> {
        let content = session.source().page_content(index).map_err(|err| match err {
            PagegraftError::Extract { .. } => err,
            other => PagegraftError::Extract {
                page: index,
                reason: other.to_string(),
            },
        })?;
        let stats = SizeStatistics::from_runs(&content.text_runs);
        let offset = self.config.vertical_offset;
        let output = session.output_mut();

        debug!(
            runs = content.text_runs.len(),
            images = content.images.len(),
            ?stats,
            "Replaying page content"
        );

        for run in &content.text_runs {
            let size = normalizer.normalize(run.font_size, &stats);
            let origin = Point::new(run.origin.x, run.origin.y + offset);
            let outcome = match output.insert_text(page, origin, &run.text, size, run.rgb()) {
                Ok(()) => ElementOutcome::Inserted,
                Err(err) => ElementOutcome::Skipped {
                    reason: err.to_string(),
                },
            };
            self.record(report, ElementKind::Text, outcome);
        }

        for image in &content.images {
            let rect = image.bbox.translate_y(offset);
            let outcome = place_image(&mut *output, page, rect, &image.raw_bytes);
            self.record(report, ElementKind::Image, outcome);
        }
        Ok(())
    }

    fn record(&self, report: &mut PageReport, kind: ElementKind, outcome: ElementOutcome) {
        if let ElementOutcome::Skipped { reason } = &outcome {
            self.observer.element_skipped(report.index, kind, reason);
        }
        report.record(kind, outcome);
    }
}

/// Insert an image, falling back to an RGB PNG re-encode when the output
/// rejects the original bytes.
fn place_image(output: &mut dyn OutputDocument, page: PageHandle, rect: Rect, data: &[u8]) -> ElementOutcome {
    let first = match output.insert_image(page, rect, data) {
        Ok(()) => return ElementOutcome::Inserted,
        Err(err) => err,
    };
    debug!(%first, "Direct image insertion failed, converting to RGB PNG");

    match codec::convert_to_rgb_png(data).and_then(|png| output.insert_image(page, rect, &png)) {
        Ok(()) => ElementOutcome::Converted,
        Err(second) => ElementOutcome::Skipped {
            reason: format!("{}; after conversion: {}", first, second),
        },
    }
}

/// Where the masked page image goes: full page width, from below the
/// letterhead band to the bottom edge, shifted by the vertical offset.
pub fn raster_target(size: PageSize, config: &TransferConfig) -> Result<Rect> {
    let rect = Rect::new(
        0.0,
        config.vertical_offset + config.logo_skip_height,
        size.width,
        size.height + config.vertical_offset,
    );
    if rect.is_empty() {
        return Err(PagegraftError::PdfError(format!(
            "no room for the page image: target rectangle {:?} is empty",
            rect
        )));
    }
    Ok(rect)
}
