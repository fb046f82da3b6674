// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transfer progress reporting. The orchestrator never configures logging
// itself; it reports to whatever observer the caller hands in.

use tracing::{info, warn};

use crate::report::{ElementKind, PageReport, TransferReport};
use pagegraft_core::{TransferId, TransferMode, TransferPaths};

/// Receives progress events from a running transfer. Every method has an
/// empty default so observers only implement what they care about.
pub trait TransferObserver {
    fn transfer_started(&self, _id: TransferId, _mode: TransferMode, _paths: &TransferPaths) {}

    /// Page `index` of `total` is about to be processed.
    fn page_started(&self, _index: usize, _total: usize) {}

    /// An element of a STRUCTURED page could not be transferred.
    fn element_skipped(&self, _page: usize, _kind: ElementKind, _reason: &str) {}

    fn page_finished(&self, _report: &PageReport) {}

    fn transfer_finished(&self, _report: &TransferReport) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn transfer_started(&self, id: TransferId, mode: TransferMode, paths: &TransferPaths) {
        info!(
            %id,
            %mode,
            source = %paths.source.display(),
            background = %paths.background.display(),
            output = %paths.output.display(),
            "Transfer started"
        );
    }

    fn page_started(&self, index: usize, total: usize) {
        info!(page = index + 1, total, "Processing page");
    }

    fn element_skipped(&self, page: usize, kind: ElementKind, reason: &str) {
        warn!(page = page + 1, ?kind, reason, "Element skipped");
    }

    fn page_finished(&self, report: &PageReport) {
        info!(
            page = report.index + 1,
            inserted = report.inserted(),
            converted = report.converted(),
            skipped = report.skipped(),
            "Page done"
        );
    }

    fn transfer_finished(&self, report: &TransferReport) {
        info!(
            id = %report.id,
            pages = report.pages.len(),
            skipped = report.total_skipped(),
            elapsed_ms = report.elapsed().num_milliseconds(),
            "Transfer finished"
        );
    }
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TransferObserver for NullObserver {}
