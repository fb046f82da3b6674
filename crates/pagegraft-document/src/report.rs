// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outcome records for a transfer: per element, per page, and for the whole
// run.

use chrono::{DateTime, Utc};
use pagegraft_core::{PageSize, TransferId, TransferMode, TransferPaths};
use serde::Serialize;

/// What kind of element an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    /// The flattened page image of a RASTER transfer.
    Raster,
}

/// How a single element fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ElementOutcome {
    /// Written on the first attempt.
    Inserted,
    /// Written after conversion to an RGB PNG.
    Converted,
    /// Not written; the page carries on without it.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub kind: ElementKind,
    #[serde(flatten)]
    pub outcome: ElementOutcome,
}

/// Result of one output page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    /// 0-based page index.
    pub index: usize,
    pub size: PageSize,
    pub elements: Vec<ElementRecord>,
}

impl PageReport {
    pub fn new(index: usize, size: PageSize) -> Self {
        Self {
            index,
            size,
            elements: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: ElementKind, outcome: ElementOutcome) {
        self.elements.push(ElementRecord { kind, outcome });
    }

    fn count(&self, pred: impl Fn(&ElementOutcome) -> bool) -> usize {
        self.elements.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, ElementOutcome::Inserted))
    }

    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, ElementOutcome::Converted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ElementOutcome::Skipped { .. }))
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReport {
    pub id: TransferId,
    pub mode: TransferMode,
    pub paths: TransferPaths,
    pub pages: Vec<PageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TransferReport {
    pub fn total_inserted(&self) -> usize {
        self.pages.iter().map(PageReport::inserted).sum()
    }

    pub fn total_converted(&self) -> usize {
        self.pages.iter().map(PageReport::converted).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.pages.iter().map(PageReport::skipped).sum()
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
