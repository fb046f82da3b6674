// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagegraft.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Pagegraft operations.
#[derive(Debug, Error)]
pub enum PagegraftError {
    // -- Preconditions (checked before any document is opened) --
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("file is empty: {}", path.display())]
    EmptyFile { path: PathBuf },

    // -- Document engine --
    #[error("failed to open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("failed to render page {}: {reason}", page + 1)]
    Render { page: usize, reason: String },

    #[error("failed to extract content from page {}: {reason}", page + 1)]
    Extract { page: usize, reason: String },

    #[error("failed to write {}: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagegraftError>;
