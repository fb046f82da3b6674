// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people running the tool.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how a front-end presents it.

use crate::error::PagegraftError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something on the machine got in the way (disk, permissions); trying
    /// again may work.
    Transient,
    /// The user must do something (pick another file, fix a setting).
    ActionRequired,
    /// The input cannot be processed as it is.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether simply running again could succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `PagegraftError` into a `HumanError` anyone can act on.
pub fn humanize_error(err: &PagegraftError) -> HumanError {
    match err {
        PagegraftError::FileNotFound { path } => HumanError {
            message: "We couldn't find one of your files.".into(),
            suggestion: format!(
                "Check that {} exists and hasn't been moved, then try again.",
                path.display()
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagegraftError::EmptyFile { path } => HumanError {
            message: "One of your files is empty.".into(),
            suggestion: format!(
                "{} has no content. Save the document again or pick a different file.",
                path.display()
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagegraftError::Open { path, .. } => HumanError {
            message: "This file couldn't be opened as a PDF.".into(),
            suggestion: format!(
                "{} may be damaged or not a PDF. Try opening it in a PDF reader first, or export it to PDF again.",
                path.display()
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        PagegraftError::Render { page, .. } => HumanError {
            message: format!("Page {} of your document couldn't be drawn.", page + 1),
            suggestion: "The page may use features we can't display. Try the structured mode, or print the document to a new PDF first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        PagegraftError::Extract { page, .. } => HumanError {
            message: format!("We couldn't read the contents of page {}.", page + 1),
            suggestion: "Try the raster mode instead, which copies the page as a picture.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        PagegraftError::Persist { path, .. } => HumanError {
            message: "The finished document couldn't be saved.".into(),
            suggestion: format!(
                "Check that you can write to {} and that the file isn't open in another program.",
                path.display()
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        PagegraftError::PdfError(_) => HumanError {
            message: "There's a problem with one of the PDF files.".into(),
            suggestion: "The file may be damaged. Try opening it in a PDF reader to check it works, or try a different file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        PagegraftError::ImageError(_) => HumanError {
            message: "A picture in your document couldn't be processed.".into(),
            suggestion: "Try again with a lower scale setting, or use the structured mode.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        PagegraftError::EngineUnavailable(_) => HumanError {
            message: "The PDF engine isn't installed.".into(),
            suggestion: "Place the Pdfium library next to the program, or set PAGEGRAFT_PDFIUM_DIR to the folder that contains it.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagegraftError::Config(detail) => HumanError {
            message: "One of the settings isn't valid.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagegraftError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "We don't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or copy the file to a different folder first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        PagegraftError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check that the settings file is valid JSON and that every value is in range.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
