// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document session — owns the three documents of one transfer and makes
// sure each is released exactly once, whichever way the transfer ends.

use std::ops::{Deref, DerefMut};
use std::path::Path;

use pagegraft_core::TransferPaths;
use pagegraft_core::error::{PagegraftError, Result};
use tracing::{debug, info, warn};

use crate::pdf::{OutputDocument, PdfEngine, Release, SourceDocument};

/// An engine handle that is released when dropped. Release failures are
/// logged and otherwise ignored.
struct Handle<D: ?Sized + Release> {
    inner: Option<Box<D>>,
    label: &'static str,
}

impl<D: ?Sized + Release> Handle<D> {
    fn new(inner: Box<D>, label: &'static str) -> Self {
        Self {
            inner: Some(inner),
            label,
        }
    }

    fn release(&mut self) {
        if let Some(inner) = self.inner.take() {
            match inner.release() {
                Ok(()) => debug!(handle = self.label, "Released"),
                Err(err) => warn!(handle = self.label, %err, "Release failed, ignoring"),
            }
        }
    }
}

impl<D: ?Sized + Release> Deref for Handle<D> {
    type Target = D;

    fn deref(&self) -> &D {
        match &self.inner {
            Some(inner) => inner.as_ref(),
            None => unreachable!("{} handle used after release", self.label),
        }
    }
}

impl<D: ?Sized + Release> DerefMut for Handle<D> {
    fn deref_mut(&mut self) -> &mut D {
        match &mut self.inner {
            Some(inner) => inner.as_mut(),
            None => unreachable!("{} handle used after release", self.label),
        }
    }
}

impl<D: ?Sized + Release> Drop for Handle<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// The source, background and output documents of one transfer.
///
/// Fields are declared output-first so that an unclosed session drops (and
/// releases) output, background, then source, the same order as
/// [`DocumentSession::close`].
pub struct DocumentSession<'e> {
    output: Handle<dyn OutputDocument + 'e>,
    background: Handle<dyn SourceDocument + 'e>,
    source: Handle<dyn SourceDocument + 'e>,
    paths: TransferPaths,
    persisted: bool,
}

impl<'e> DocumentSession<'e> {
    /// Check the input files, then open source and background and create the
    /// output. If any step fails, whatever was already opened is released
    /// before the error is returned.
    pub fn open(engine: &'e dyn PdfEngine, paths: &TransferPaths) -> Result<Self> {
        check_inputs(paths)?;

        let source = Handle::new(engine.open(&paths.source)?, "source");
        let background = Handle::new(engine.open(&paths.background)?, "background");
        let mut output = Handle::new(engine.create_output()?, "output");
        if let Some(stem) = paths.source.file_stem() {
            output.set_title(&stem.to_string_lossy());
        }

        info!(
            source_pages = source.page_count(),
            background_pages = background.page_count(),
            "Session opened"
        );

        Ok(Self {
            output,
            background,
            source,
            paths: paths.clone(),
            persisted: false,
        })
    }

    pub fn source(&self) -> &(dyn SourceDocument + 'e) {
        &*self.source
    }

    pub fn background(&self) -> &(dyn SourceDocument + 'e) {
        &*self.background
    }

    pub fn output_mut(&mut self) -> &mut (dyn OutputDocument + 'e) {
        &mut *self.output
    }

    pub fn paths(&self) -> &TransferPaths {
        &self.paths
    }

    /// Write the output document to `paths.output`. Only the first call
    /// writes; later calls fail.
    pub fn persist(&mut self) -> Result<()> {
        if self.persisted {
            return Err(PagegraftError::Persist {
                path: self.paths.output.clone(),
                reason: "output has already been persisted".into(),
            });
        }
        self.persisted = true;
        let output_path = self.paths.output.clone();
        self.output.save(&output_path)
    }

    /// Release output, background and source, in that order.
    pub fn close(mut self) {
        self.output.release();
        self.background.release();
        self.source.release();
        debug!("Session closed");
    }
}

/// Source and background must both exist, be regular files and hold at
/// least one byte.
pub fn check_inputs(paths: &TransferPaths) -> Result<()> {
    check_input(&paths.source)?;
    check_input(&paths.background)
}

fn check_input(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|_| PagegraftError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    if !metadata.is_file() {
        return Err(PagegraftError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if metadata.len() == 0 {
        return Err(PagegraftError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
