// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — background masking and the decode/convert/encode codec.

pub mod codec;
pub mod mask;

pub use mask::remove_background;
