// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transfer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PagegraftError, Result};

/// How the source page is carried over onto the background page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Flatten the source page to an image with a transparent background.
    #[default]
    Raster,
    /// Replay individual text runs and embedded images.
    Structured,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raster => write!(f, "raster"),
            Self::Structured => write!(f, "structured"),
        }
    }
}

/// Parameters for one transfer. Immutable while the transfer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Transfer mode.
    pub mode: TransferMode,
    /// Vertical shift applied to transferred content, in points. Positive
    /// values move content down the page.
    pub vertical_offset: f32,
    /// Rasterization scale factor (raster mode only).
    pub scale: f32,
    /// Height of the letterhead band cut from the top of the source page, in
    /// unscaled points (raster mode only).
    pub logo_skip_height: f32,
    /// Lower edge of the target font size band.
    pub min_font_size: f32,
    /// Upper edge of the target font size band.
    pub max_font_size: f32,
    /// Overall multiplier applied to every normalized font size.
    pub size_scale_factor: f32,
    /// Pixels whose mean channel value is above this become transparent.
    pub background_threshold: u8,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::Raster,
            vertical_offset: 20.0,
            scale: 2.0,
            logo_skip_height: 100.0,
            min_font_size: 8.0,
            max_font_size: 16.0,
            size_scale_factor: 1.0,
            background_threshold: 250,
        }
    }
}

impl TransferConfig {
    /// Load a (possibly partial) configuration from a JSON file. Fields that
    /// are absent keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("vertical_offset", self.vertical_offset),
            ("scale", self.scale),
            ("logo_skip_height", self.logo_skip_height),
            ("min_font_size", self.min_font_size),
            ("max_font_size", self.max_font_size),
            ("size_scale_factor", self.size_scale_factor),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PagegraftError::Config(format!(
                "{name} must be a finite number, got {value}"
            )));
        }
        if self.scale <= 0.0 {
            return Err(PagegraftError::Config(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.logo_skip_height < 0.0 {
            return Err(PagegraftError::Config(format!(
                "logo_skip_height must not be negative, got {}",
                self.logo_skip_height
            )));
        }
        if self.max_font_size < self.min_font_size {
            return Err(PagegraftError::Config(format!(
                "max_font_size ({}) is smaller than min_font_size ({})",
                self.max_font_size, self.min_font_size
            )));
        }
        if self.size_scale_factor <= 0.0 {
            return Err(PagegraftError::Config(format!(
                "size_scale_factor must be positive, got {}",
                self.size_scale_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TransferConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, TransferMode::Raster);
        assert_eq!(config.background_threshold, 250);
    }

    #[test]
    fn inverted_font_band_is_rejected() {
        let config = TransferConfig {
            min_font_size: 16.0,
            max_font_size: 8.0,
            ..TransferConfig::default()
        };
        assert!(matches!(config.validate(), Err(PagegraftError::Config(_))));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let config = TransferConfig {
            scale: 0.0,
            ..TransferConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_offset_is_rejected() {
        let config = TransferConfig {
            vertical_offset: f32::NAN,
            ..TransferConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vertical_offset"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "mode": "structured", "vertical_offset": 35.5 }"#).unwrap();

        let config = TransferConfig::from_json_file(&path).unwrap();
        assert_eq!(config.mode, TransferMode::Structured);
        assert_eq!(config.vertical_offset, 35.5);
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.max_font_size, 16.0);
    }

    #[test]
    fn out_of_range_threshold_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "background_threshold": 300 }"#).unwrap();

        assert!(matches!(
            TransferConfig::from_json_file(&path),
            Err(PagegraftError::Serialization(_))
        ));
    }
}
