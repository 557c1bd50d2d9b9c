// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table geometry profile. One immutable value per pipeline; the defaults
// describe the 32-column, 17-row form the pipeline was tuned for.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableCropError};
use crate::types::Dimensions;

/// Geometry of the form being processed and the crop heuristics tuned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Columns in the printed table, including the label column.
    pub total_cols: u32,
    /// Rows in the printed table.
    pub total_rows: u32,
    /// The upper row-band holds rows `1..=split_after_row`.
    pub split_after_row: u32,
    /// Width the table body is warped to, before the right margin is added.
    pub target_width: u32,
    /// Height of the perspective-corrected image.
    pub target_height: u32,
    /// Right margin as a fraction of `target_width`.
    pub margin_ratio: f64,
    /// Lower bound for the right margin in pixels.
    pub min_margin_px: u32,
    /// Capture bias: the rightmost column is under-captured by roughly this
    /// many source pixels.
    pub right_corner_shift_px: f64,
    /// Extra fraction of a cell removed with the label column.
    pub label_margin_ratio: f64,
    /// Fraction of the label-free width trimmed from the left.
    pub left_trim_ratio: f64,
    /// Corner detector tuning.
    pub detector: DetectorSettings,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            total_cols: 32,
            total_rows: 17,
            split_after_row: 8,
            target_width: 1240,
            target_height: 850,
            margin_ratio: 0.10,
            min_margin_px: 50,
            right_corner_shift_px: 30.0,
            label_margin_ratio: 0.10,
            left_trim_ratio: 0.26,
            detector: DetectorSettings::default(),
        }
    }
}

/// Parameters of the edge/contour based corner detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Gaussian sigma; 1.1 matches a 5x5 kernel with automatic sigma.
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub polygon_epsilon_ratio: f64,
    /// Minimum contour area as a fraction of the image area.
    pub min_area_ratio: f64,
    /// Fallback rectangle inset as a fraction of the smaller image side.
    pub fallback_inset_ratio: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            polygon_epsilon_ratio: 0.02,
            min_area_ratio: 0.10,
            fallback_inset_ratio: 0.05,
        }
    }
}

impl TableLayout {
    /// Load a layout from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let layout: Self = serde_json::from_str(&data)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Right margin added after the last column:
    /// `max(min_margin_px, round(target_width * margin_ratio))`.
    pub fn margin_pixels(&self) -> u32 {
        let proportional = (self.target_width as f64 * self.margin_ratio).round() as u32;
        proportional.max(self.min_margin_px)
    }

    /// Exact size of every perspective-corrected image.
    pub fn corrected_dimensions(&self) -> Dimensions {
        Dimensions::new(self.target_width + self.margin_pixels(), self.target_height)
    }

    /// Reject profiles that cannot produce three non-empty outputs.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TableCropError::InvalidLayout(msg));

        if self.total_cols == 0 || self.total_rows == 0 {
            return invalid(format!(
                "grid must have at least one column and row, got {}x{}",
                self.total_cols, self.total_rows
            ));
        }
        if self.split_after_row == 0 || self.split_after_row >= self.total_rows {
            return invalid(format!(
                "split_after_row must be within 1..{}, got {}",
                self.total_rows, self.split_after_row
            ));
        }
        if self.target_width < self.total_cols || self.target_height < self.total_rows {
            return invalid(format!(
                "target size {}x{} is smaller than the {}x{} grid",
                self.target_width, self.target_height, self.total_cols, self.total_rows
            ));
        }
        for (name, value) in [
            ("margin_ratio", self.margin_ratio),
            ("label_margin_ratio", self.label_margin_ratio),
            ("left_trim_ratio", self.left_trim_ratio),
            ("detector.min_area_ratio", self.detector.min_area_ratio),
        ] {
            if !(0.0..1.0).contains(&value) {
                return invalid(format!("{name} must be in [0, 1), got {value}"));
            }
        }
        if !(0.0..0.5).contains(&self.detector.fallback_inset_ratio) {
            return invalid(format!(
                "detector.fallback_inset_ratio must be in [0, 0.5), got {}",
                self.detector.fallback_inset_ratio
            ));
        }
        if !self.right_corner_shift_px.is_finite() {
            return invalid("right_corner_shift_px must be finite".into());
        }
        let det = &self.detector;
        if det.blur_sigma <= 0.0 || det.polygon_epsilon_ratio <= 0.0 {
            return invalid("blur_sigma and polygon_epsilon_ratio must be positive".into());
        }
        if det.canny_low > det.canny_high {
            return invalid(format!(
                "canny_low ({}) exceeds canny_high ({})",
                det.canny_low, det.canny_high
            ));
        }
        Ok(())
    }
}
