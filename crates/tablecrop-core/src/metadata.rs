// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic record of one pipeline run, accumulated stage by stage.

use serde::{Deserialize, Serialize};

use crate::types::{CellGrid, CornerDetection, CornerSource, Dimensions};

/// Dimensions, corners and cell size observed during one run.
///
/// Serializes to the JSON object consumers expect:
/// `original_dimensions`, `corrected_dimensions`, `detected_corners`,
/// `cell_dimensions`, plus `corner_source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub original_dimensions: Dimensions,
    pub corrected_dimensions: Dimensions,
    /// Corners before the right-hand capture adjustment, truncated to integers.
    pub detected_corners: Vec<[i64; 2]>,
    pub cell_dimensions: Dimensions,
    pub corner_source: CornerSource,
}

/// Collects metadata entries as the pipeline stages run.
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder {
    original: Dimensions,
    corners: Option<(Vec<[i64; 2]>, CornerSource)>,
    corrected: Option<Dimensions>,
    cells: Option<CellGrid>,
}

impl MetadataBuilder {
    pub fn new(original: Dimensions) -> Self {
        Self {
            original,
            ..Self::default()
        }
    }

    pub fn corners(mut self, detection: &CornerDetection) -> Self {
        let points = detection
            .quadrilateral()
            .corners()
            .iter()
            .map(|p| p.truncated())
            .collect();
        self.corners = Some((points, detection.source()));
        self
    }

    pub fn corrected(mut self, dims: Dimensions) -> Self {
        self.corrected = Some(dims);
        self
    }

    pub fn cells(mut self, grid: CellGrid) -> Self {
        self.cells = Some(grid);
        self
    }

    /// Finish the record. `None` if a stage never reported.
    pub fn build(self) -> Option<Metadata> {
        let (detected_corners, corner_source) = self.corners?;
        Some(Metadata {
            original_dimensions: self.original,
            corrected_dimensions: self.corrected?,
            detected_corners,
            cell_dimensions: self.cells?.as_dimensions(),
            corner_source,
        })
    }
}
