// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The table pipeline: detect corners, correct perspective, trim the label
// column and left margin, split into two row-bands, record metadata.

use image::DynamicImage;
use tablecrop_core::error::{Result, TableCropError};
use tablecrop_core::{
    CellGrid, CornerDetection, Dimensions, Metadata, MetadataBuilder, TableLayout,
};
use tracing::{info, instrument};

use crate::image::processor::ImageProcessor;
use crate::scan::{
    correct_perspective, crop_left_fraction, detect_corners, remove_first_column, split_rows,
};

/// Everything one run produces. Built once at the end of a successful run;
/// every image is non-empty.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    perspective_corrected: DynamicImage,
    cropped_table: DynamicImage,
    left_cropped: DynamicImage,
    upper_band: DynamicImage,
    lower_band: DynamicImage,
    detection: CornerDetection,
    metadata: Metadata,
}

impl ProcessingResult {
    /// Output of the perspective correction, margin included.
    pub fn perspective_corrected(&self) -> &DynamicImage {
        &self.perspective_corrected
    }

    /// Corrected table with the label column removed.
    pub fn cropped_table(&self) -> &DynamicImage {
        &self.cropped_table
    }

    /// `cropped_table` after the proportional left trim; the bands are cut
    /// from this image.
    pub fn left_cropped(&self) -> &DynamicImage {
        &self.left_cropped
    }

    /// Rows `1..=split_after_row` after the left trim.
    pub fn upper_band(&self) -> &DynamicImage {
        &self.upper_band
    }

    /// The remaining rows after the left trim.
    pub fn lower_band(&self) -> &DynamicImage {
        &self.lower_band
    }

    /// Corner detection outcome, including whether it was a fallback.
    pub fn detection(&self) -> &CornerDetection {
        &self.detection
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Runs the stages in a fixed order for one [`TableLayout`].
///
/// Holds no mutable state; one value can serve concurrent callers, each
/// call working on its own images.
#[derive(Debug, Clone)]
pub struct TablePipeline {
    layout: TableLayout,
}

impl Default for TablePipeline {
    fn default() -> Self {
        Self {
            layout: TableLayout::default(),
        }
    }
}

impl TablePipeline {
    /// Build a pipeline for `layout`, rejecting unusable profiles.
    pub fn new(layout: TableLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Decode `data` and process it.
    pub fn process_bytes(&self, data: &[u8]) -> Result<ProcessingResult> {
        let decoded = ImageProcessor::from_bytes(data)?;
        self.process(decoded.as_dynamic())
    }

    /// Load the file at `path` and process it.
    pub fn process_file(&self, path: impl AsRef<std::path::Path>) -> Result<ProcessingResult> {
        let decoded = ImageProcessor::open(path)?;
        self.process(decoded.as_dynamic())
    }

    /// Run every stage on `image`.
    ///
    /// 1. Corner detection (falls back to an inset rectangle, never fails)
    /// 2. Perspective correction onto the fixed target size
    /// 3. Label column removal
    /// 4. Proportional left trim
    /// 5. Row split
    ///
    /// Metadata is accumulated along the way and the result assembled only
    /// once every stage has succeeded.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: &DynamicImage) -> Result<ProcessingResult> {
        let layout = &self.layout;
        let original = Dimensions::new(image.width(), image.height());
        if original.is_empty() {
            return Err(TableCropError::Decode(format!("image has no pixels ({original})")));
        }
        info!(%original, "Processing table image");
        let metadata = MetadataBuilder::new(original);

        // Stage 1: corners.
        let detection = detect_corners(image, &layout.detector);
        let metadata = metadata.corners(&detection);

        // Stage 2: perspective.
        let corrected = correct_perspective(image, detection.quadrilateral(), layout)?;
        let corrected_dims = Dimensions::new(corrected.width(), corrected.height());
        let metadata = metadata.corrected(corrected_dims);

        // Stage 3: label column, sized from the corrected image's cells.
        let grid = CellGrid::from_dimensions(corrected_dims, layout.total_cols, layout.total_rows);
        let metadata = metadata.cells(grid);
        let cropped_table = non_empty(
            "remove_first_column",
            remove_first_column(&corrected, grid.cell_width, layout),
        )?;

        // Stage 4: left trim.
        let left_cropped = non_empty(
            "crop_left_fraction",
            crop_left_fraction(&cropped_table, layout.left_trim_ratio),
        )?;

        // Stage 5: bands.
        let (upper, lower) = split_rows(&left_cropped, layout);
        let upper_band = non_empty("split_rows (upper)", upper)?;
        let lower_band = non_empty("split_rows (lower)", lower)?;

        let metadata = metadata
            .build()
            .ok_or(TableCropError::EmptyOutput { stage: "metadata" })?;

        info!(
            corrected = %metadata.corrected_dimensions,
            cells = %metadata.cell_dimensions,
            corner_source = ?metadata.corner_source,
            band_width = upper_band.width(),
            upper_height = upper_band.height(),
            lower_height = lower_band.height(),
            "Table processed"
        );

        Ok(ProcessingResult {
            perspective_corrected: corrected,
            cropped_table,
            left_cropped,
            upper_band,
            lower_band,
            detection,
            metadata,
        })
    }
}

fn non_empty(stage: &'static str, image: DynamicImage) -> Result<DynamicImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TableCropError::EmptyOutput { stage });
    }
    Ok(image)
}

// -- Tests --------------------------------------------------------------------
