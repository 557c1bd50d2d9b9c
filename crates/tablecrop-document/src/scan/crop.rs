// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural cropping of the corrected table: label column removal, the
// proportional left trim, and the split into two row-bands.

use image::DynamicImage;
use tablecrop_core::{CellGrid, Dimensions, TableLayout};
use tracing::{debug, instrument, warn};

/// Drop the label column from the left of `image`.
///
/// The crop offset is one cell plus `label_margin_ratio` of a cell, so the
/// labels' text does not bleed into the first data column. When that offset
/// would reach the right edge, the bare `cell_width` is used instead, and if
/// even that is too wide, `width / total_cols`.
#[instrument(skip(image, layout), fields(width = image.width()))]
pub fn remove_first_column(image: &DynamicImage, cell_width: u32, layout: &TableLayout) -> DynamicImage {
    let offset = label_column_offset(image.width(), cell_width, layout);
    debug!(offset, "Removing label column");
    crop_columns_from(image, offset)
}

/// Crop offset used by [`remove_first_column`].
pub fn label_column_offset(width: u32, cell_width: u32, layout: &TableLayout) -> u32 {
    let margin = (cell_width as f64 * layout.label_margin_ratio).round() as u32;
    let with_margin = cell_width.saturating_add(margin);
    if with_margin < width {
        return with_margin;
    }
    warn!(
        width,
        cell_width,
        with_margin,
        "Label column margin reaches the right edge; using the bare cell width"
    );
    if cell_width < width {
        cell_width
    } else {
        width / layout.total_cols.max(1)
    }
}

/// Drop the left `ratio` of the width: keeps columns
/// `[floor(width * ratio), width)`.
#[instrument(skip(image), fields(width = image.width()))]
pub fn crop_left_fraction(image: &DynamicImage, ratio: f64) -> DynamicImage {
    let crop_x = ((image.width() as f64 * ratio).floor() as u32).min(image.width().saturating_sub(1));
    debug!(crop_x, "Trimming left fraction");
    crop_columns_from(image, crop_x)
}

/// Split `image` into the upper band (rows `1..=split_after_row`) and the
/// lower band (all remaining rows plus any remainder pixels).
///
/// Row height is `height / total_rows`, so the upper band is exactly
/// `cell_height * split_after_row` pixels tall and the two bands always add
/// up to the input height.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn split_rows(image: &DynamicImage, layout: &TableLayout) -> (DynamicImage, DynamicImage) {
    let (width, height) = (image.width(), image.height());
    let grid = CellGrid::from_dimensions(Dimensions::new(width, height), layout.total_cols, layout.total_rows);
    let split = (grid.cell_height * layout.split_after_row).min(height);
    debug!(cell_height = grid.cell_height, split, "Splitting rows");

    let upper = image.crop_imm(0, 0, width, split);
    let lower = image.crop_imm(0, split, width, height - split);
    (upper, lower)
}

/// Keep columns `[x, width)`.
fn crop_columns_from(image: &DynamicImage, x: u32) -> DynamicImage {
    let x = x.min(image.width());
    image.crop_imm(x, 0, image.width() - x, image.height())
}
