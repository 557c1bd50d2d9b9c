// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometric domain types for the tablecrop pipeline.

use serde::{Deserialize, Serialize};

/// A pixel coordinate pair. Sub-pixel positions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to the image origin `(0, 0)`.
    pub fn origin_distance_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Integer coordinates, truncated toward zero.
    pub fn truncated(&self) -> [i64; 2] {
        [self.x as i64, self.y as i64]
    }
}

/// Four corners ordered top-left, top-right, bottom-right, bottom-left.
///
/// The ordering is not verified geometrically. Callers either build one from
/// an already-ordered array or go through the corner ordering rule in the
/// detector; a wrongly ordered quadrilateral mirrors or rotates the warp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    corners: [Point; 4],
}

impl Quadrilateral {
    /// Wrap corners that are already in TL, TR, BR, BL order.
    pub const fn from_ordered(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Axis-aligned rectangle spanning `(left, top)` to `(right, bottom)`.
    pub fn rectangle(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::from_ordered([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Copy with the two right-hand corners (indices 1 and 2) moved by `dx`.
    pub fn with_right_corners_shifted(&self, dx: f64) -> Self {
        let mut corners = self.corners;
        corners[1].x += dx;
        corners[2].x += dx;
        Self { corners }
    }
}

/// Where a quadrilateral came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerSource {
    /// A table outline was found in the image.
    Detected,
    /// Nothing qualified; the inset image rectangle was substituted.
    Fallback,
}

/// Outcome of corner detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CornerDetection {
    Detected(Quadrilateral),
    Fallback(Quadrilateral),
}

impl CornerDetection {
    pub fn quadrilateral(&self) -> &Quadrilateral {
        match self {
            Self::Detected(quad) | Self::Fallback(quad) => quad,
        }
    }

    pub fn source(&self) -> CornerSource {
        match self {
            Self::Detected(_) => CornerSource::Detected,
            Self::Fallback(_) => CornerSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Pixel dimensions of an image, rendered as `WxH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Serialize for Dimensions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
        let width = w.trim().parse().map_err(|_| format!("bad width in {s:?}"))?;
        let height = h.trim().parse().map_err(|_| format!("bad height in {s:?}"))?;
        Ok(Self { width, height })
    }
}

/// Size of one table cell, derived by floor division of the image size by
/// the layout's column and row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGrid {
    pub cell_width: u32,
    pub cell_height: u32,
}

impl CellGrid {
    pub fn from_dimensions(dims: Dimensions, total_cols: u32, total_rows: u32) -> Self {
        Self {
            cell_width: dims.width / total_cols.max(1),
            cell_height: dims.height / total_rows.max(1),
        }
    }

    pub fn as_dimensions(&self) -> Dimensions {
        Dimensions::new(self.cell_width, self.cell_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_corner_shift_moves_only_indices_one_and_two() {
        let quad = Quadrilateral::rectangle(10.0, 10.0, 100.0, 90.0);
        let shifted = quad.with_right_corners_shifted(30.0);
        assert_eq!(
            shifted.corners(),
            &[
                Point::new(10.0, 10.0),
                Point::new(130.0, 10.0),
                Point::new(130.0, 90.0),
                Point::new(10.0, 90.0),
            ]
        );
        // The source value is left untouched.
        assert_eq!(quad.top_right(), Point::new(100.0, 10.0));
    }

    #[test]
    fn cell_grid_uses_floor_division() {
        let grid = CellGrid::from_dimensions(Dimensions::new(1364, 850), 32, 17);
        assert_eq!(grid.cell_width, 42);
        assert_eq!(grid.cell_height, 50);

        let grid = CellGrid::from_dimensions(Dimensions::new(31, 16), 32, 17);
        assert_eq!(grid.as_dimensions(), Dimensions::new(0, 0));
    }

    #[test]
    fn dimensions_render_and_parse_as_w_x_h() {
        let dims = Dimensions::new(1600, 1000);
        assert_eq!(dims.to_string(), "1600x1000");
        assert_eq!("1600x1000".parse::<Dimensions>().unwrap(), dims);
        assert!("1600".parse::<Dimensions>().is_err());
        assert_eq!(serde_json::to_string(&dims).unwrap(), "\"1600x1000\"");
    }

    #[test]
    fn point_truncates_toward_zero() {
        assert_eq!(Point::new(79.9, 50.5).truncated(), [79, 50]);
    }

    #[test]
    fn corner_detection_reports_its_source() {
        let quad = Quadrilateral::rectangle(1.0, 1.0, 9.0, 9.0);
        assert_eq!(CornerDetection::Detected(quad).source(), CornerSource::Detected);
        assert!(CornerDetection::Fallback(quad).is_fallback());
        assert_eq!(CornerDetection::Fallback(quad).quadrilateral(), &quad);
    }
}
