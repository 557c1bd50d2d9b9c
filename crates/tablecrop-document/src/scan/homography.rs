// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Projective mapping from the detected table outline onto the output
// rectangle, built on imageproc's `Projection`.

use imageproc::geometric_transformations::Projection;
use tablecrop_core::error::{Result, TableCropError};
use tablecrop_core::{Point, Quadrilateral};

/// Twice the triangle area below which three corners count as collinear.
const COLLINEAR_EPSILON: f64 = 1e-6;

/// A projective transform between a quadrilateral and a rectangle.
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveMap {
    projection: Projection,
}

impl PerspectiveMap {
    /// Transform taking `quad` onto the axis-aligned rectangle
    /// `(0, 0)..(width, height)`, corner for corner.
    ///
    /// Fails with [`TableCropError::Transform`] when three corners of the
    /// outline are collinear or no projection fits the correspondences.
    pub fn quad_to_rect(quad: &Quadrilateral, width: f64, height: f64) -> Result<Self> {
        let dst = Quadrilateral::rectangle(0.0, 0.0, width, height);
        check_non_degenerate("source", quad.corners())?;
        check_non_degenerate("destination", dst.corners())?;

        let projection =
            Projection::from_control_points(control_points(quad), control_points(&dst))
                .ok_or_else(|| {
                    TableCropError::Transform(format!(
                        "no projection maps {:?} onto {width}x{height}",
                        quad.corners()
                    ))
                })?;
        Ok(Self { projection })
    }

    /// The reverse mapping, from the rectangle back onto the outline.
    pub fn inverse(&self) -> Self {
        Self {
            projection: self.projection.invert(),
        }
    }

    /// Map a point. `None` when it lands on the line at infinity.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (u, v) = self.projection * (x as f32, y as f32);
        (u.is_finite() && v.is_finite()).then_some((u as f64, v as f64))
    }
}

fn control_points(quad: &Quadrilateral) -> [(f32, f32); 4] {
    let corners = *quad.corners();
    corners.map(|p| (p.x as f32, p.y as f32))
}

/// Reject point sets where any three points are (nearly) collinear or two
/// points coincide.
fn check_non_degenerate(label: &str, pts: &[Point; 4]) -> Result<()> {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    for [i, j, k] in TRIPLES {
        let (a, b, c) = (pts[i], pts[j], pts[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if !cross.is_finite() || cross.abs() < COLLINEAR_EPSILON {
            return Err(TableCropError::Transform(format!(
                "{label} corners {i}, {j} and {k} are collinear: {:?}",
                [a, b, c]
            )));
        }
    }
    Ok(())
}
