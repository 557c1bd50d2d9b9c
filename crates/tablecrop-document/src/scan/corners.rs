// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table corner detection: edge map, external contours, polygon
// approximation, and the corner ordering rule.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology;
use imageproc::point::Point as PixelPoint;
use tablecrop_core::{CornerDetection, DetectorSettings, Point, Quadrilateral};
use tracing::{debug, info, instrument, warn};

/// Locate the four corners of the table in `image`.
///
/// ## Pipeline
///
/// 1. Convert to grayscale
/// 2. Gaussian blur to suppress sensor noise
/// 3. Canny edge detection (3x3 Sobel aperture)
/// 4. Morphological closing with a 3x3 square to bridge broken edges
/// 5. Trace external contours
/// 6. Approximate each contour by a polygon; keep 4-vertex ones whose area
///    exceeds the minimum fraction of the image, largest wins
/// 7. Order the winner with [`order_corners`]
///
/// When nothing qualifies the image rectangle, inset on every side, is
/// returned as [`CornerDetection::Fallback`]. This never fails.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn detect_corners(image: &DynamicImage, settings: &DetectorSettings) -> CornerDetection {
    let (width, height) = (image.width(), image.height());

    let edges = edge_map(&image.to_luma8(), settings);
    let contours = find_contours::<i32>(&edges);
    debug!(contours = contours.len(), "Contours traced");

    let min_area = width as f64 * height as f64 * settings.min_area_ratio;
    let best = contours
        .iter()
        .filter(|contour| is_external(contour))
        .filter_map(|contour| quadrilateral_candidate(contour, settings.polygon_epsilon_ratio))
        .filter(|(_, area)| *area > min_area)
        .fold(None::<([Point; 4], f64)>, |best, candidate| match best {
            Some((_, best_area)) if best_area >= candidate.1 => best,
            _ => Some(candidate),
        });

    match best {
        Some((vertices, area)) => {
            let quad = order_corners(vertices);
            info!(area, corners = ?quad.corners(), "Table outline detected");
            CornerDetection::Detected(quad)
        }
        None => {
            let quad = fallback_quadrilateral(width, height, settings.fallback_inset_ratio);
            warn!(
                corners = ?quad.corners(),
                "No table outline found; assuming an undistorted capture"
            );
            CornerDetection::Fallback(quad)
        }
    }
}

/// Order four vertices top-left, top-right, bottom-right, bottom-left.
///
/// Vertices are sorted by their angle around the centroid, then the sequence
/// is rotated so the vertex nearest the image origin comes first (the first
/// one wins on a tie). For strongly rotated outlines the vertex nearest the
/// origin need not be the visual top-left, so the result can start at
/// another corner; callers get the winding, not a guarantee.
pub fn order_corners(vertices: [Point; 4]) -> Quadrilateral {
    let cx = vertices.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = vertices.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let mut sorted = vertices;
    sorted.sort_by(|a, b| {
        let angle_a = (a.y - cy).atan2(a.x - cx);
        let angle_b = (b.y - cy).atan2(b.x - cx);
        angle_a.total_cmp(&angle_b)
    });

    let mut start = 0;
    for (i, vertex) in sorted.iter().enumerate() {
        if vertex.origin_distance_sq() < sorted[start].origin_distance_sq() {
            start = i;
        }
    }
    sorted.rotate_left(start);

    Quadrilateral::from_ordered(sorted)
}

/// The image rectangle inset by `inset_ratio * min(width, height)`.
pub fn fallback_quadrilateral(width: u32, height: u32, inset_ratio: f64) -> Quadrilateral {
    let (w, h) = (width as f64, height as f64);
    let margin = w.min(h) * inset_ratio;
    Quadrilateral::rectangle(margin, margin, w - margin, h - margin)
}

// -- Helpers ------------------------------------------------------------------

/// Blurred, Canny-detected and closed edge map.
fn edge_map(gray: &GrayImage, settings: &DetectorSettings) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, settings.blur_sigma);
    let edges = canny(&blurred, settings.canny_low, settings.canny_high);
    morphology::close(&edges, Norm::LInf, 1)
}

/// Outer borders that no other border encloses.
fn is_external(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// Polygon-approximate a contour; `Some((vertices, contour_area))` when the
/// approximation has exactly four vertices.
fn quadrilateral_candidate(contour: &Contour<i32>, epsilon_ratio: f64) -> Option<([Point; 4], f64)> {
    let points = &contour.points;
    if points.len() < 4 {
        return None;
    }

    let perimeter = arc_length(points, true);
    let epsilon = perimeter * epsilon_ratio;
    if epsilon <= 0.0 {
        return None;
    }

    let approx = approximate_closed_contour(points, epsilon);
    let vertices: [PixelPoint<i32>; 4] = approx.try_into().ok()?;
    Some((
        vertices.map(|p| Point::new(p.x as f64, p.y as f64)),
        polygon_area(points),
    ))
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The trace starts at an arbitrary boundary pixel, which an open
/// approximation would always keep as a vertex. The contour is instead cut
/// at its two farthest-apart points, both hull vertices, and each half is
/// approximated separately.
fn approximate_closed_contour(points: &[PixelPoint<i32>], epsilon: f64) -> Vec<PixelPoint<i32>> {
    let start = farthest_from(points, points[0]);
    let opposite = farthest_from(points, points[start]);
    let (a, b) = (start.min(opposite), start.max(opposite));
    if a == b {
        return vec![points[a]];
    }

    let second_half: Vec<PixelPoint<i32>> =
        points[b..].iter().chain(&points[..=a]).copied().collect();

    let mut polygon = approximate_polygon_dp(&points[a..=b], epsilon, false);
    polygon.pop();
    let mut rest = approximate_polygon_dp(&second_half, epsilon, false);
    rest.pop();
    polygon.extend(rest);
    polygon
}

/// Index of the contour point farthest from `from` (first on ties).
fn farthest_from(points: &[PixelPoint<i32>], from: PixelPoint<i32>) -> usize {
    let dist_sq = |p: &PixelPoint<i32>| {
        let (dx, dy) = ((p.x - from.x) as i64, (p.y - from.y) as i64);
        dx * dx + dy * dy
    };
    let mut best = 0;
    for (i, point) in points.iter().enumerate() {
        if dist_sq(point) > dist_sq(&points[best]) {
            best = i;
        }
    }
    best
}

/// Area enclosed by a closed pixel contour (shoelace formula).
fn polygon_area(points: &[PixelPoint<i32>]) -> f64 {
    let n = points.len();
    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as f64 * points[j].y as f64;
        twice_area -= points[j].x as f64 * points[i].y as f64;
    }
    twice_area.abs() / 2.0
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_hollow_rect_mut, draw_polygon_mut};
    use imageproc::rect::Rect;

    /// White page with a black rectangular frame `thickness` pixels wide.
    fn framed_page(
        width: u32,
        height: u32,
        left: i32,
        top: i32,
        frame_w: u32,
        frame_h: u32,
        thickness: i32,
    ) -> DynamicImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255u8]));
        for t in 0..thickness {
            let rect = Rect::at(left + t, top + t)
                .of_size(frame_w - 2 * t as u32, frame_h - 2 * t as u32);
            draw_hollow_rect_mut(&mut img, rect, Luma([0u8]));
        }
        DynamicImage::ImageLuma8(img)
    }

    /// White page with a black outline `thickness` pixels wide through the
    /// given corners (TL, TR, BR, BL).
    fn outlined_page(width: u32, height: u32, corners: [(i32, i32); 4], thickness: i32) -> DynamicImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255u8]));
        let cx = corners.iter().map(|c| c.0).sum::<i32>() / 4;
        let cy = corners.iter().map(|c| c.1).sum::<i32>() / 4;
        let outer = corners.map(|(x, y)| PixelPoint::new(x, y));
        let inner = corners.map(|(x, y)| {
            PixelPoint::new(x + thickness * (cx - x).signum(), y + thickness * (cy - y).signum())
        });
        draw_polygon_mut(&mut img, &outer, Luma([0u8]));
        draw_polygon_mut(&mut img, &inner, Luma([255u8]));
        DynamicImage::ImageLuma8(img)
    }

    fn assert_corners_near(quad: &Quadrilateral, expected: [(i32, i32); 4], tolerance: f64) {
        for (actual, (x, y)) in quad.corners().iter().zip(expected) {
            assert_near(*actual, (x as f64, y as f64), tolerance);
        }
    }

    fn assert_near(actual: Point, expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.x - expected.0).abs() <= tolerance && (actual.y - expected.1).abs() <= tolerance,
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn order_corners_sorts_shuffled_rectangle() {
        let quad = order_corners([
            Point::new(100.0, 90.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 90.0),
            Point::new(100.0, 10.0),
        ]);
        assert_eq!(
            quad.corners(),
            &[
                Point::new(10.0, 10.0),
                Point::new(100.0, 10.0),
                Point::new(100.0, 90.0),
                Point::new(10.0, 90.0),
            ]
        );
    }

    #[test]
    fn order_corners_keeps_first_vertex_on_distance_tie() {
        // Diamond: top and left vertices are equally far from the origin.
        let quad = order_corners([
            Point::new(0.0, 300.0),
            Point::new(300.0, 600.0),
            Point::new(600.0, 300.0),
            Point::new(300.0, 0.0),
        ]);
        assert_eq!(quad.top_left(), Point::new(300.0, 0.0));
        assert_eq!(quad.top_right(), Point::new(600.0, 300.0));
        assert_eq!(quad.bottom_left(), Point::new(0.0, 300.0));
    }

    #[test]
    fn order_corners_starts_at_vertex_nearest_origin_even_when_rotated() {
        // The visual top-left (100, 700) is farther from the origin than
        // (600, 100), so the sequence starts at (600, 100).
        let quad = order_corners([
            Point::new(100.0, 700.0),
            Point::new(600.0, 100.0),
            Point::new(900.0, 600.0),
            Point::new(300.0, 1000.0),
        ]);
        assert_eq!(
            quad.corners(),
            &[
                Point::new(600.0, 100.0),
                Point::new(900.0, 600.0),
                Point::new(300.0, 1000.0),
                Point::new(100.0, 700.0),
            ]
        );
    }

    #[test]
    fn blank_image_falls_back_to_inset_rectangle() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 300, Luma([200u8])));
        let detection = detect_corners(&img, &DetectorSettings::default());

        assert!(detection.is_fallback());
        assert_eq!(
            detection.quadrilateral(),
            &Quadrilateral::rectangle(10.0, 10.0, 190.0, 290.0)
        );
        assert_eq!(
            detection.quadrilateral(),
            &fallback_quadrilateral(200, 300, 0.05)
        );
    }

    #[test]
    fn framed_table_is_detected() {
        let img = framed_page(400, 300, 40, 30, 320, 240, 3);
        let detection = detect_corners(&img, &DetectorSettings::default());

        assert!(!detection.is_fallback(), "expected a detection: {:?}", detection);
        let quad = detection.quadrilateral();
        assert_near(quad.top_left(), (40.0, 30.0), 6.0);
        assert_near(quad.top_right(), (359.0, 30.0), 6.0);
        assert_near(quad.bottom_right(), (359.0, 269.0), 6.0);
        assert_near(quad.bottom_left(), (40.0, 269.0), 6.0);
    }

    #[test]
    fn slightly_tilted_outline_keeps_true_corners() {
        // Top edge rising towards the right by 2, 5 and 10 pixels.
        for tr_y in [48, 45, 40] {
            let truth = [(50, 50), (750, tr_y), (750, 450), (50, 450)];
            let img = outlined_page(800, 500, truth, 6);
            let detection = detect_corners(&img, &DetectorSettings::default());

            assert!(!detection.is_fallback(), "tr_y = {tr_y}: {:?}", detection);
            assert_corners_near(detection.quadrilateral(), truth, 5.0);
        }
    }

    #[test]
    fn keystoned_outline_is_detected_at_its_corners() {
        let truth = [(60, 70), (720, 30), (760, 460), (40, 440)];
        let img = outlined_page(800, 500, truth, 6);
        let detection = detect_corners(&img, &DetectorSettings::default());

        assert!(!detection.is_fallback(), "expected a detection: {:?}", detection);
        assert_corners_near(detection.quadrilateral(), truth, 5.0);
    }

    #[test]
    fn closed_approximation_ignores_trace_start() {
        // Trace of a tilted quadrilateral starting mid-edge.
        let corners = [(0, 10), (100, 0), (110, 80), (5, 90)];
        let mut points = Vec::new();
        for i in 0..4 {
            let (x0, y0) = corners[i];
            let (x1, y1) = corners[(i + 1) % 4];
            for t in 0..20 {
                points.push(PixelPoint::new(x0 + (x1 - x0) * t / 20, y0 + (y1 - y0) * t / 20));
            }
        }
        points.rotate_left(7);

        let mut approx = approximate_closed_contour(&points, 3.0);
        assert_eq!(approx.len(), 4, "{:?}", approx);
        approx.sort_by_key(|p| (p.x, p.y));
        let mut expected = corners.map(|(x, y)| PixelPoint::new(x, y));
        expected.sort_by_key(|p| (p.x, p.y));
        assert_eq!(approx, expected);
    }

    #[test]
    fn small_frame_below_area_threshold_is_ignored() {
        // 40x30 frame covers 1% of a 400x300 page.
        let img = framed_page(400, 300, 100, 100, 40, 30, 2);
        let detection = detect_corners(&img, &DetectorSettings::default());
        assert!(detection.is_fallback());
    }

    #[test]
    fn polygon_area_of_pixel_square() {
        let square = [
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
        ];
        assert!((polygon_area(&square) - 100.0).abs() < 1e-9);
    }
}
