// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective correction: right-corner capture adjustment, projective
// transform onto the fixed target rectangle, Lanczos resampling.

use std::f64::consts::PI;

use image::{DynamicImage, Rgb, RgbImage};
use tablecrop_core::error::Result;
use tablecrop_core::{Quadrilateral, TableLayout};
use tracing::{debug, info, instrument};

use super::homography::PerspectiveMap;

/// Lanczos window radius; 8 taps per axis.
const LANCZOS_A: usize = 4;
const TAPS: usize = 2 * LANCZOS_A;

/// Fill for destination pixels that map outside the source image.
const BORDER: Rgb<u8> = Rgb([0, 0, 0]);

/// Warp the table outlined by `quad` onto a `layout.corrected_dimensions()`
/// rectangle.
///
/// The rightmost column tends to be under-captured, so the two right-hand
/// corners are pushed right by `layout.right_corner_shift_px` before the
/// transform is solved. The destination is the target table width plus a
/// right margin, so the output size is fixed whatever the input's aspect
/// ratio. Color images come out as 8-bit RGB.
#[instrument(skip_all, fields(src_w = image.width(), src_h = image.height()))]
pub fn correct_perspective(
    image: &DynamicImage,
    quad: &Quadrilateral,
    layout: &TableLayout,
) -> Result<DynamicImage> {
    let adjusted = adjust_right_corners(quad, layout.right_corner_shift_px);
    debug!(
        original = ?quad.corners(),
        adjusted = ?adjusted.corners(),
        "Right-hand corners adjusted"
    );

    let out = layout.corrected_dimensions();
    let forward = PerspectiveMap::quad_to_rect(&adjusted, out.width as f64, out.height as f64)?;
    let inverse = forward.inverse();

    let warped = warp_lanczos(&image.to_rgb8(), &inverse, out.width, out.height);
    info!(
        width = out.width,
        height = out.height,
        margin = layout.margin_pixels(),
        "Perspective correction applied"
    );
    Ok(DynamicImage::ImageRgb8(warped))
}

/// Shift the top-right and bottom-right corners (indices 1 and 2) by `dx`
/// pixels along x. The other two corners are untouched.
pub fn adjust_right_corners(quad: &Quadrilateral, dx: f64) -> Quadrilateral {
    quad.with_right_corners_shifted(dx)
}

/// Inverse-map every destination pixel through `inverse` and resample the
/// source with an 8x8 Lanczos kernel.
fn warp_lanczos(src: &RgbImage, inverse: &PerspectiveMap, width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| match inverse.apply(x as f64, y as f64) {
        Some((sx, sy)) => sample_lanczos(src, sx, sy),
        None => BORDER,
    })
}

/// Lanczos-interpolated pixel at sub-pixel position `(sx, sy)`. Taps outside
/// the image read as [`BORDER`].
fn sample_lanczos(src: &RgbImage, sx: f64, sy: f64) -> Rgb<u8> {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let reach = LANCZOS_A as f64;
    if !sx.is_finite()
        || !sy.is_finite()
        || sx <= -reach
        || sy <= -reach
        || sx >= w as f64 + reach
        || sy >= h as f64 + reach
    {
        return BORDER;
    }

    let (base_x, base_y) = (sx.floor(), sy.floor());
    let wx = lanczos_weights(sx - base_x);
    let wy = lanczos_weights(sy - base_y);
    let first_x = base_x as i64 - (LANCZOS_A as i64 - 1);
    let first_y = base_y as i64 - (LANCZOS_A as i64 - 1);

    let mut acc = [0.0f64; 3];
    for (j, weight_y) in wy.iter().enumerate() {
        let py = first_y + j as i64;
        for (i, weight_x) in wx.iter().enumerate() {
            let px = first_x + i as i64;
            let pixel = if (0..w).contains(&px) && (0..h).contains(&py) {
                src.get_pixel(px as u32, py as u32).0
            } else {
                BORDER.0
            };
            let weight = weight_y * weight_x;
            for (channel, value) in acc.iter_mut().zip(pixel) {
                *channel += weight * value as f64;
            }
        }
    }

    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}

/// Normalized weights for the taps at offsets `-3..=4` from the base pixel,
/// `frac` being the sub-pixel offset in `[0, 1)`.
fn lanczos_weights(frac: f64) -> [f64; TAPS] {
    let mut weights = [0.0f64; TAPS];
    for (k, weight) in weights.iter_mut().enumerate() {
        let offset = k as f64 - (LANCZOS_A as f64 - 1.0);
        *weight = lanczos(frac - offset);
    }
    let sum: f64 = weights.iter().sum();
    if sum.abs() > f64::EPSILON {
        weights.iter_mut().for_each(|w| *w /= sum);
    }
    weights
}

/// `sinc(d) * sinc(d / a)`, zero outside `|d| < a`.
fn lanczos(d: f64) -> f64 {
    let a = LANCZOS_A as f64;
    if d.abs() < 1e-12 {
        return 1.0;
    }
    if d.abs() >= a {
        return 0.0;
    }
    let pd = PI * d;
    a * pd.sin() * (pd / a).sin() / (pd * pd)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tablecrop_core::{Dimensions, Point};

    #[test]
    fn only_right_corners_shift() {
        let quad = Quadrilateral::from_ordered([
            Point::new(10.0, 10.0),
            Point::new(100.0, 10.0),
            Point::new(100.0, 90.0),
            Point::new(10.0, 90.0),
        ]);
        let adjusted = adjust_right_corners(&quad, 30.0);
        assert_eq!(
            adjusted.corners(),
            &[
                Point::new(10.0, 10.0),
                Point::new(130.0, 10.0),
                Point::new(130.0, 90.0),
                Point::new(10.0, 90.0),
            ]
        );
    }

    #[test]
    fn output_size_is_fixed_regardless_of_input() {
        let layout = TableLayout::default();
        for (w, h) in [(300u32, 200u32), (200, 600)] {
            let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([128u8])));
            let quad = Quadrilateral::rectangle(10.0, 10.0, w as f64 - 40.0, h as f64 - 10.0);
            let out = correct_perspective(&img, &quad, &layout).unwrap();
            assert_eq!(Dimensions::new(out.width(), out.height()), Dimensions::new(1364, 850));
        }
    }

    #[test]
    fn uniform_region_keeps_its_value() {
        let layout = TableLayout {
            target_width: 100,
            target_height: 60,
            min_margin_px: 0,
            margin_ratio: 0.0,
            right_corner_shift_px: 0.0,
            ..TableLayout::default()
        };
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 200, Rgb([90, 140, 200])));
        let quad = Quadrilateral::rectangle(40.0, 40.0, 160.0, 160.0);

        let out = correct_perspective(&img, &quad, &layout).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (100, 60));
        assert_eq!(out.get_pixel(50, 30), &Rgb([90, 140, 200]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([90, 140, 200]));
    }

    #[test]
    fn pixels_outside_source_are_black() {
        let layout = TableLayout {
            target_width: 100,
            target_height: 100,
            min_margin_px: 0,
            margin_ratio: 0.0,
            right_corner_shift_px: 0.0,
            ..TableLayout::default()
        };
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([255, 255, 255])));
        // Outline twice the size of the image: the lower-right of the output
        // samples nothing but border.
        let quad = Quadrilateral::rectangle(0.0, 0.0, 100.0, 100.0);

        let out = correct_perspective(&img, &quad, &layout).unwrap().to_rgb8();
        assert_eq!(out.get_pixel(95, 95), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(10, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn integer_positions_sample_exact_pixels() {
        let src = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 7]));
        assert_eq!(sample_lanczos(&src, 5.0, 9.0), Rgb([50, 90, 7]));
        assert_eq!(sample_lanczos(&src, -10.0, 3.0), BORDER);
    }

    #[test]
    fn weights_are_normalized_and_symmetric() {
        let weights = lanczos_weights(0.5);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // Offsets -3..=4 around 0.5 are symmetric about the middle.
        for k in 0..TAPS / 2 {
            assert!((weights[k] - weights[TAPS - 1 - k]).abs() < 1e-12);
        }
        assert_eq!(lanczos(4.0), 0.0);
        assert_eq!(lanczos(0.0), 1.0);
    }

    #[test]
    fn collinear_outline_is_a_transform_failure() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 100));
        let quad = Quadrilateral::from_ordered([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ]);
        let err = correct_perspective(&img, &quad, &TableLayout::default()).unwrap_err();
        assert!(matches!(err, tablecrop_core::TableCropError::Transform(_)));
    }
}
