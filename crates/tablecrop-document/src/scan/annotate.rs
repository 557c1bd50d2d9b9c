// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner visualization for checking detections by eye.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use tablecrop_core::CornerDetection;
use tablecrop_core::error::{Result, TableCropError};
use tracing::{debug, info};

const DETECTED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const FALLBACK_COLOR: Rgb<u8> = Rgb([255, 160, 0]);
const MARKER_RADIUS: i32 = 10;
/// Offset of a corner's index label from the corner itself.
const LABEL_OFFSET: i32 = 15;

const SYSTEM_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// How corner visualizations are drawn.
///
/// Corner indices (1 to 4, in detection order) are only labelled when a
/// font is available; markers and outline are always drawn.
pub struct AnnotationStyle {
    /// Font for the index labels. `None` skips the labels.
    pub font: Option<FontVec>,
    /// Label height in pixels.
    pub label_scale: f32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            font: None,
            label_scale: 32.0,
        }
    }
}

impl AnnotationStyle {
    /// Style labelling corners with the TrueType/OpenType font at `path`.
    pub fn with_font_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|_| {
            TableCropError::Font(format!("{} is not a usable font", path.display()))
        })?;
        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    /// Style using the first common system font found, unlabelled if none is.
    pub fn with_system_font() -> Self {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(style) = Self::with_font_path(Path::new(path)) {
                info!(path, "Loaded label font");
                return style;
            }
        }
        debug!("No system font found; corner labels will be skipped");
        Self::default()
    }
}

/// Copy of `image` with the outline drawn, a filled marker on each corner
/// and, when `style` has a font, each corner's index next to it. Confident
/// detections are red, fallback rectangles orange.
pub fn annotate_corners(
    image: &DynamicImage,
    detection: &CornerDetection,
    style: &AnnotationStyle,
) -> DynamicImage {
    let mut canvas = image.to_rgb8();
    let color = if detection.is_fallback() {
        FALLBACK_COLOR
    } else {
        DETECTED_COLOR
    };

    let corners = detection.quadrilateral().corners();
    for (i, corner) in corners.iter().enumerate() {
        let next = corners[(i + 1) % corners.len()];
        draw_line_segment_mut(
            &mut canvas,
            (corner.x as f32, corner.y as f32),
            (next.x as f32, next.y as f32),
            color,
        );
    }
    for corner in corners {
        draw_filled_circle_mut(&mut canvas, (corner.x as i32, corner.y as i32), MARKER_RADIUS, color);
    }

    if let Some(font) = &style.font {
        let scale = PxScale::from(style.label_scale);
        for (i, corner) in corners.iter().enumerate() {
            draw_text_mut(
                &mut canvas,
                color,
                corner.x as i32 + LABEL_OFFSET,
                corner.y as i32 + LABEL_OFFSET,
                scale,
                font,
                &(i + 1).to_string(),
            );
        }
    }

    DynamicImage::ImageRgb8(canvas)
}
