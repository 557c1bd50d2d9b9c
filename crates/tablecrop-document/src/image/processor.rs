// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image I/O for the pipeline's collaborators: decoding uploads and files
// into `DynamicImage`, and encoding results back to PNG bytes.

use image::{DynamicImage, ImageFormat};
use tablecrop_core::error::{Result, TableCropError};
use tracing::{debug, info, instrument};

/// A decoded, non-empty raster image.
///
/// ```ignore
/// let png = encode_png(ImageProcessor::open("form.jpg")?.as_dynamic())?;
/// ```
pub struct ImageProcessor {
    /// The decoded image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path. The format is sniffed from the content.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let processor = Self::from_bytes(&bytes).map_err(|err| match err {
            TableCropError::Decode(detail) => TableCropError::Decode(format!(
                "{}: {}",
                path.as_ref().display(),
                detail
            )),
            other => other,
        })?;
        info!(
            width = processor.width(),
            height = processor.height(),
            "Image loaded"
        );
        Ok(processor)
    }

    /// Decode raw encoded bytes (PNG, JPEG, BMP, TIFF, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| TableCropError::Decode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Self::from_dynamic(img)
    }

    /// Wrap an already-decoded `DynamicImage`. Images without pixels are
    /// rejected as undecodable.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TableCropError::Decode(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }
}

/// Encode any `DynamicImage` as PNG. 16-bit and float layouts are narrowed
/// to 8-bit RGB(A) first so every result stays viewable.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let narrowed;
    let image = match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => {
            narrowed = DynamicImage::ImageRgba8(other.to_rgba8());
            &narrowed
        }
        other => {
            narrowed = DynamicImage::ImageRgb8(other.to_rgb8());
            &narrowed
        }
    };

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| TableCropError::Encode(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn garbage_bytes_are_a_decode_failure() {
        let err = ImageProcessor::from_bytes(b"definitely not an image")
            .err()
            .expect("decode must fail");
        assert!(matches!(err, TableCropError::Decode(_)));
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert!(matches!(
            ImageProcessor::from_dynamic(empty),
            Err(TableCropError::Decode(_))
        ));
    }

    #[test]
    fn png_bytes_decode_back_to_same_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(37, 21, Rgb([10, 20, 30])));
        let bytes = encode_png(&img).unwrap();

        let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (37, 21));
        assert_eq!(decoded.as_dynamic().to_rgb8().get_pixel(5, 5), &Rgb([10, 20, 30]));
    }

    #[test]
    fn sixteen_bit_images_encode_as_png() {
        let img = DynamicImage::ImageRgb16(image::ImageBuffer::new(4, 4));
        assert!(encode_png(&img).is_ok());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ImageProcessor::open("/nonexistent/tablecrop/form.png")
            .err()
            .expect("open must fail");
        assert!(matches!(err, TableCropError::Io(_)));
    }
}
