// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tablecrop-document: Image processing for photographed table forms.
//
// Provides image I/O (decode, encode, save) and the scan pipeline: corner
// detection, perspective correction, label-column trimming and row-band
// splitting.

pub mod image;
pub mod pipeline;
pub mod scan;

// Re-export the primary structs so callers can use `tablecrop_document::TablePipeline` etc.
pub use self::image::processor::ImageProcessor;
pub use pipeline::{ProcessingResult, TablePipeline};
pub use scan::corners::{detect_corners, order_corners};
pub use scan::annotate::{AnnotationStyle, annotate_corners};
