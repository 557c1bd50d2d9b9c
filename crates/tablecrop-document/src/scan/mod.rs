// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan stages: corner detection, perspective correction, column trimming
// and row splitting. Each stage takes an image by reference and returns a
// new one.

pub mod annotate;
pub mod corners;
pub mod crop;
pub mod homography;
pub mod warp;

pub use corners::{detect_corners, order_corners};
pub use crop::{crop_left_fraction, remove_first_column, split_rows};
pub use homography::PerspectiveMap;
pub use warp::correct_perspective;
