// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for tablecrop.

use thiserror::Error;

/// Top-level error type for all tablecrop operations.
///
/// A missing table outline is deliberately absent here: corner detection
/// degrades to a fallback rectangle instead of failing.
#[derive(Debug, Error)]
pub enum TableCropError {
    // -- Input --
    #[error("image decoding failed: {0}")]
    Decode(String),

    // -- Geometry --
    #[error("perspective transform failed: {0}")]
    Transform(String),

    #[error("invalid table layout: {0}")]
    InvalidLayout(String),

    #[error("stage `{stage}` produced an empty image")]
    EmptyOutput { stage: &'static str },

    #[error("label font unusable: {0}")]
    Font(String),

    // -- Output --
    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TableCropError>;
