// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people photographing the forms.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The pipeline never retries on its own; `retriable` tells the caller whether
// trying again with a different photo can help.

use crate::error::TableCropError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user must supply a different or better image.
    ActionRequired,
    /// Cannot be fixed by changing the photo, e.g. a bad layout profile.
    Permanent,
    /// Something on this machine got in the way (disk full, permissions).
    Environment,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether resubmitting with another image can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `TableCropError` into a `HumanError`.
pub fn humanize_error(err: &TableCropError) -> HumanError {
    match err {
        TableCropError::Decode(_) => HumanError {
            message: "We couldn't open that picture.".into(),
            suggestion: "Send a PNG, JPEG, BMP or TIFF photo of the form.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },
        TableCropError::Transform(_) => HumanError {
            message: "We couldn't straighten the table in this photo.".into(),
            suggestion: "Take the photo again with the whole table visible and the camera held flat above it.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },
        TableCropError::InvalidLayout(detail) => HumanError {
            message: "The table layout settings are not usable.".into(),
            suggestion: format!("Fix the layout file: {detail}."),
            retriable: false,
            severity: Severity::Permanent,
        },
        TableCropError::EmptyOutput { .. } => HumanError {
            message: "Cropping left nothing of the table.".into(),
            suggestion: "Check that the layout settings match this form.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        TableCropError::Font(_) => HumanError {
            message: "The font for the corner labels could not be read.".into(),
            suggestion: "Point --font at a TrueType or OpenType file, or leave the option out.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        TableCropError::Encode(_) | TableCropError::Serialization(_) => HumanError {
            message: "We processed the table but couldn't save the results.".into(),
            suggestion: "Please report this problem.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        TableCropError::Io(io) => HumanError {
            message: "We couldn't read or write a file.".into(),
            suggestion: match io.kind() {
                std::io::ErrorKind::NotFound => "Check that the file name is spelled correctly.".into(),
                std::io::ErrorKind::PermissionDenied => {
                    "Choose a folder you are allowed to write to.".into()
                }
                _ => "Check that there is free disk space and try again.".into(),
            },
            retriable: false,
            severity: Severity::Environment,
        },
    }
}
