// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output persistence: writes the result images and the metadata JSON for
// one processed form.
//
// Files are staged in a temporary directory inside the output directory and
// only moved into place once all of them encoded, so a failed run leaves no
// partial set behind. The staging directory is removed on every exit path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;
use tablecrop_core::Metadata;
use tablecrop_core::error::Result;
use tablecrop_document::ProcessingResult;
use tablecrop_document::image::processor::encode_png;
use tracing::{debug, info, instrument};

/// Metadata as written to `<base>_metadata.json`.
#[derive(Debug, Serialize)]
struct MetadataFile<'a> {
    #[serde(flatten)]
    metadata: &'a Metadata,
    output_files: &'a BTreeMap<&'static str, String>,
}

/// Where the files of one run ended up.
#[derive(Debug, Clone)]
pub struct OutputManifest {
    pub directory: PathBuf,
    /// Role (`cropped_table`, `part1`, ...) to file name.
    pub files: BTreeMap<&'static str, String>,
    pub metadata_file: String,
}

/// Writes the outputs of one run as `<base_name>_<role>.png` files.
pub struct OutputWriter {
    directory: PathBuf,
    base_name: String,
}

impl OutputWriter {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
        }
    }

    /// Write the result images, the optional corner visualization and the
    /// metadata JSON.
    #[instrument(skip_all, fields(dir = %self.directory.display(), base = %self.base_name))]
    pub fn write(
        &self,
        result: &ProcessingResult,
        corners_visualization: Option<&DynamicImage>,
    ) -> Result<OutputManifest> {
        std::fs::create_dir_all(&self.directory)?;
        let staging = tempfile::Builder::new()
            .prefix(".tablecrop-")
            .tempdir_in(&self.directory)?;
        debug!(staging = %staging.path().display(), "Staging outputs");

        let mut images: Vec<(&'static str, String, &DynamicImage)> = Vec::new();
        if let Some(vis) = corners_visualization {
            images.push(("corners_visualization", self.file_name("corners.png"), vis));
        }
        images.push((
            "perspective_corrected",
            self.file_name("perspective_corrected.png"),
            result.perspective_corrected(),
        ));
        images.push(("cropped_table", self.file_name("cropped_table.png"), result.cropped_table()));
        images.push(("left_cropped", self.file_name("left_cropped.png"), result.left_cropped()));
        images.push(("part1", self.file_name("part1_rows1-8.png"), result.upper_band()));
        images.push(("part2", self.file_name("part2_rows9-17.png"), result.lower_band()));

        let mut files = BTreeMap::new();
        for (role, name, image) in images {
            std::fs::write(staging.path().join(&name), encode_png(image)?)?;
            files.insert(role, name);
        }

        let metadata_file = self.file_name("metadata.json");
        let json = serde_json::to_string_pretty(&MetadataFile {
            metadata: result.metadata(),
            output_files: &files,
        })?;
        std::fs::write(staging.path().join(&metadata_file), json)?;

        for name in files.values().chain(std::iter::once(&metadata_file)) {
            std::fs::rename(staging.path().join(name), self.directory.join(name))?;
        }
        info!(count = files.len() + 1, "Outputs written");

        Ok(OutputManifest {
            directory: self.directory.clone(),
            files,
            metadata_file,
        })
    }

    fn file_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.base_name, suffix)
    }
}

/// File stem of the input, used to name every output. Falls back to
/// `uploaded` for paths without one.
pub fn base_name(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("uploaded")
        .to_owned()
}
