// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tablecrop: straighten, trim and split photographed table forms.
//
// Entry point. Initialises logging, loads the layout profile, runs the
// pipeline on one image and writes the results.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tablecrop_core::TableLayout;
use tablecrop_core::error::Result;
use tablecrop_core::human_errors::humanize_error;
use tablecrop_document::{AnnotationStyle, ImageProcessor, TablePipeline, annotate_corners};

use services::output::{OutputManifest, OutputWriter, base_name};

/// Straighten a photographed 32x17 table form, drop its label column and
/// split it into rows 1-8 and rows 9-17.
#[derive(Debug, Parser)]
#[command(name = "tablecrop", version, about)]
struct Cli {
    /// Photo or scan of the form (PNG, JPEG, BMP, TIFF).
    input: PathBuf,

    /// Directory the results are written to.
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// JSON layout profile; omitted fields keep their defaults.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Skip writing the corner visualization.
    #[arg(long)]
    no_visualization: bool,

    /// Font for the corner labels in the visualization; a common system
    /// font is tried when omitted.
    #[arg(long, conflicts_with = "no_visualization")]
    font: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(input = %cli.input.display(), "tablecrop starting");

    match run(&cli) {
        Ok(manifest) => {
            for name in manifest.files.values() {
                println!("{}", manifest.directory.join(name).display());
            }
            println!("{}", manifest.directory.join(&manifest.metadata_file).display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "processing failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<OutputManifest> {
    let layout = match &cli.layout {
        Some(path) => TableLayout::from_json_file(path)?,
        None => TableLayout::default(),
    };
    let pipeline = TablePipeline::new(layout)?;
    let style = match (&cli.font, cli.no_visualization) {
        (_, true) => None,
        (Some(path), false) => Some(AnnotationStyle::with_font_path(path)?),
        (None, false) => Some(AnnotationStyle::with_system_font()),
    };

    let input = ImageProcessor::open(&cli.input)?;
    let result = pipeline.process(input.as_dynamic())?;
    let visualization = style
        .as_ref()
        .map(|style| annotate_corners(input.as_dynamic(), result.detection(), style));

    OutputWriter::new(&cli.output_dir, base_name(&cli.input)).write(&result, visualization.as_ref())
}
