//! Directory conversion.
//!
//! Walks an input directory for decodable images, applies the configured
//! steps to each one and encodes it into the output directory, keeping the
//! relative layout and swapping the extension:
//!
//! ```text
//! scans/                      out/
//! ├── 001.tif          →      ├── 001.jpg
//! └── letters/                └── letters/
//!     └── 002.png      →          └── 002.jpg
//! ```
//!
//! Files are converted in parallel using [rayon](https://docs.rs/rayon). A
//! file that fails is reported and skipped; the rest of the batch continues.
//! When two sources map to the same output (`a.tif` and `a.png`), the first
//! in path order is converted and the others fail without being written.

use crate::imaging::rust_backend::is_supported_input;
use crate::imaging::{Codec, Color, EncodeOptions, ImageBackend, ImagingError, RustBackend};
use crate::steps::{Step, apply_all};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// What to convert and how.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub codec: Codec,
    pub encode: EncodeOptions,
    pub steps: Vec<Step>,
    pub background: Color,
}

/// Progress events, sent as files finish (in completion order).
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Converted {
        source: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        source: PathBuf,
        error: String,
    },
}

/// A file that could not be converted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of a batch run, sorted by source path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
}

/// Find decodable images under `dir`, sorted for stable output.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory(dir.to_path_buf()));
    }
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_input(entry.path()) {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Where `source` lands: same path relative to `input_dir`, under
/// `output_dir`, with the codec's extension.
pub fn output_path(input_dir: &Path, output_dir: &Path, source: &Path, codec: Codec) -> PathBuf {
    let relative = source.strip_prefix(input_dir).unwrap_or(source);
    let relative = match relative.file_name() {
        Some(_) => relative.to_path_buf(),
        None => PathBuf::from(source.file_name().unwrap_or_default()),
    };
    output_dir.join(relative).with_extension(codec.extension())
}

pub fn run(options: &BatchOptions, events: Option<Sender<BatchEvent>>) -> Result<BatchReport, BatchError> {
    run_with_backend(&RustBackend::new(), options, events)
}

/// Run against a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    let inputs = discover_inputs(&options.input_dir)?;
    std::fs::create_dir_all(&options.output_dir)?;
    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: inputs.len(),
        })
        .ok();
    }

    let encode = EncodeOptions {
        codec: Some(options.codec),
        ..options.encode
    };
    let (jobs, collisions) = plan_outputs(options, inputs);
    let mut report = BatchReport::default();
    for (source, claimed_by) in collisions {
        let error = format!("output collides with {}", claimed_by.display());
        warn!(source = %source.display(), %error, "skipped");
        if let Some(tx) = &events {
            tx.send(BatchEvent::Failed {
                source: source.clone(),
                error: error.clone(),
            })
            .ok();
        }
        report.failed.push(BatchFailure { source, error });
    }

    let results: Vec<(PathBuf, Result<PathBuf, ImagingError>)> = jobs
        .into_par_iter()
        .map(|(source, output)| {
            let result = convert_one(backend, &source, &output, options, &encode);
            if let Some(tx) = &events {
                let event = match &result {
                    Ok((width, height)) => BatchEvent::Converted {
                        source: source.clone(),
                        output: output.clone(),
                        width: *width,
                        height: *height,
                    },
                    Err(e) => BatchEvent::Failed {
                        source: source.clone(),
                        error: e.to_string(),
                    },
                };
                tx.send(event).ok();
            }
            (source, result.map(|_| output))
        })
        .collect();

    for (source, result) in results {
        match result {
            Ok(output) => report.converted.push(output),
            Err(e) => {
                warn!(source = %source.display(), error = %e, "conversion failed");
                report.failed.push(BatchFailure {
                    source,
                    error: e.to_string(),
                });
            }
        }
    }
    report.failed.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(report)
}

/// Pair each source with its output path. Sources whose output is already
/// claimed by an earlier source come back separately, with that source.
fn plan_outputs(
    options: &BatchOptions,
    inputs: Vec<PathBuf>,
) -> (Vec<(PathBuf, PathBuf)>, Vec<(PathBuf, PathBuf)>) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::new();
    let mut collisions = Vec::new();
    for source in inputs {
        let output = output_path(&options.input_dir, &options.output_dir, &source, options.codec);
        match claimed.get(&output) {
            Some(first) => collisions.push((source, first.clone())),
            None => {
                claimed.insert(output.clone(), source.clone());
                jobs.push((source, output));
            }
        }
    }
    (jobs, collisions)
}

fn convert_one(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    options: &BatchOptions,
    encode: &EncodeOptions,
) -> Result<(u32, u32), ImagingError> {
    let mut image = backend.decode_file(source)?;
    apply_all(&options.steps, &mut image, options.background)?;
    backend.encode_file(&image, output, encode)?;
    debug!(source = %source.display(), output = %output.display(), "converted");
    Ok((image.width(), image.height()))
}
