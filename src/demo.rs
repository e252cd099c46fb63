//! The walkthrough: decode, inspect, transform, re-encode.
//!
//! Runs the full handle lifecycle against two TIFF files:
//!
//! 1. decode the first TIFF from disk and write it as JPEG (`test.jpg`);
//! 2. read the second TIFF into memory and decode it from the buffer;
//! 3. report width, height, resolution, channels and channel depth;
//! 4. set the resolution to 144 dpi and read it back;
//! 5. rotate by 90°, scale by 4, box-scale by 0.5;
//! 6. encode JPEG to memory, report its size, write it to `memory.jpg`.
//!
//! Any failure stops the run with a [`DemoError`] naming the step.
//! Progress is reported as [`DemoEvent`]s when a sender is given.

use crate::imaging::{
    Color, Compression, EncodeOptions, ImageBackend, ImageInfo, ImagingError, Quality, RustBackend,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::info;

/// Quality used for both JPEG encodes.
pub const DEMO_QUALITY: u32 = 80;
/// Resolution written before transforming.
pub const DEMO_RESOLUTION: u32 = 144;
const ROTATION: f64 = 90.0;
const SCALE: f64 = 4.0;
const BOX_SCALE: f64 = 0.5;

pub const FILE_OUTPUT: &str = "test.jpg";
pub const MEMORY_OUTPUT: &str = "memory.jpg";

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("Decoding {path} failed: {source}")]
    Decode { path: PathBuf, source: ImagingError },
    #[error("Writing {path} failed: {source}")]
    Encode { path: PathBuf, source: ImagingError },
    #[error("Decoding from memory failed: {0}")]
    DecodeMemory(#[source] ImagingError),
    #[error("Encoding to memory failed: {0}")]
    EncodeMemory(#[source] ImagingError),
    #[error("Transform failed: {0}")]
    Transform(#[source] ImagingError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Inputs and output location.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub first: PathBuf,
    pub second: PathBuf,
    pub out_dir: PathBuf,
    pub quality: Quality,
    /// Fill for rotations; the quarter turn here never uses it.
    pub background: Color,
}

impl DemoOptions {
    pub fn new(first: impl Into<PathBuf>, second: impl Into<PathBuf>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            out_dir: PathBuf::from("."),
            quality: Quality::new(DEMO_QUALITY),
            background: Color::BLACK,
        }
    }
}

/// Progress of a run, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DemoEvent {
    DecodedFile { path: PathBuf },
    WroteFile { path: PathBuf },
    DecodedMemory { bytes: usize },
    Properties(ImageInfo),
    ResolutionSet { x: u32, y: u32 },
    Transformed { width: u32, height: u32 },
    EncodedMemory { bytes: usize },
    WroteMemory { path: PathBuf },
}

/// What the run observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoReport {
    pub file_output: PathBuf,
    pub memory_output: PathBuf,
    /// The second image right after decoding from memory.
    pub decoded: ImageInfo,
    /// Resolution read back after setting it.
    pub resolution_after_set: (u32, u32),
    /// The second image after rotate, scale and box-scale.
    pub transformed: ImageInfo,
    pub memory_jpeg_bytes: usize,
}

pub fn run(options: &DemoOptions, events: Option<Sender<DemoEvent>>) -> Result<DemoReport, DemoError> {
    run_with_backend(&RustBackend::new(), options, events)
}

/// Run against a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    options: &DemoOptions,
    events: Option<Sender<DemoEvent>>,
) -> Result<DemoReport, DemoError> {
    let emit = |event: DemoEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };

    // Disk round trip
    let image = backend
        .decode_file(&options.first)
        .map_err(|source| DemoError::Decode {
            path: options.first.clone(),
            source,
        })?;
    emit(DemoEvent::DecodedFile {
        path: options.first.clone(),
    });

    let file_output = options.out_dir.join(FILE_OUTPUT);
    backend
        .encode_file(
            &image,
            &file_output,
            &EncodeOptions {
                codec: None,
                quality: options.quality,
                compression: Compression::Default,
            },
        )
        .map_err(|source| DemoError::Encode {
            path: file_output.clone(),
            source,
        })?;
    info!(path = %file_output.display(), "wrote first image");
    emit(DemoEvent::WroteFile {
        path: file_output.clone(),
    });

    // Same handle, now filled from memory
    let mut image = image;
    let bits = read(&options.second)?;
    image.decode(&bits).map_err(DemoError::DecodeMemory)?;
    emit(DemoEvent::DecodedMemory { bytes: bits.len() });

    let decoded = image.info();
    emit(DemoEvent::Properties(decoded.clone()));

    image.set_x_resolution(DEMO_RESOLUTION);
    image.set_y_resolution(DEMO_RESOLUTION);
    let resolution_after_set = (image.x_resolution(), image.y_resolution());
    emit(DemoEvent::ResolutionSet {
        x: resolution_after_set.0,
        y: resolution_after_set.1,
    });

    image.rotate(ROTATION, options.background);
    image.scale(SCALE, None).map_err(DemoError::Transform)?;
    image.box_scale(BOX_SCALE, None).map_err(DemoError::Transform)?;
    let transformed = image.info();
    emit(DemoEvent::Transformed {
        width: transformed.width,
        height: transformed.height,
    });

    let jpeg = image
        .encode("jpeg", options.quality, Compression::Default)
        .map_err(DemoError::EncodeMemory)?;
    emit(DemoEvent::EncodedMemory { bytes: jpeg.len() });

    let memory_output = options.out_dir.join(MEMORY_OUTPUT);
    write(&memory_output, &jpeg)?;
    info!(path = %memory_output.display(), bytes = jpeg.len(), "wrote memory encode");
    emit(DemoEvent::WroteMemory {
        path: memory_output.clone(),
    });

    Ok(DemoReport {
        file_output,
        memory_output,
        decoded,
        resolution_after_set,
        transformed,
        memory_jpeg_bytes: jpeg.len(),
    })
}

fn read(path: &Path) -> Result<Vec<u8>, DemoError> {
    std::fs::read(path).map_err(|source| DemoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, data: &[u8]) -> Result<(), DemoError> {
    std::fs::write(path, data).map_err(|source| DemoError::Io {
        path: path.to_path_buf(),
        source,
    })
}
