//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! scan.tif
//!     Size: 2480x3508
//!     Resolution: 300x300 dpi
//!     Channels: 3 x 8 bit (rgb8)
//!     Codec: tiff
//!     Empty page: no (3.12% ink, threshold 0.05%)
//! ```
//!
//! ## Demo
//!
//! ```text
//! Decoded first.tif
//! Wrote test.jpg
//! Decoded 1843200 bytes from memory
//!     Size: 640x480
//!     ...
//! Resolution set to 144x144 dpi
//! Transformed to 960x1280
//! Encoded 183204 bytes of JPEG
//! Wrote memory.jpg
//! ```
//!
//! ## Batch
//!
//! ```text
//! Converting 3 images
//! 001.tif → out/001.jpg (2480x3508)
//! broken.jpg failed: Decode error: ...
//! Converted 2, failed 1
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport};
use crate::demo::{DemoEvent, DemoReport};
use crate::imaging::ImageInfo;
use serde::Serialize;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name for display, falling back to the full path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Info
// ============================================================================

/// Property lines for an image, indented one level.
fn property_lines(info: &ImageInfo) -> Vec<String> {
    let pad = indent(1);
    let resolution = if info.x_resolution == 0 && info.y_resolution == 0 {
        "unknown".to_string()
    } else {
        format!("{}x{} dpi", info.x_resolution, info.y_resolution)
    };
    let mut lines = vec![
        format!("{pad}Size: {}x{}", info.width, info.height),
        format!("{pad}Resolution: {resolution}"),
        format!(
            "{pad}Channels: {} x {} bit ({})",
            info.channels, info.channel_depth, info.colorspace
        ),
    ];
    if let Some(codec) = info.codec {
        lines.push(format!("{pad}Codec: {codec}"));
    }
    lines
}

/// Result of an empty-page check, shown under the image properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageCheck {
    pub ink_percent: f64,
    pub threshold: f64,
    pub empty: bool,
}

pub fn format_info(info: &ImageInfo, path: &Path, page: Option<&PageCheck>) -> Vec<String> {
    let mut lines = vec![display_name(path)];
    lines.extend(property_lines(info));
    if let Some(page) = page {
        lines.push(format!(
            "{}Empty page: {} ({:.2}% ink, threshold {}%)",
            indent(1),
            if page.empty { "yes" } else { "no" },
            page.ink_percent,
            page.threshold
        ));
    }
    lines
}

pub fn print_info(info: &ImageInfo, path: &Path, page: Option<&PageCheck>) {
    for line in format_info(info, path, page) {
        println!("{}", line);
    }
}

pub fn format_info_json(
    info: &ImageInfo,
    page: Option<&PageCheck>,
) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(info)?;
    if let (Some(page), Some(fields)) = (page, value.as_object_mut()) {
        fields.insert("page".to_string(), serde_json::to_value(page)?);
    }
    serde_json::to_string_pretty(&value)
}

// ============================================================================
// Demo
// ============================================================================

/// Format a single demo progress event as display lines.
pub fn format_demo_event(event: &DemoEvent) -> Vec<String> {
    match event {
        DemoEvent::DecodedFile { path } => vec![format!("Decoded {}", path.display())],
        DemoEvent::WroteFile { path } => vec![format!("Wrote {}", path.display())],
        DemoEvent::DecodedMemory { bytes } => {
            vec![format!("Decoded {} from memory", plural(*bytes, "byte"))]
        }
        DemoEvent::Properties(info) => property_lines(info),
        DemoEvent::ResolutionSet { x, y } => vec![format!("Resolution set to {x}x{y} dpi")],
        DemoEvent::Transformed { width, height } => {
            vec![format!("Transformed to {width}x{height}")]
        }
        DemoEvent::EncodedMemory { bytes } => {
            vec![format!("Encoded {} of JPEG", plural(*bytes, "byte"))]
        }
        DemoEvent::WroteMemory { path } => vec![format!("Wrote {}", path.display())],
    }
}

pub fn format_demo_report(report: &DemoReport) -> Vec<String> {
    vec![
        format!(
            "Done: {}x{} → {}x{}, {} and {}",
            report.decoded.width,
            report.decoded.height,
            report.transformed.width,
            report.transformed.height,
            display_name(&report.file_output),
            display_name(&report.memory_output),
        ),
    ]
}

pub fn print_demo_report(report: &DemoReport) {
    for line in format_demo_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event. Sources are shown relative to
/// `input_dir` when possible.
pub fn format_batch_event(event: &BatchEvent, input_dir: &Path) -> Vec<String> {
    let relative = |p: &Path| {
        p.strip_prefix(input_dir)
            .unwrap_or(p)
            .display()
            .to_string()
    };
    match event {
        BatchEvent::Started { total } => vec![format!("Converting {}", plural(*total, "image"))],
        BatchEvent::Converted {
            source,
            output,
            width,
            height,
        } => vec![format!(
            "{} \u{2192} {} ({width}x{height})",
            relative(source),
            output.display()
        )],
        BatchEvent::Failed { source, error } => {
            vec![format!("{} failed: {error}", relative(source))]
        }
    }
}

pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Converted {}, failed {}",
        report.converted.len(),
        report.failed.len()
    )];
    for failure in &report.failed {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            failure.source.display(),
            failure.error
        ));
    }
    lines
}

pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}
