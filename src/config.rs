//! Configuration module.
//!
//! Handles loading, validating, and merging the TOML config file. Stock
//! defaults form the base layer; a user file passed with `--config` is
//! merged on top key by key, so it only needs the values it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [encode]
//! quality = 75              # Lossy quality (1-100)
//! compression = "default"   # none, lzw, deflate, packbits, fast, best
//! # codec = "jpeg"          # Force an output codec (default: from extension)
//!
//! [transform]
//! background = [0.0, 0.0, 0.0, 1.0]  # RGBA fill for rotations
//! steps = []                # e.g. ["rotate 90", "scale 0.5"]
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Codec, Color, Compression, EncodeOptions, Quality};
use crate::steps::{Step, StepParseError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid step: {0}")]
    Step(#[from] StepParseError),
}

/// Configuration loaded from a TOML file.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    /// Encoder settings.
    pub encode: EncodeConfig,
    /// Steps applied before encoding, and the rotation fill.
    pub transform: TransformConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl RasterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encode.quality) {
            return Err(ConfigError::Validation(
                "encode.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Lossless compression for TIFF and PNG.
    pub compression: Compression,
    /// Output codec; `None` derives it from the output file extension.
    pub codec: Option<Codec>,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            quality: u32::from(Quality::default()),
            compression: Compression::Default,
            codec: None,
        }
    }
}

impl EncodeConfig {
    pub fn options(&self) -> EncodeOptions {
        EncodeOptions {
            codec: self.codec,
            quality: Quality::new(self.quality),
            compression: self.compression,
        }
    }
}

/// Transform settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// RGBA fill for pixels a free rotation leaves uncovered.
    pub background: Color,
    /// Steps applied in order to every image.
    pub steps: Vec<Step>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse step texts given on the command line.
pub fn parse_steps(texts: &[String]) -> Result<Vec<Step>, ConfigError> {
    texts
        .iter()
        .map(|t| t.parse().map_err(ConfigError::from))
        .collect()
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(RasterConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RasterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RasterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// With no path the stock defaults are returned. A given path must exist;
/// its values are merged on top of the defaults, unknown keys are rejected
/// and the result is validated.
pub fn load_config(path: Option<&Path>) -> Result<RasterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rasterkit configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass the file with `rasterkit --config <file> ...`.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encode]
# Lossy encoding quality for JPEG and AVIF (1 = worst, 100 = best).
quality = 75

# Lossless compression for TIFF and PNG.
# One of: default, none, lzw, deflate (zip), packbits, fast, best.
# TIFF uses LZW for "default".
compression = "default"

# Force an output codec instead of deriving it from the file extension.
# One of: jpeg, png, tiff, webp, bmp, pnm, avif.
# codec = "jpeg"

# ---------------------------------------------------------------------------
# Transforms
# ---------------------------------------------------------------------------
[transform]
# RGBA fill, each component 0.0-1.0, for pixels a rotation by an angle
# that is not a multiple of 90 degrees leaves uncovered.
background = [0.0, 0.0, 0.0, 1.0]

# Steps applied in order to every image before encoding. Available steps:
#   rotate <degrees>                 clockwise
#   scale <fx> [fy]                  best filter for the factors
#   nearest-scale | bilinear-scale | box-scale | thumbnail-scale <fx> [fy]
#   flip-x | flip-y
#   crop <x> <y> <width> <height>
#   auto-crop                        drop uniform rows at the bottom
#   resize <width> <height>          change canvas size, keep top-left
#   resolution <x-dpi> [y-dpi]
#   colorspace <name>                gray8, rgb16, rgba8, ...
#   invert | normalize
#   bcg <brightness> <contrast> <gamma>
#   hsl <hue-degrees> <saturation> <lightness>
steps = []

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
