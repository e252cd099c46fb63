//! Pure calculation functions for scaling, resolution and rotation.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::ImagingError;

/// Target size of one side after scaling by `factor`.
///
/// Rounded to the nearest pixel. A non-empty side never collapses to zero.
fn scaled_side(side: u32, factor: f64) -> u32 {
    if side == 0 {
        return 0;
    }
    ((side as f64 * factor).round() as u32).max(1)
}

/// Calculate output dimensions for a scale by `(fx, fy)`.
///
/// # Examples
/// ```
/// # use rasterkit::imaging::calculations::scaled_dimensions;
/// assert_eq!(scaled_dimensions(512, 512, 4.0, 4.0), (2048, 2048));
/// assert_eq!(scaled_dimensions(2048, 1024, 0.5, 0.5), (1024, 512));
/// ```
pub fn scaled_dimensions(width: u32, height: u32, fx: f64, fy: f64) -> (u32, u32) {
    (scaled_side(width, fx), scaled_side(height, fy))
}

/// Resolution after scaling by `factor`, keeping the physical size.
///
/// Unknown resolution (0) stays unknown.
pub fn scaled_resolution(dpi: u32, factor: f64) -> u32 {
    (dpi as f64 * factor).round().max(0.0) as u32
}

/// Largest pixel buffer, in bytes, an allocating operation may create.
pub const MAX_IMAGE_BYTES: u64 = 1 << 32;

/// Reject a `width`×`height` buffer of `bytes_per_pixel` that would exceed
/// [`MAX_IMAGE_BYTES`].
pub fn check_buffer_size(width: u32, height: u32, bytes_per_pixel: u8) -> Result<(), ImagingError> {
    let bytes = (width as u64)
        .checked_mul(height as u64)
        .and_then(|px| px.checked_mul(bytes_per_pixel as u64));
    match bytes {
        Some(b) if b <= MAX_IMAGE_BYTES => Ok(()),
        _ => Err(ImagingError::InvalidArgument(format!(
            "a {width}x{height} image of {bytes_per_pixel} bytes per pixel exceeds {MAX_IMAGE_BYTES} bytes"
        ))),
    }
}

/// Reject factors that cannot describe a scale.
pub fn validate_factor(factor: f64) -> Result<f64, ImagingError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err(ImagingError::InvalidArgument(format!(
            "scale factor must be finite and positive, got {factor}"
        )))
    }
}

/// Resolve the optional vertical factor: `None` (or 0) reuses `fx`.
pub fn resolve_factors(fx: f64, fy: Option<f64>) -> Result<(f64, f64), ImagingError> {
    let fx = validate_factor(fx)?;
    let fy = match fy {
        None => fx,
        Some(v) if v == 0.0 => fx,
        Some(v) => validate_factor(v)?,
    };
    Ok((fx, fy))
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// A rotation that maps pixels onto pixels exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightAngle {
    Zero,
    Quarter,
    Half,
    ThreeQuarter,
}

/// Classify an angle as a right angle when it is within 0.01° of one.
pub fn right_angle(angle: f64) -> Option<RightAngle> {
    const TOLERANCE: f64 = 0.01;
    let a = normalize_degrees(angle);
    let near = |target: f64| (a - target).abs() < TOLERANCE;
    if near(0.0) || near(360.0) {
        Some(RightAngle::Zero)
    } else if near(90.0) {
        Some(RightAngle::Quarter)
    } else if near(180.0) {
        Some(RightAngle::Half)
    } else if near(270.0) {
        Some(RightAngle::ThreeQuarter)
    } else {
        None
    }
}

/// Convert a density in dots per centimetre to dots per inch.
pub fn dpcm_to_dpi(dpcm: f64) -> u32 {
    (dpcm * 2.54).round().max(0.0) as u32
}

/// Convert a density in dots per metre to dots per inch.
pub fn dpm_to_dpi(dpm: f64) -> u32 {
    (dpm * 0.0254).round().max(0.0) as u32
}

/// Convert dots per inch to dots per metre.
pub fn dpi_to_dpm(dpi: u32) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}
