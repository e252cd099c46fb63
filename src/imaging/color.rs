//! Colors and pixel layouts.
//!
//! - [`Color`]: unit-float RGBA, used for fills, rotation background and
//!   single-pixel access.
//! - [`Colorspace`]: the named pixel layouts an [`Image`](super::Image) can
//!   hold (`gray8`, `rgb16`, `rgba32f`, ...).

use image::{ColorType, DynamicImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::backend::ImagingError;

/// RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    /// Components are clamped to `[0, 1]`; NaN becomes 0.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        let c = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            r: c(r),
            g: c(g),
            b: c(b),
            a: c(a),
        }
    }

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Rec. 601 luma.
    pub fn luminance(&self) -> f64 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    pub(crate) fn to_unit_rgba(self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }

    pub(crate) fn from_unit_rgba(rgba: [f32; 4]) -> Self {
        Self::new(rgba[0] as f64, rgba[1] as f64, rgba[2] as f64, rgba[3] as f64)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<[f64; 4]> for Color {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Color> for [f64; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// Pixel layout: channel set plus sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Colorspace {
    Gray8,
    Gray16,
    GrayAlpha8,
    GrayAlpha16,
    Rgb8,
    Rgb16,
    Rgba8,
    Rgba16,
    Rgb32F,
    Rgba32F,
}

impl Colorspace {
    pub const ALL: [Colorspace; 10] = [
        Colorspace::Gray8,
        Colorspace::Gray16,
        Colorspace::GrayAlpha8,
        Colorspace::GrayAlpha16,
        Colorspace::Rgb8,
        Colorspace::Rgb16,
        Colorspace::Rgba8,
        Colorspace::Rgba16,
        Colorspace::Rgb32F,
        Colorspace::Rgba32F,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colorspace::Gray8 => "gray8",
            Colorspace::Gray16 => "gray16",
            Colorspace::GrayAlpha8 => "graya8",
            Colorspace::GrayAlpha16 => "graya16",
            Colorspace::Rgb8 => "rgb8",
            Colorspace::Rgb16 => "rgb16",
            Colorspace::Rgba8 => "rgba8",
            Colorspace::Rgba16 => "rgba16",
            Colorspace::Rgb32F => "rgb32f",
            Colorspace::Rgba32F => "rgba32f",
        }
    }

    /// Samples per pixel.
    pub fn channels(self) -> u8 {
        match self {
            Colorspace::Gray8 | Colorspace::Gray16 => 1,
            Colorspace::GrayAlpha8 | Colorspace::GrayAlpha16 => 2,
            Colorspace::Rgb8 | Colorspace::Rgb16 | Colorspace::Rgb32F => 3,
            Colorspace::Rgba8 | Colorspace::Rgba16 | Colorspace::Rgba32F => 4,
        }
    }

    /// Bits per sample.
    pub fn depth(self) -> u8 {
        match self {
            Colorspace::Gray8 | Colorspace::GrayAlpha8 | Colorspace::Rgb8 | Colorspace::Rgba8 => {
                8
            }
            Colorspace::Gray16
            | Colorspace::GrayAlpha16
            | Colorspace::Rgb16
            | Colorspace::Rgba16 => 16,
            Colorspace::Rgb32F | Colorspace::Rgba32F => 32,
        }
    }

    /// Layout for a channel count and bit depth, if one exists.
    pub fn from_channels_and_depth(channels: u8, depth: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cs| cs.channels() == channels && cs.depth() == depth)
    }

    /// Layout of a decoded image. Layouts this crate does not model map to
    /// the nearest wider one.
    pub fn of(image: &DynamicImage) -> Self {
        match image.color() {
            ColorType::L8 => Colorspace::Gray8,
            ColorType::L16 => Colorspace::Gray16,
            ColorType::La8 => Colorspace::GrayAlpha8,
            ColorType::La16 => Colorspace::GrayAlpha16,
            ColorType::Rgb8 => Colorspace::Rgb8,
            ColorType::Rgb16 => Colorspace::Rgb16,
            ColorType::Rgba8 => Colorspace::Rgba8,
            ColorType::Rgba16 => Colorspace::Rgba16,
            ColorType::Rgb32F => Colorspace::Rgb32F,
            _ => Colorspace::Rgba32F,
        }
    }

    /// Convert pixels into this layout.
    pub fn convert(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Colorspace::Gray8 => DynamicImage::ImageLuma8(image.to_luma8()),
            Colorspace::Gray16 => DynamicImage::ImageLuma16(image.to_luma16()),
            Colorspace::GrayAlpha8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
            Colorspace::GrayAlpha16 => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
            Colorspace::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
            Colorspace::Rgb16 => DynamicImage::ImageRgb16(image.to_rgb16()),
            Colorspace::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
            Colorspace::Rgba16 => DynamicImage::ImageRgba16(image.to_rgba16()),
            Colorspace::Rgb32F => DynamicImage::ImageRgb32F(image.to_rgb32f()),
            Colorspace::Rgba32F => DynamicImage::ImageRgba32F(image.to_rgba32f()),
        }
    }

    /// Allocate a zeroed buffer of this layout.
    pub fn blank(self, width: u32, height: u32) -> DynamicImage {
        match self {
            Colorspace::Gray8 => DynamicImage::new_luma8(width, height),
            Colorspace::Gray16 => DynamicImage::new_luma16(width, height),
            Colorspace::GrayAlpha8 => DynamicImage::new_luma_a8(width, height),
            Colorspace::GrayAlpha16 => DynamicImage::new_luma_a16(width, height),
            Colorspace::Rgb8 => DynamicImage::new_rgb8(width, height),
            Colorspace::Rgb16 => DynamicImage::new_rgb16(width, height),
            Colorspace::Rgba8 => DynamicImage::new_rgba8(width, height),
            Colorspace::Rgba16 => DynamicImage::new_rgba16(width, height),
            Colorspace::Rgb32F => DynamicImage::new_rgb32f(width, height),
            Colorspace::Rgba32F => DynamicImage::new_rgba32f(width, height),
        }
    }
}

impl fmt::Display for Colorspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colorspace {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "gray" | "grey" => return Ok(Colorspace::Gray8),
            "rgb" => return Ok(Colorspace::Rgb8),
            "rgba" => return Ok(Colorspace::Rgba8),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|cs| cs.name() == name)
            .ok_or_else(|| ImagingError::UnsupportedColorspace(s.to_string()))
    }
}

impl TryFrom<String> for Colorspace {
    type Error = ImagingError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Colorspace> for String {
    fn from(cs: Colorspace) -> Self {
        cs.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_clamps_components() {
        let c = Color::new(-1.0, 0.5, 2.0, f64::NAN);
        assert_eq!(c, Color::new(0.0, 0.5, 1.0, 0.0));
    }

    #[test]
    fn color_deserializes_from_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            background: Color,
        }
        let w: Wrapper = toml::from_str("background = [1.0, 0.0, 0.0, 0.5]").unwrap();
        assert_eq!(w.background, Color::new(1.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn luminance_of_white_is_one() {
        assert!((Color::WHITE.luminance() - 1.0).abs() < 1e-9);
        assert_eq!(Color::BLACK.luminance(), 0.0);
    }

    #[test]
    fn colorspace_names_roundtrip() {
        for cs in Colorspace::ALL {
            assert_eq!(cs.name().parse::<Colorspace>().unwrap(), cs);
        }
    }

    #[test]
    fn colorspace_aliases() {
        assert_eq!("GRAY".parse::<Colorspace>().unwrap(), Colorspace::Gray8);
        assert_eq!("rgb".parse::<Colorspace>().unwrap(), Colorspace::Rgb8);
        assert_eq!(" rgba ".parse::<Colorspace>().unwrap(), Colorspace::Rgba8);
    }

    #[test]
    fn unknown_colorspace_errors() {
        assert!(matches!(
            "cmyk8".parse::<Colorspace>(),
            Err(ImagingError::UnsupportedColorspace(name)) if name == "cmyk8"
        ));
    }

    #[test]
    fn channels_and_depth_lookup() {
        assert_eq!(
            Colorspace::from_channels_and_depth(3, 16),
            Some(Colorspace::Rgb16)
        );
        assert_eq!(
            Colorspace::from_channels_and_depth(4, 32),
            Some(Colorspace::Rgba32F)
        );
        assert_eq!(Colorspace::from_channels_and_depth(1, 32), None);
        assert_eq!(Colorspace::from_channels_and_depth(5, 8), None);
    }

    #[test]
    fn convert_changes_layout() {
        let img = DynamicImage::new_rgb8(4, 2);
        let gray = Colorspace::Gray16.convert(&img);
        assert_eq!(Colorspace::of(&gray), Colorspace::Gray16);
        assert_eq!((gray.width(), gray.height()), (4, 2));
    }
}
