//! Parameter types for encoding.
//!
//! These describe *what* to write, not *how*. The [`codec`](super::codec)
//! module turns them into concrete encoder calls.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 75). Clamped on construction.
//! - [`Compression`]: Lossless compression choice for TIFF and PNG.
//! - [`Codec`]: A named file format, resolved from a name or a file extension.
//! - [`EncodeOptions`]: Codec override, quality and compression bundled for backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::backend::ImagingError;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0 as u32
    }
}

/// Lossless compression choice.
///
/// Only TIFF and PNG look at it; other codecs ignore the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Compression {
    #[default]
    Default,
    None,
    Lzw,
    Deflate,
    PackBits,
    Fast,
    Best,
}

impl Compression {
    pub fn name(self) -> &'static str {
        match self {
            Compression::Default => "",
            Compression::None => "none",
            Compression::Lzw => "lzw",
            Compression::Deflate => "deflate",
            Compression::PackBits => "packbits",
            Compression::Fast => "fast",
            Compression::Best => "best",
        }
    }
}

impl FromStr for Compression {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(Compression::Default),
            "none" => Ok(Compression::None),
            "lzw" => Ok(Compression::Lzw),
            "deflate" | "zip" => Ok(Compression::Deflate),
            "packbits" => Ok(Compression::PackBits),
            "fast" => Ok(Compression::Fast),
            "best" => Ok(Compression::Best),
            _ => Err(ImagingError::InvalidArgument(format!(
                "unknown compression '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for Compression {
    type Error = ImagingError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Compression> for String {
    fn from(c: Compression) -> Self {
        c.name().to_string()
    }
}

/// A file format this crate can encode (and mostly decode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Codec {
    Jpeg,
    Png,
    Tiff,
    Webp,
    Bmp,
    Pnm,
    Avif,
}

/// Name/extension table. The first entry per codec is its canonical name.
const CODEC_NAMES: &[(&str, Codec)] = &[
    ("jpeg", Codec::Jpeg),
    ("jpg", Codec::Jpeg),
    ("jpe", Codec::Jpeg),
    ("png", Codec::Png),
    ("tiff", Codec::Tiff),
    ("tif", Codec::Tiff),
    ("webp", Codec::Webp),
    ("bmp", Codec::Bmp),
    ("pnm", Codec::Pnm),
    ("ppm", Codec::Pnm),
    ("pgm", Codec::Pnm),
    ("avif", Codec::Avif),
];

impl Codec {
    pub fn from_name(name: &str) -> Result<Self, ImagingError> {
        let lower = name.trim().to_ascii_lowercase();
        CODEC_NAMES
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, c)| *c)
            .ok_or_else(|| ImagingError::UnsupportedCodec(name.to_string()))
    }

    /// Resolve from a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Result<Self, ImagingError> {
        Self::from_name(ext.strip_prefix('.').unwrap_or(ext))
    }

    /// Resolve from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ImagingError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ImagingError::UnsupportedCodec(format!("no file extension on {}", path.display()))
        })?;
        Self::from_extension(ext)
    }

    pub fn name(self) -> &'static str {
        CODEC_NAMES
            .iter()
            .find(|(_, c)| *c == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// Preferred extension for output files.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Jpeg => "jpg",
            Codec::Tiff => "tif",
            Codec::Pnm => "pnm",
            other => other.name(),
        }
    }

    /// AVIF is encode-only.
    pub fn can_decode(self) -> bool {
        !matches!(self, Codec::Avif)
    }

    pub(crate) fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        use image::ImageFormat;
        match format {
            ImageFormat::Jpeg => Some(Codec::Jpeg),
            ImageFormat::Png => Some(Codec::Png),
            ImageFormat::Tiff => Some(Codec::Tiff),
            ImageFormat::WebP => Some(Codec::Webp),
            ImageFormat::Bmp => Some(Codec::Bmp),
            ImageFormat::Pnm => Some(Codec::Pnm),
            ImageFormat::Avif => Some(Codec::Avif),
            _ => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<String> for Codec {
    type Error = ImagingError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_name(&s)
    }
}

impl From<Codec> for String {
    fn from(c: Codec) -> Self {
        c.name().to_string()
    }
}

/// Everything an encoder needs besides the pixels.
///
/// `codec: None` means "derive from the output path".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub codec: Option<Codec>,
    pub quality: Quality,
    pub compression: Compression,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(80).value(), 80);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_75() {
        assert_eq!(Quality::default().value(), 75);
    }

    #[test]
    fn compression_parses_names_and_aliases() {
        assert_eq!("".parse::<Compression>().unwrap(), Compression::Default);
        assert_eq!("LZW".parse::<Compression>().unwrap(), Compression::Lzw);
        assert_eq!("zip".parse::<Compression>().unwrap(), Compression::Deflate);
        assert_eq!(
            "packbits".parse::<Compression>().unwrap(),
            Compression::PackBits
        );
        assert!("g4".parse::<Compression>().is_err());
    }

    #[test]
    fn codec_from_name_is_case_insensitive() {
        assert_eq!(Codec::from_name("JPEG").unwrap(), Codec::Jpeg);
        assert_eq!(Codec::from_name("jpg").unwrap(), Codec::Jpeg);
        assert_eq!(Codec::from_name("Tif").unwrap(), Codec::Tiff);
        assert!(matches!(
            Codec::from_name("gif"),
            Err(ImagingError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn codec_from_path_uses_extension() {
        assert_eq!(Codec::from_path(Path::new("out/test.jpg")).unwrap(), Codec::Jpeg);
        assert_eq!(Codec::from_path(Path::new("a.PPM")).unwrap(), Codec::Pnm);
        assert!(Codec::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn codec_from_extension_strips_dot() {
        assert_eq!(Codec::from_extension(".tif").unwrap(), Codec::Tiff);
        assert_eq!(Codec::from_extension("webp").unwrap(), Codec::Webp);
    }

    #[test]
    fn codec_canonical_names() {
        assert_eq!(Codec::Jpeg.name(), "jpeg");
        assert_eq!(Codec::Jpeg.extension(), "jpg");
        assert_eq!(Codec::Tiff.name(), "tiff");
        assert_eq!(Codec::Webp.extension(), "webp");
    }

    #[test]
    fn avif_is_encode_only() {
        assert!(!Codec::Avif.can_decode());
        assert!(Codec::Tiff.can_decode());
    }
}
