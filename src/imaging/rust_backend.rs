//! Pure Rust file backend.
//!
//! Everything is statically linked into the binary; see the
//! [`codec`](super::codec) module for the crate behind each format.

use super::backend::{ImageBackend, ImagingError};
use super::handle::Image;
use super::params::EncodeOptions;
use image::ImageFormat;
use std::path::Path;
use std::sync::LazyLock;

/// Input extensions paired with the `image` format that decodes them.
///
/// AVIF is left out: the `"avif"` feature of `image` only enables the
/// encoder, yet `ImageFormat::reading_enabled()` reports `true` for it.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
    ("pnm", ImageFormat::Pnm),
    ("ppm", ImageFormat::Pnm),
    ("pgm", ImageFormat::Pnm),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Production backend: reads and writes through [`Image`].
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode_file(&self, path: &Path) -> Result<Image, ImagingError> {
        let mut image = Image::new();
        image.decode_file(path)?;
        Ok(image)
    }

    fn encode_file(
        &self,
        image: &Image,
        path: &Path,
        options: &EncodeOptions,
    ) -> Result<(), ImagingError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        image.encode_file_with(path, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Codec, Compression, Quality};
    use image::{DynamicImage, ImageEncoder, RgbImage};

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "ppm"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
        assert!(!exts.contains(&"avif"));
    }

    #[test]
    fn supported_input_ignores_case() {
        assert!(is_supported_input(Path::new("scan.TIF")));
        assert!(!is_supported_input(Path::new("notes.txt")));
        assert!(!is_supported_input(Path::new("photo.avif")));
        assert!(!is_supported_input(Path::new("README")));
    }

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let image = RustBackend::new().decode_file(&path).unwrap();
        assert_eq!(image.width(), 200);
        assert_eq!(image.height(), 150);
        assert_eq!(image.codec(), Some(Codec::Jpeg));
    }

    #[test]
    fn decode_nonexistent_file_errors() {
        let result = RustBackend::new().decode_file(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(ImagingError::Io(_))));
    }

    #[test]
    fn encode_creates_parent_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/deeper/out.png");

        let image = Image::from_dynamic(DynamicImage::new_rgb8(12, 8));
        RustBackend::new()
            .encode_file(&image, &path, &EncodeOptions::default())
            .unwrap();

        let back = RustBackend::new().decode_file(&path).unwrap();
        assert_eq!((back.width(), back.height()), (12, 8));
        assert_eq!(back.codec(), Some(Codec::Png));
    }

    #[test]
    fn codec_override_beats_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually-a-tiff.jpg");

        RustBackend::new()
            .encode_file(
                &Image::blank(4, 4),
                &path,
                &EncodeOptions {
                    codec: Some(Codec::Tiff),
                    quality: Quality::default(),
                    compression: Compression::None,
                },
            )
            .unwrap();

        let back = RustBackend::new().decode_file(&path).unwrap();
        assert_eq!(back.codec(), Some(Codec::Tiff));
    }

    #[test]
    fn encode_without_extension_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = RustBackend::new().encode_file(
            &Image::blank(4, 4),
            &tmp.path().join("no_extension"),
            &EncodeOptions::default(),
        );
        assert!(matches!(result, Err(ImagingError::UnsupportedCodec(_))));
    }
}
