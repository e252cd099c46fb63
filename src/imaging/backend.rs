//! Imaging error type and the file-level backend trait.
//!
//! The [`ImageBackend`] trait covers the two operations that touch the
//! filesystem: decode a file into an [`Image`] and encode an [`Image`] into a
//! file. Batch processing talks to the trait so tests can substitute a
//! recording mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::handle::Image;
use super::params::EncodeOptions;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decoding failed: {0}")]
    Decode(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("Unsupported colorspace: {0}")]
    UnsupportedColorspace(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Pixel ({x}, {y}) outside {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// Trait for file-level image backends.
pub trait ImageBackend: Sync {
    /// Decode the file at `path` into a fresh image.
    fn decode_file(&self, path: &Path) -> Result<Image, ImagingError>;

    /// Encode `image` into `path`.
    fn encode_file(
        &self,
        image: &Image,
        path: &Path,
        options: &EncodeOptions,
    ) -> Result<(), ImagingError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::{Codec, Quality};
    use std::sync::Mutex;

    /// Mock backend that records operations without touching the disk.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<Image>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Encode {
            output: String,
            width: u32,
            height: u32,
            codec: Option<Codec>,
            quality: u8,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every decode pops one of `images`; when empty, decodes fail.
        pub fn with_images(images: Vec<Image>) -> Self {
            Self {
                decode_results: Mutex::new(images),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode_file(&self, path: &Path) -> Result<Image, ImagingError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));

            self.decode_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ImagingError::Decode("No mock image".to_string()))
        }

        fn encode_file(
            &self,
            image: &Image,
            path: &Path,
            options: &EncodeOptions,
        ) -> Result<(), ImagingError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                output: path.to_string_lossy().to_string(),
                width: image.width(),
                height: image.height(),
                codec: options.codec,
                quality: options.quality.value(),
            });
            Ok(())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_images(vec![Image::blank(8, 6)]);

        let image = backend.decode_file(Path::new("/test/image.tif")).unwrap();
        assert_eq!(image.width(), 8);
        assert_eq!(image.height(), 6);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/test/image.tif"));
    }

    #[test]
    fn mock_decode_fails_when_exhausted() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.decode_file(Path::new("/missing.tif")),
            Err(ImagingError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();

        backend
            .encode_file(
                &Image::blank(40, 30),
                Path::new("/out/test.jpg"),
                &EncodeOptions {
                    codec: Some(Codec::Jpeg),
                    quality: Quality::new(80),
                    ..Default::default()
                },
            )
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                width: 40,
                height: 30,
                codec: Some(Codec::Jpeg),
                quality: 80,
                ..
            }
        ));
    }

    #[test]
    fn out_of_bounds_message_names_pixel() {
        let err = ImagingError::OutOfBounds {
            x: 5,
            y: 1,
            width: 4,
            height: 4,
        };
        assert_eq!(err.to_string(), "Pixel (5, 1) outside 4x4 image");
    }
}
