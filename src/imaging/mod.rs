//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with sniffed format |
//! | **Resolution** | JFIF / pHYs / TIFF tag / BMP header readers |
//! | **Encode** | `image` encoders, `tiff` and `png` crates for metadata |
//! | **Scale** | `image::imageops` filters + box resampler on rayon |
//! | **Rotate** | `DynamicImage::rotate90..270`, `imageproc` for free angles |
//! | **Adjust** | invert, normalize, brightness/contrast/gamma, HSL |
//!
//! The module is split into:
//! - **Handle**: [`Image`], the owned image plus resolution metadata
//! - **Calculations**: Pure functions for dimension and angle math (unit testable)
//! - **Parameters**: [`Quality`], [`Compression`], [`Codec`]
//! - **Codec / Resolution**: bytes ⇄ pixels
//! - **Transforms**: scale, rotate, adjust
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

mod pixels;

mod adjust;
pub mod backend;
pub mod calculations;
pub mod codec;
mod color;
mod handle;
mod params;
pub mod resolution;
mod rotate;
pub mod rust_backend;
mod scale;

pub use backend::{ImageBackend, ImagingError};
pub use color::{Color, Colorspace};
pub use handle::{Image, ImageInfo};
pub use params::{Codec, Compression, EncodeOptions, Quality};
pub use rust_backend::RustBackend;
pub use scale::ScaleFilter;
