//! # rasterkit
//!
//! Decode, inspect, transform and re-encode raster images. The core is an
//! owned image handle, [`imaging::Image`]: decode into it from a file or a
//! byte buffer, read and set its properties, rotate and scale it, and encode
//! it back out to a file or to memory.
//!
//! ```text
//! let mut image = Image::new();
//! image.decode_file("scan.tif")?;          // TIFF, JPEG, PNG, WebP, BMP, PNM
//! image.set_x_resolution(144);
//! image.rotate(90.0, Color::BLACK);
//! image.scale(4.0, None)?;
//! image.box_scale(0.5, None)?;
//! let jpeg = image.encode("jpeg", Quality::new(80), Compression::Default)?;
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The image handle, codecs, resolution metadata, scale/rotate/adjust |
//! | [`steps`] | Textual transform steps (`rotate 90`, `box-scale 0.5`) parsed and applied in order |
//! | [`config`] | `config.toml` loading, merging onto stock defaults, validation |
//! | [`demo`] | The decode → inspect → transform → encode walkthrough on two TIFFs |
//! | [`batch`] | Parallel conversion of a directory tree |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Everything goes through the `image` crate and its pure-Rust codecs, with
//! `tiff` and `png` used directly where resolution metadata or compression
//! choice is not exposed by `image`. Free-angle rotation uses `imageproc`.
//! No system libraries are needed.
//!
//! ## Errors Are Values
//!
//! Every fallible handle operation returns `Result<_, ImagingError>`. A
//! failed decode leaves the handle unchanged. Callers like [`demo`] stop at
//! the first error and report which step failed.
//!
//! ## Resolution Follows Geometry
//!
//! Scaling multiplies the stored resolution by the scale factor, so the
//! physical size is preserved. Quarter-turn rotations swap x and y
//! resolution.

pub mod batch;
pub mod config;
pub mod demo;
pub mod imaging;
pub mod output;
pub mod steps;
