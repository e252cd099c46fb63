//! Encoded-bytes ⇄ pixels.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, PNM) | `image::ImageReader` with sniffed format |
//! | Resolution on decode | [`resolution`](super::resolution) readers |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` + JFIF pixel density |
//! | Encode → PNG | `png::Encoder` (for the `pHYs` chunk and compression level) |
//! | Encode → TIFF | `tiff::encoder::TiffEncoder` (compression + resolution tags) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → BMP / PNM | `image::codecs::{bmp, pnm}` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! Encoders only accept some layouts; pixels are converted to the closest
//! layout the encoder takes before writing.

use super::backend::ImagingError;
use super::calculations::dpi_to_dpm;
use super::params::{Codec, Compression, Quality};
use super::resolution::{Dpi, read_resolution};
use image::codecs::jpeg::{JpegEncoder, PixelDensity, PixelDensityUnit};
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tiff::encoder::colortype::{self, ColorType as TiffColorType};
use tiff::encoder::compression::{
    Compression as TiffCompression, Deflate, Lzw, Packbits, Uncompressed,
};
use tiff::encoder::{Rational, TiffEncoder, TiffValue};
use tiff::tags::ResolutionUnit;
use tracing::debug;

/// Pixels plus what the container said about them.
#[derive(Debug)]
pub struct Decoded {
    pub pixels: DynamicImage,
    pub codec: Codec,
    pub resolution: Option<Dpi>,
}

/// Decode an in-memory image, sniffing the format from its magic bytes.
pub fn decode(data: &[u8]) -> Result<Decoded, ImagingError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| ImagingError::UnsupportedCodec("unrecognized image data".into()))?;
    let codec = Codec::from_image_format(format)
        .ok_or_else(|| ImagingError::UnsupportedCodec(format!("{format:?}")))?;
    if !codec.can_decode() {
        return Err(ImagingError::UnsupportedCodec(format!(
            "{codec} decoding is not available"
        )));
    }

    let pixels = reader
        .decode()
        .map_err(|e| ImagingError::Decode(format!("{codec}: {e}")))?;
    let resolution = read_resolution(codec, data);
    debug!(
        %codec,
        width = pixels.width(),
        height = pixels.height(),
        ?resolution,
        "decoded"
    );

    Ok(Decoded {
        pixels,
        codec,
        resolution,
    })
}

/// Encode pixels into `codec`.
///
/// `resolution` is written by the codecs that can carry it (JPEG, PNG,
/// TIFF) when both axes are known.
pub fn encode(
    pixels: &DynamicImage,
    resolution: Dpi,
    codec: Codec,
    quality: Quality,
    compression: Compression,
) -> Result<Vec<u8>, ImagingError> {
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ImagingError::InvalidArgument(
            "cannot encode an empty image".into(),
        ));
    }
    let resolution = (resolution.0 > 0 && resolution.1 > 0).then_some(resolution);

    let bytes = match codec {
        Codec::Jpeg => encode_jpeg(pixels, resolution, quality)?,
        Codec::Png => encode_png(pixels, resolution, compression)?,
        Codec::Tiff => encode_tiff(pixels, resolution, compression)?,
        Codec::Webp => encode_webp(pixels)?,
        Codec::Bmp => encode_bmp(pixels)?,
        Codec::Pnm => encode_pnm(pixels)?,
        Codec::Avif => encode_avif(pixels, quality)?,
    };

    if !matches!(codec, Codec::Png | Codec::Tiff) && compression != Compression::Default {
        debug!(%codec, compression = compression.name(), "compression ignored by codec");
    }
    debug!(%codec, bytes = bytes.len(), "encoded");
    Ok(bytes)
}

fn encode_failed(codec: Codec, err: impl std::fmt::Display) -> ImagingError {
    ImagingError::Encode(format!("{codec}: {err}"))
}

fn has_alpha(pixels: &DynamicImage) -> bool {
    pixels.color().has_alpha()
}

fn is_gray(pixels: &DynamicImage) -> bool {
    !pixels.color().has_color()
}

fn is_8bit(pixels: &DynamicImage) -> bool {
    pixels.color().bytes_per_pixel() / pixels.color().channel_count() == 1
}

/// Reduce to an 8-bit layout without alpha (gray stays gray).
fn to_opaque_8bit(pixels: &DynamicImage) -> DynamicImage {
    if is_gray(pixels) {
        DynamicImage::ImageLuma8(pixels.to_luma8())
    } else {
        DynamicImage::ImageRgb8(pixels.to_rgb8())
    }
}

/// Reduce to 8-bit RGB or RGBA depending on alpha.
fn to_rgb_family_8bit(pixels: &DynamicImage) -> DynamicImage {
    if has_alpha(pixels) {
        DynamicImage::ImageRgba8(pixels.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(pixels.to_rgb8())
    }
}

// ---------------------------------------------------------------------------
// JPEG
// ---------------------------------------------------------------------------

fn encode_jpeg(
    pixels: &DynamicImage,
    resolution: Option<Dpi>,
    quality: Quality,
) -> Result<Vec<u8>, ImagingError> {
    let converted;
    let source = if is_8bit(pixels) && !has_alpha(pixels) {
        pixels
    } else {
        converted = to_opaque_8bit(pixels);
        &converted
    };

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.value());
    if let Some((x, y)) = resolution {
        encoder.set_pixel_density(PixelDensity {
            density: (clamp_u16(x), clamp_u16(y)),
            unit: PixelDensityUnit::Inches,
        });
    }
    source
        .write_with_encoder(encoder)
        .map_err(|e| encode_failed(Codec::Jpeg, e))?;
    Ok(buffer)
}

fn clamp_u16(v: u32) -> u16 {
    v.min(u16::MAX as u32) as u16
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

fn encode_png(
    pixels: &DynamicImage,
    resolution: Option<Dpi>,
    compression: Compression,
) -> Result<Vec<u8>, ImagingError> {
    let gray = is_gray(pixels);
    let alpha = has_alpha(pixels);
    let color = match (gray, alpha) {
        (true, false) => png::ColorType::Grayscale,
        (true, true) => png::ColorType::GrayscaleAlpha,
        (false, false) => png::ColorType::Rgb,
        (false, true) => png::ColorType::Rgba,
    };

    // PNG stores 16-bit samples big-endian; floats go through 16 bits.
    let (depth, data): (png::BitDepth, Vec<u8>) = if is_8bit(pixels) {
        (png::BitDepth::Eight, pixels.as_bytes().to_vec())
    } else {
        let samples: Vec<u16> = match (gray, alpha) {
            (true, false) => pixels.to_luma16().into_raw(),
            (true, true) => pixels.to_luma_alpha16().into_raw(),
            (false, false) => pixels.to_rgb16().into_raw(),
            (false, true) => pixels.to_rgba16().into_raw(),
        };
        (
            png::BitDepth::Sixteen,
            samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
        )
    };

    let level = match compression {
        Compression::Fast | Compression::None => png::Compression::Fast,
        Compression::Best => png::Compression::Best,
        _ => png::Compression::Default,
    };

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, pixels.width(), pixels.height());
        encoder.set_color(color);
        encoder.set_depth(depth);
        encoder.set_compression(level);
        if let Some((x, y)) = resolution {
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: dpi_to_dpm(x),
                yppu: dpi_to_dpm(y),
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| encode_failed(Codec::Png, e))?;
        writer
            .write_image_data(&data)
            .map_err(|e| encode_failed(Codec::Png, e))?;
        writer.finish().map_err(|e| encode_failed(Codec::Png, e))?;
    }
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// TIFF
// ---------------------------------------------------------------------------

fn encode_tiff(
    pixels: &DynamicImage,
    resolution: Option<Dpi>,
    compression: Compression,
) -> Result<Vec<u8>, ImagingError> {
    match compression {
        Compression::None => write_tiff(pixels, resolution, Uncompressed),
        Compression::Deflate => write_tiff(pixels, resolution, Deflate::default()),
        Compression::PackBits => write_tiff(pixels, resolution, Packbits),
        Compression::Default | Compression::Lzw => write_tiff(pixels, resolution, Lzw),
        Compression::Fast | Compression::Best => {
            debug!(
                compression = compression.name(),
                "not a TIFF compression, using LZW"
            );
            write_tiff(pixels, resolution, Lzw)
        }
    }
}

fn write_tiff<D>(
    pixels: &DynamicImage,
    resolution: Option<Dpi>,
    compression: D,
) -> Result<Vec<u8>, ImagingError>
where
    D: TiffCompression,
{
    let (w, h) = (pixels.width(), pixels.height());
    let mut buffer = Vec::new();
    {
        let mut encoder =
            TiffEncoder::new(Cursor::new(&mut buffer)).map_err(|e| encode_failed(Codec::Tiff, e))?;
        macro_rules! plane {
            ($color:ty, $data:expr) => {
                write_tiff_plane::<$color, _, _>(&mut encoder, w, h, $data, resolution, compression)
            };
        }
        match pixels {
            DynamicImage::ImageLuma8(buf) => plane!(colortype::Gray8, buf.as_raw()),
            DynamicImage::ImageLuma16(buf) => plane!(colortype::Gray16, buf.as_raw()),
            DynamicImage::ImageRgb8(buf) => plane!(colortype::RGB8, buf.as_raw()),
            DynamicImage::ImageRgb16(buf) => plane!(colortype::RGB16, buf.as_raw()),
            DynamicImage::ImageRgba8(buf) => plane!(colortype::RGBA8, buf.as_raw()),
            DynamicImage::ImageRgba16(buf) => plane!(colortype::RGBA16, buf.as_raw()),
            DynamicImage::ImageRgb32F(buf) => plane!(colortype::RGB32Float, buf.as_raw()),
            DynamicImage::ImageRgba32F(buf) => plane!(colortype::RGBA32Float, buf.as_raw()),
            // Gray+alpha has no layout in the TIFF encoder
            DynamicImage::ImageLumaA16(_) => plane!(colortype::RGBA16, pixels.to_rgba16().as_raw()),
            other => plane!(colortype::RGBA8, other.to_rgba8().as_raw()),
        }?;
    }
    Ok(buffer)
}

fn write_tiff_plane<C, W, D>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    resolution: Option<Dpi>,
    compression: D,
) -> Result<(), ImagingError>
where
    C: TiffColorType,
    W: std::io::Write + std::io::Seek,
    D: TiffCompression,
    [C::Inner]: TiffValue,
{
    let mut image = encoder
        .new_image_with_compression::<C, D>(width, height, compression)
        .map_err(|e| encode_failed(Codec::Tiff, e))?;
    if let Some((x, y)) = resolution {
        image.resolution_unit(ResolutionUnit::Inch);
        image.x_resolution(Rational { n: x, d: 1 });
        image.y_resolution(Rational { n: y, d: 1 });
    }
    image
        .write_data(data)
        .map_err(|e| encode_failed(Codec::Tiff, e))
}

// ---------------------------------------------------------------------------
// WebP, BMP, PNM, AVIF
// ---------------------------------------------------------------------------

fn encode_webp(pixels: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let source = to_rgb_family_8bit(pixels);
    let mut buffer = Vec::new();
    let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut buffer);
    source
        .write_with_encoder(encoder)
        .map_err(|e| encode_failed(Codec::Webp, e))?;
    Ok(buffer)
}

fn encode_bmp(pixels: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let source = match pixels {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            pixels.clone()
        }
        other if is_gray(other) && !has_alpha(other) => DynamicImage::ImageLuma8(other.to_luma8()),
        other => to_rgb_family_8bit(other),
    };
    let mut buffer = Vec::new();
    let encoder = image::codecs::bmp::BmpEncoder::new(&mut buffer);
    source
        .write_with_encoder(encoder)
        .map_err(|e| encode_failed(Codec::Bmp, e))?;
    Ok(buffer)
}

fn encode_pnm(pixels: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let source = match (is_gray(pixels), is_8bit(pixels)) {
        (true, true) => DynamicImage::ImageLuma8(pixels.to_luma8()),
        (true, false) => DynamicImage::ImageLuma16(pixels.to_luma16()),
        (false, true) => DynamicImage::ImageRgb8(pixels.to_rgb8()),
        (false, false) => DynamicImage::ImageRgb16(pixels.to_rgb16()),
    };
    let mut buffer = Vec::new();
    let encoder = image::codecs::pnm::PnmEncoder::new(&mut buffer);
    source
        .write_with_encoder(encoder)
        .map_err(|e| encode_failed(Codec::Pnm, e))?;
    Ok(buffer)
}

fn encode_avif(pixels: &DynamicImage, quality: Quality) -> Result<Vec<u8>, ImagingError> {
    let source = to_rgb_family_8bit(pixels);
    let mut buffer = Vec::new();
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut buffer, 6, quality.value());
    source
        .write_with_encoder(encoder)
        .map_err(|e| encode_failed(Codec::Avif, e))?;
    Ok(buffer)
}
