//! Sample conversion and pixel-layout dispatch.
//!
//! `DynamicImage` is an enum over concrete `ImageBuffer` types. Most
//! transforms here are written once, generic over the pixel type, and the
//! macros below expand a call for every layout the crate supports.

use image::Pixel;

/// A channel sample that can round-trip through a unit float.
pub trait Sample: Copy + Send + Sync {
    fn to_unit(self) -> f32;
    fn from_unit(v: f32) -> Self;
}

impl Sample for u8 {
    #[inline]
    fn to_unit(self) -> f32 {
        self as f32 / 255.0
    }

    #[inline]
    fn from_unit(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl Sample for u16 {
    #[inline]
    fn to_unit(self) -> f32 {
        self as f32 / 65535.0
    }

    #[inline]
    fn from_unit(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 65535.0).round() as u16
    }
}

impl Sample for f32 {
    #[inline]
    fn to_unit(self) -> f32 {
        self
    }

    #[inline]
    fn from_unit(v: f32) -> Self {
        v
    }
}

/// Whether the pixel type carries a trailing alpha channel.
pub fn has_alpha<P: Pixel>() -> bool {
    P::CHANNEL_COUNT == 2 || P::CHANNEL_COUNT == 4
}

/// Number of color (non-alpha) channels of the pixel type.
pub fn color_channels<P: Pixel>() -> usize {
    if has_alpha::<P>() {
        P::CHANNEL_COUNT as usize - 1
    } else {
        P::CHANNEL_COUNT as usize
    }
}

/// Build a pixel from unit-float RGBA, collapsing to luma for gray layouts.
pub fn pixel_from_rgba<P>(rgba: [f32; 4]) -> P
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let [r, g, b, a] = rgba;
    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
    let channels: Vec<P::Subpixel> = match P::CHANNEL_COUNT {
        1 => vec![Sample::from_unit(luma)],
        2 => vec![Sample::from_unit(luma), Sample::from_unit(a)],
        3 => vec![
            Sample::from_unit(r),
            Sample::from_unit(g),
            Sample::from_unit(b),
        ],
        _ => vec![
            Sample::from_unit(r),
            Sample::from_unit(g),
            Sample::from_unit(b),
            Sample::from_unit(a),
        ],
    };
    *P::from_slice(&channels)
}

/// Read a pixel as unit-float RGBA; gray layouts are replicated, missing
/// alpha reads as opaque.
pub fn pixel_to_rgba<P>(pixel: &P) -> [f32; 4]
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let c = pixel.channels();
    match c.len() {
        1 => {
            let v = c[0].to_unit();
            [v, v, v, 1.0]
        }
        2 => {
            let v = c[0].to_unit();
            [v, v, v, c[1].to_unit()]
        }
        3 => [c[0].to_unit(), c[1].to_unit(), c[2].to_unit(), 1.0],
        _ => [
            c[0].to_unit(),
            c[1].to_unit(),
            c[2].to_unit(),
            c[3].to_unit(),
        ],
    }
}

/// Run `$body` with `$buf` bound to the concrete buffer inside `$img`.
///
/// Works for both `&DynamicImage` and `&mut DynamicImage`. Layouts added to
/// `image` after this crate was written evaluate to `$fallback`.
macro_rules! with_buffer {
    ($img:expr, $buf:ident => $body:expr, _ => $fallback:expr) => {
        match $img {
            image::DynamicImage::ImageLuma8($buf) => $body,
            image::DynamicImage::ImageLumaA8($buf) => $body,
            image::DynamicImage::ImageRgb8($buf) => $body,
            image::DynamicImage::ImageRgba8($buf) => $body,
            image::DynamicImage::ImageLuma16($buf) => $body,
            image::DynamicImage::ImageLumaA16($buf) => $body,
            image::DynamicImage::ImageRgb16($buf) => $body,
            image::DynamicImage::ImageRgba16($buf) => $body,
            image::DynamicImage::ImageRgb32F($buf) => $body,
            image::DynamicImage::ImageRgba32F($buf) => $body,
            _ => $fallback,
        }
    };
}

/// Map every concrete buffer inside `$img` to a new buffer of the same
/// layout. Unknown layouts are widened to `rgba32f` first.
macro_rules! map_buffer {
    ($img:expr, $buf:ident => $body:expr) => {
        match $img {
            image::DynamicImage::ImageLuma8($buf) => image::DynamicImage::ImageLuma8($body),
            image::DynamicImage::ImageLumaA8($buf) => image::DynamicImage::ImageLumaA8($body),
            image::DynamicImage::ImageRgb8($buf) => image::DynamicImage::ImageRgb8($body),
            image::DynamicImage::ImageRgba8($buf) => image::DynamicImage::ImageRgba8($body),
            image::DynamicImage::ImageLuma16($buf) => image::DynamicImage::ImageLuma16($body),
            image::DynamicImage::ImageLumaA16($buf) => image::DynamicImage::ImageLumaA16($body),
            image::DynamicImage::ImageRgb16($buf) => image::DynamicImage::ImageRgb16($body),
            image::DynamicImage::ImageRgba16($buf) => image::DynamicImage::ImageRgba16($body),
            image::DynamicImage::ImageRgb32F($buf) => image::DynamicImage::ImageRgb32F($body),
            image::DynamicImage::ImageRgba32F($buf) => image::DynamicImage::ImageRgba32F($body),
            other => {
                let widened = other.to_rgba32f();
                let $buf = &widened;
                image::DynamicImage::ImageRgba32F($body)
            }
        }
    };
}

pub(crate) use map_buffer;
pub(crate) use with_buffer;

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, LumaA, Rgb, Rgba};

    #[test]
    fn u8_unit_roundtrip_is_exact() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(u8::from_unit(v.to_unit()), v);
        }
    }

    #[test]
    fn u16_from_unit_clamps() {
        assert_eq!(u16::from_unit(-0.5), 0);
        assert_eq!(u16::from_unit(1.5), u16::MAX);
    }

    #[test]
    fn gray_pixel_collapses_to_luma() {
        let p: Luma<u8> = pixel_from_rgba([1.0, 1.0, 1.0, 1.0]);
        assert_eq!(p, Luma([255]));
        let p: LumaA<u8> = pixel_from_rgba([0.0, 0.0, 0.0, 0.0]);
        assert_eq!(p, LumaA([0, 0]));
    }

    #[test]
    fn rgb_to_rgba_reads_opaque() {
        assert_eq!(pixel_to_rgba(&Rgb([255u8, 0, 0])), [1.0, 0.0, 0.0, 1.0]);
        let rgba = pixel_to_rgba(&Rgba([0u16, 65535, 0, 0]));
        assert_eq!(rgba, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn channel_classification() {
        assert!(!has_alpha::<Rgb<u8>>());
        assert!(has_alpha::<LumaA<u16>>());
        assert_eq!(color_channels::<Rgba<f32>>(), 3);
        assert_eq!(color_channels::<Luma<u8>>(), 1);
    }
}
