//! Rotation and mirroring.
//!
//! Right angles are exact pixel permutations (`DynamicImage::rotate90` and
//! friends). Any other angle is a projective warp through imageproc with
//! bilinear interpolation: about the centre for [`rotate`] (the canvas keeps
//! its size), about a crop origin for [`crop_rotate`]. Uncovered pixels take
//! the background color.

use super::calculations::{RightAngle, normalize_degrees, right_angle};
use super::color::{Color, Colorspace};
use super::pixels::{Sample, pixel_from_rgba};
use image::{DynamicImage, ImageBuffer, Pixel};
use imageproc::definitions::Clamp;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::debug;

/// Rotate clockwise by `angle` degrees.
pub fn rotate(image: &DynamicImage, angle: f64, background: Color) -> DynamicImage {
    match right_angle(angle) {
        Some(RightAngle::Zero) => image.clone(),
        Some(RightAngle::Quarter) => image.rotate90(),
        Some(RightAngle::Half) => image.rotate180(),
        Some(RightAngle::ThreeQuarter) => image.rotate270(),
        None => rotate_free(image, normalize_degrees(angle), background),
    }
}

fn rotate_free(image: &DynamicImage, degrees: f64, background: Color) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return image.clone();
    }
    let theta = (degrees as f32).to_radians();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let projection = Projection::translate(cx, cy)
        * Projection::rotate(theta)
        * Projection::translate(-cx, -cy);
    warp(image, &projection, width, height, background)
}

/// Turn the image clockwise by `angle` degrees about (`x`, `y`), then cut
/// the `width`×`height` rectangle whose top-left corner is that point.
///
/// Source pixels outside the image read as `background`.
pub fn crop_rotate(
    image: &DynamicImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    angle: f64,
    background: Color,
) -> DynamicImage {
    let theta = (normalize_degrees(angle) as f32).to_radians();
    let projection = Projection::rotate(theta) * Projection::translate(-(x as f32), -(y as f32));
    warp(image, &projection, width, height, background)
}

/// Warp `image` into a new `width`×`height` canvas of the same layout.
/// `projection` maps source coordinates to output coordinates.
fn warp(
    image: &DynamicImage,
    projection: &Projection,
    width: u32,
    height: u32,
    background: Color,
) -> DynamicImage {
    let bg = background.to_unit_rgba();
    if width == 0 || height == 0 {
        return Colorspace::of(image).blank(width, height);
    }
    if image.width() == 0 || image.height() == 0 {
        let fill = DynamicImage::ImageRgba32F(ImageBuffer::from_pixel(
            width,
            height,
            pixel_from_rgba(bg),
        ));
        return Colorspace::of(image).convert(&fill);
    }
    match image {
        DynamicImage::ImageLuma8(b) => DynamicImage::ImageLuma8(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageLumaA8(b) => DynamicImage::ImageLumaA8(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageRgb8(b) => DynamicImage::ImageRgb8(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageRgba8(b) => DynamicImage::ImageRgba8(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageLuma16(b) => DynamicImage::ImageLuma16(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageLumaA16(b) => DynamicImage::ImageLumaA16(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageRgb16(b) => DynamicImage::ImageRgb16(warp_buffer(b, projection, width, height, bg)),
        DynamicImage::ImageRgba16(b) => DynamicImage::ImageRgba16(warp_buffer(b, projection, width, height, bg)),
        other => {
            // Float layouts: through 16-bit RGBA and back
            let layout = Colorspace::of(other);
            debug!(%layout, "warping through rgba16");
            let warped = DynamicImage::ImageRgba16(warp_buffer(
                &other.to_rgba16(),
                projection,
                width,
                height,
                bg,
            ));
            layout.convert(&warped)
        }
    }
}

fn warp_buffer<P>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
    projection: &Projection,
    width: u32,
    height: u32,
    background: [f32; 4],
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + Send + Sync,
    P::Subpixel: Sample + Into<f32> + Clamp<f32> + Send + Sync,
{
    let mut out = ImageBuffer::new(width, height);
    warp_into(
        buf,
        projection,
        Interpolation::Bilinear,
        pixel_from_rgba::<P>(background),
        &mut out,
    );
    out
}

/// Mirror left to right.
pub fn flip_x(image: &DynamicImage) -> DynamicImage {
    image.fliph()
}

/// Mirror top to bottom.
pub fn flip_y(image: &DynamicImage) -> DynamicImage {
    image.flipv()
}
