//! Tonal adjustments.
//!
//! Every adjustment reads samples as unit floats, changes the color channels
//! and writes them back in the image's own layout. Alpha is left alone.

use super::backend::ImagingError;
use super::pixels::{Sample, color_channels, with_buffer};
use image::{DynamicImage, ImageBuffer, Pixel};
use rayon::prelude::*;

/// Apply `f` to the color channels of every pixel, in parallel.
///
/// `f` receives one slice per pixel: one value for gray layouts, three for
/// RGB layouts.
fn for_each_color<P>(buf: &mut ImageBuffer<P, Vec<P::Subpixel>>, f: &(dyn Fn(&mut [f32]) + Sync))
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let n = color_channels::<P>();
    let stride = P::CHANNEL_COUNT as usize;
    buf.par_chunks_mut(stride).for_each(|px| {
        let mut unit = [0.0f32; 3];
        for (u, s) in unit.iter_mut().zip(px.iter()).take(n) {
            *u = s.to_unit();
        }
        f(&mut unit[..n]);
        for (s, u) in px.iter_mut().zip(unit.iter()).take(n) {
            *s = Sample::from_unit(*u);
        }
    });
}

fn apply(image: &mut DynamicImage, f: &(dyn Fn(&mut [f32]) + Sync)) {
    with_buffer!(image, buf => for_each_color(buf, f), _ => {
        // Unmodelled layout: work on a float copy
        let mut wide = image.to_rgba32f();
        for_each_color(&mut wide, f);
        *image = DynamicImage::ImageRgba32F(wide);
    })
}

/// Smallest and largest color sample, as unit floats.
fn color_range<P>(buf: &ImageBuffer<P, Vec<P::Subpixel>>) -> Option<(f32, f32)>
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let n = color_channels::<P>();
    buf.chunks(P::CHANNEL_COUNT as usize)
        .flat_map(|px| px.iter().take(n).map(|s| s.to_unit()))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// `v → 1 - v` on every color channel.
pub fn invert(image: &mut DynamicImage) {
    apply(image, &|c| c.iter_mut().for_each(|v| *v = 1.0 - *v));
}

/// Stretch color channels linearly so the darkest sample becomes 0 and the
/// brightest 1. Flat images are left unchanged.
pub fn normalize(image: &mut DynamicImage) {
    let range = with_buffer!(&*image, buf => color_range(buf), _ => color_range(&image.to_rgba32f()));
    let Some((lo, hi)) = range else { return };
    if hi - lo <= f32::EPSILON {
        return;
    }
    let span = hi - lo;
    apply(image, &|c| c.iter_mut().for_each(|v| *v = (*v - lo) / span));
}

/// `v → ((v^(1/g)) - 0.5)·(1 + c) + 0.5 + b`, clamped to `[0, 1]`.
pub fn brightness_contrast_gamma(
    image: &mut DynamicImage,
    brightness: f64,
    contrast: f64,
    gamma: f64,
) -> Result<(), ImagingError> {
    if !(gamma.is_finite() && gamma > 0.0) {
        return Err(ImagingError::InvalidArgument(format!(
            "gamma must be positive, got {gamma}"
        )));
    }
    if !brightness.is_finite() || !contrast.is_finite() {
        return Err(ImagingError::InvalidArgument(
            "brightness and contrast must be finite".into(),
        ));
    }
    let (b, c, inv_g) = (
        brightness.clamp(-1.0, 1.0) as f32,
        contrast.clamp(-1.0, 1.0) as f32,
        (1.0 / gamma) as f32,
    );
    apply(image, &|ch| {
        ch.iter_mut().for_each(|v| {
            let g = v.max(0.0).powf(inv_g);
            *v = ((g - 0.5) * (1.0 + c) + 0.5 + b).clamp(0.0, 1.0);
        })
    });
    Ok(())
}

/// Shift hue by `hue` degrees and add `saturation` / `lightness` (each in
/// `[-1, 1]`). Gray layouts only take the lightness shift.
pub fn hue_saturation_lightness(
    image: &mut DynamicImage,
    hue: f64,
    saturation: f64,
    lightness: f64,
) -> Result<(), ImagingError> {
    if !(hue.is_finite() && saturation.is_finite() && lightness.is_finite()) {
        return Err(ImagingError::InvalidArgument(
            "hue, saturation and lightness must be finite".into(),
        ));
    }
    let (dh, ds, dl) = (
        hue.rem_euclid(360.0) as f32 / 360.0,
        saturation.clamp(-1.0, 1.0) as f32,
        lightness.clamp(-1.0, 1.0) as f32,
    );
    apply(image, &|c| match c {
        [v] => *v = (*v + dl).clamp(0.0, 1.0),
        [r, g, b] => {
            let (h, s, l) = rgb_to_hsl(*r, *g, *b);
            let h = (h + dh).rem_euclid(1.0);
            let s = (s + ds).clamp(0.0, 1.0);
            let l = (l + dl).clamp(0.0, 1.0);
            (*r, *g, *b) = hsl_to_rgb(h, s, l);
        }
        _ => {}
    });
    Ok(())
}

/// RGB → HSL, all components in `[0, 1]`.
fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d <= f32::EPSILON {
        return (0.0, 0.0, l);
    }
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s <= f32::EPSILON {
        return (l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

/// Height to keep after dropping bottom rows that match the bottom-left
/// pixel exactly. At least one row survives.
pub fn auto_crop_height(image: &DynamicImage) -> u32 {
    with_buffer!(image, buf => uniform_bottom(buf), _ => uniform_bottom(&image.to_rgba32f()))
}

fn uniform_bottom<P: Pixel>(buf: &ImageBuffer<P, Vec<P::Subpixel>>) -> u32 {
    let (width, height) = buf.dimensions();
    if width == 0 || height == 0 {
        return height;
    }
    let reference = buf.get_pixel(0, height - 1).channels().to_vec();
    let mut keep = height;
    while keep > 1 {
        let y = keep - 1;
        if (0..width).any(|x| buf.get_pixel(x, y).channels() != reference.as_slice()) {
            break;
        }
        keep -= 1;
    }
    keep
}

/// Gray level below which a pixel counts as ink.
const INK_THRESHOLD: u8 = 128;

/// Share of ink pixels, in percent of the whole image, counted inside a
/// `margin` (rounded down to a multiple of 8) on every side.
pub fn ink_percent(image: &DynamicImage, margin: u32) -> f64 {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return 0.0;
    }
    let margin = margin - margin % 8;
    if 2 * margin as u64 >= width as u64 || 2 * margin as u64 >= height as u64 {
        return 0.0;
    }
    let gray = image.to_luma8();
    let (x0, x1) = (margin as usize, (width - margin) as usize);
    let ink: u64 = gray
        .par_chunks_exact(width as usize)
        .skip(margin as usize)
        .take((height - 2 * margin) as usize)
        .map(|row| row[x0..x1].iter().filter(|&&v| v < INK_THRESHOLD).count() as u64)
        .sum();
    ink as f64 * 100.0 / (width as f64 * height as f64)
}
