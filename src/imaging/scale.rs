//! Resampling.
//!
//! | Filter | Implementation |
//! |---|---|
//! | nearest | `image::imageops::FilterType::Nearest` |
//! | bilinear | `image::imageops::FilterType::Triangle` |
//! | box | area-averaging resampler below (separable, rayon over rows) |
//! | thumbnail | `DynamicImage::thumbnail_exact` when shrinking, else bilinear |
//! | best | box for ≤ 0.5 on both axes, else bilinear |

use super::pixels::{Sample, map_buffer};
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Pixel};
use rayon::prelude::*;

/// Resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleFilter {
    Nearest,
    Bilinear,
    Box,
    Thumbnail,
    Best,
}

impl ScaleFilter {
    /// Choose the concrete filter for `Best`.
    pub fn resolve(self, fx: f64, fy: f64) -> ScaleFilter {
        match self {
            ScaleFilter::Best if fx <= 0.5 && fy <= 0.5 => ScaleFilter::Box,
            ScaleFilter::Best => ScaleFilter::Bilinear,
            ScaleFilter::Thumbnail if fx >= 1.0 || fy >= 1.0 => ScaleFilter::Bilinear,
            other => other,
        }
    }
}

/// Resample `image` to exactly `width`×`height`.
pub fn resample(
    image: &DynamicImage,
    width: u32,
    height: u32,
    filter: ScaleFilter,
) -> DynamicImage {
    let (fx, fy) = (
        width as f64 / image.width().max(1) as f64,
        height as f64 / image.height().max(1) as f64,
    );
    match filter.resolve(fx, fy) {
        ScaleFilter::Nearest => image.resize_exact(width, height, FilterType::Nearest),
        ScaleFilter::Bilinear | ScaleFilter::Best => {
            image.resize_exact(width, height, FilterType::Triangle)
        }
        ScaleFilter::Thumbnail => image.thumbnail_exact(width, height),
        ScaleFilter::Box => box_resample(image, width, height),
    }
}

/// Area-averaging resample: every destination sample is the mean of the
/// source area it covers, weighted by partial coverage at the edges.
pub fn box_resample(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    map_buffer!(image, buf => box_buffer(buf, width, height))
}

/// Contributing source indices and weights for each destination index.
fn box_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f32)>> {
    let ratio = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| {
            let start = i as f64 * ratio;
            let end = ((i + 1) as f64 * ratio).min(src_len as f64);
            let span = end - start;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len as usize);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 0.0).then_some((s, (overlap / span) as f32))
                })
                .collect()
        })
        .collect()
}

fn box_buffer<P>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let channels = P::CHANNEL_COUNT as usize;
    let (src_w, src_h) = src.dimensions();
    if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
        return ImageBuffer::new(width, height);
    }
    let raw = src.as_raw();
    let xw = box_weights(src_w, width);
    let yw = box_weights(src_h, height);

    // Horizontal pass into unit floats: src_h rows × width columns
    let row_len = width as usize * channels;
    let mut tmp = vec![0.0f32; src_h as usize * row_len];
    tmp.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, out_row)| {
            let in_row = &raw[y * src_w as usize * channels..(y + 1) * src_w as usize * channels];
            for (x, weights) in xw.iter().enumerate() {
                for c in 0..channels {
                    out_row[x * channels + c] = weights
                        .iter()
                        .map(|&(sx, w)| in_row[sx * channels + c].to_unit() * w)
                        .sum();
                }
            }
        });

    // Vertical pass into the destination layout
    let mut out = vec![<P::Subpixel as Sample>::from_unit(0.0); height as usize * row_len];
    out.par_chunks_mut(row_len)
        .zip(yw.par_iter())
        .for_each(|(out_row, weights)| {
            for (i, sample) in out_row.iter_mut().enumerate() {
                let v: f32 = weights
                    .iter()
                    .map(|&(sy, w)| tmp[sy * row_len + i] * w)
                    .sum();
                *sample = Sample::from_unit(v);
            }
        });

    ImageBuffer::from_raw(width, height, out).unwrap_or_else(|| ImageBuffer::new(width, height))
}
