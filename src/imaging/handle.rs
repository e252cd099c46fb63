//! The image handle.
//!
//! [`Image`] owns a pixel buffer plus the metadata that travels with it
//! (resolution, source codec). It is created empty, filled by a decode,
//! changed in place by transforms, and written out by an encode. Dropping it
//! releases everything.

use super::adjust;
use super::backend::ImagingError;
use super::calculations::{
    RightAngle, check_buffer_size, resolve_factors, right_angle, scaled_dimensions,
    scaled_resolution,
};
use super::codec;
use super::color::{Color, Colorspace};
use super::params::{Codec, Compression, EncodeOptions, Quality};
use super::pixels::{Sample, map_buffer, pixel_from_rgba, pixel_to_rgba, with_buffer};
use super::resolution::Dpi;
use super::rotate;
use super::scale::{ScaleFilter, resample};
use image::{DynamicImage, ImageBuffer, Pixel};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, instrument};

/// An owned raster image with resolution metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: DynamicImage,
    resolution: Dpi,
    codec: Option<Codec>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Image {
    /// An empty 0×0 `rgb8` image with unknown resolution.
    pub fn new() -> Self {
        Self::blank(0, 0)
    }

    /// A black `rgb8` image of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_dynamic(DynamicImage::new_rgb8(width, height))
    }

    /// Wrap an existing pixel buffer; resolution starts unknown.
    pub fn from_dynamic(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            resolution: (0, 0),
            codec: None,
        }
    }

    /// Allocate a `width`×`height` image with `channels` samples of `depth`
    /// bits each, zeroed or filled with `fill`.
    pub fn with_type_and_size(
        channels: u8,
        depth: u8,
        width: u32,
        height: u32,
        fill: Option<Color>,
    ) -> Result<Self, ImagingError> {
        let layout = Colorspace::from_channels_and_depth(channels, depth).ok_or_else(|| {
            ImagingError::InvalidArgument(format!(
                "no pixel layout with {channels} channels of {depth} bits"
            ))
        })?;
        check_buffer_size(width, height, layout.channels() * layout.depth() / 8)?;
        let mut pixels = layout.blank(width, height);
        if let Some(color) = fill {
            let rgba = color.to_unit_rgba();
            with_buffer!(&mut pixels, buf => fill_buffer(buf, rgba), _ => {});
        }
        Ok(Self::from_dynamic(pixels))
    }

    // ---------------------------------------------------------------------
    // Decode / encode
    // ---------------------------------------------------------------------

    /// Replace the contents with the image encoded in `data`.
    ///
    /// On error the handle is left untouched.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn decode(&mut self, data: &[u8]) -> Result<(), ImagingError> {
        let decoded = codec::decode(data)?;
        self.pixels = decoded.pixels;
        self.resolution = decoded.resolution.unwrap_or((0, 0));
        self.codec = Some(decoded.codec);
        Ok(())
    }

    /// Read and decode the file at `path`.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn decode_file(&mut self, path: &Path) -> Result<(), ImagingError> {
        let data = std::fs::read(path)?;
        self.decode(&data)
    }

    /// Encode to memory. `codec` is a codec name such as `"jpeg"` or `"tif"`.
    pub fn encode(
        &self,
        codec: &str,
        quality: Quality,
        compression: Compression,
    ) -> Result<Vec<u8>, ImagingError> {
        self.encode_as(Codec::from_name(codec)?, quality, compression)
    }

    #[instrument(skip(self), fields(width = self.width(), height = self.height()))]
    pub fn encode_as(
        &self,
        codec: Codec,
        quality: Quality,
        compression: Compression,
    ) -> Result<Vec<u8>, ImagingError> {
        codec::encode(&self.pixels, self.resolution, codec, quality, compression)
    }

    /// Encode to `path`, choosing the codec from its extension.
    pub fn encode_file(
        &self,
        path: &Path,
        quality: Quality,
        compression: Compression,
    ) -> Result<(), ImagingError> {
        self.encode_file_with(
            path,
            &EncodeOptions {
                codec: None,
                quality,
                compression,
            },
        )
    }

    /// Encode to `path`; `options.codec` overrides the extension.
    #[instrument(skip(self, path, options), fields(path = %path.display()))]
    pub fn encode_file_with(
        &self,
        path: &Path,
        options: &EncodeOptions,
    ) -> Result<(), ImagingError> {
        let codec = match options.codec {
            Some(codec) => codec,
            None => Codec::from_path(path)?,
        };
        let bytes = self.encode_as(codec, options.quality, options.compression)?;
        std::fs::write(path, &bytes)?;
        debug!(bytes = bytes.len(), "written");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Horizontal resolution in dpi; 0 when unknown.
    pub fn x_resolution(&self) -> u32 {
        self.resolution.0
    }

    /// Vertical resolution in dpi; 0 when unknown.
    pub fn y_resolution(&self) -> u32 {
        self.resolution.1
    }

    pub fn resolution(&self) -> Dpi {
        self.resolution
    }

    pub fn set_x_resolution(&mut self, dpi: u32) {
        self.resolution.0 = dpi;
    }

    pub fn set_y_resolution(&mut self, dpi: u32) {
        self.resolution.1 = dpi;
    }

    pub fn set_resolution(&mut self, x: u32, y: u32) {
        self.resolution = (x, y);
    }

    /// Samples per pixel.
    pub fn channels(&self) -> u8 {
        self.colorspace().channels()
    }

    /// Bits per sample.
    pub fn channel_depth(&self) -> u8 {
        self.colorspace().depth()
    }

    pub fn colorspace(&self) -> Colorspace {
        Colorspace::of(&self.pixels)
    }

    /// Convert to the named pixel layout (`"gray8"`, `"rgb16"`, ...).
    pub fn convert_colorspace(&mut self, name: &str) -> Result<(), ImagingError> {
        let target: Colorspace = name.parse()?;
        if target != self.colorspace() {
            debug!(from = %self.colorspace(), to = %target, "converting colorspace");
            self.pixels = target.convert(&self.pixels);
        }
        Ok(())
    }

    /// Codec of the last successful decode.
    pub fn codec(&self) -> Option<Codec> {
        self.codec
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.pixels
    }

    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    fn bytes_per_pixel(&self) -> u8 {
        self.pixels.color().bytes_per_pixel()
    }

    // ---------------------------------------------------------------------
    // Pixels and canvas
    // ---------------------------------------------------------------------

    fn check_bounds(&self, x: u32, y: u32) -> Result<(), ImagingError> {
        if x < self.width() && y < self.height() {
            Ok(())
        } else {
            Err(ImagingError::OutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height(),
            })
        }
    }

    /// Read one pixel as a unit-float color.
    pub fn pixel(&self, x: u32, y: u32) -> Result<Color, ImagingError> {
        self.check_bounds(x, y)?;
        let rgba = with_buffer!(&self.pixels, buf => pixel_to_rgba(buf.get_pixel(x, y)), _ => {
            pixel_to_rgba(self.pixels.to_rgba32f().get_pixel(x, y))
        });
        Ok(Color::from_unit_rgba(rgba))
    }

    /// Write one pixel, converting `color` to the image's layout.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> Result<(), ImagingError> {
        self.check_bounds(x, y)?;
        let rgba = color.to_unit_rgba();
        with_buffer!(&mut self.pixels, buf => buf.put_pixel(x, y, pixel_from_rgba(rgba)), _ => {
            return Err(ImagingError::UnsupportedColorspace("unknown pixel layout".into()));
        });
        Ok(())
    }

    /// Reallocate to `width`×`height`, keeping the overlapping top-left
    /// content. New area is zeroed.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<(), ImagingError> {
        check_buffer_size(width, height, self.bytes_per_pixel())?;
        self.pixels = map_buffer!(&self.pixels, buf => canvas(buf, width, height));
        Ok(())
    }

    /// Keep the rectangle at (`x`, `y`) of size `width`×`height`, clipped to
    /// the image.
    #[instrument(skip(self))]
    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), ImagingError> {
        let (img_w, img_h) = (self.width(), self.height());
        if x >= img_w || y >= img_h || width == 0 || height == 0 {
            return Err(ImagingError::InvalidArgument(format!(
                "crop {width}x{height}+{x}+{y} is outside the {img_w}x{img_h} image"
            )));
        }
        let width = width.min(img_w - x);
        let height = height.min(img_h - y);
        if (x, y, width, height) != (0, 0, img_w, img_h) {
            self.pixels = self.pixels.crop_imm(x, y, width, height);
        }
        Ok(())
    }

    /// Drop bottom rows that match the bottom-left pixel exactly.
    pub fn fast_auto_crop(&mut self) {
        if self.is_empty() {
            return;
        }
        let keep = adjust::auto_crop_height(&self.pixels);
        if keep < self.height() {
            debug!(from = self.height(), to = keep, "auto crop");
            self.pixels = self.pixels.crop_imm(0, 0, self.width(), keep);
        }
    }

    // ---------------------------------------------------------------------
    // Geometry
    // ---------------------------------------------------------------------

    /// Rotate clockwise by `angle` degrees. Right angles are exact;
    /// other angles keep the canvas size and fill uncovered pixels with
    /// `background`.
    #[instrument(skip(self))]
    pub fn rotate(&mut self, angle: f64, background: Color) {
        if !angle.is_finite() {
            debug!("ignoring non-finite rotation");
            return;
        }
        let turn = right_angle(angle);
        if turn == Some(RightAngle::Zero) || (turn.is_none() && self.is_empty()) {
            return;
        }
        self.pixels = rotate::rotate(&self.pixels, angle, background);
        if matches!(turn, Some(RightAngle::Quarter | RightAngle::ThreeQuarter)) {
            self.resolution = (self.resolution.1, self.resolution.0);
        }
    }

    /// A new image: this one turned clockwise by `angle` degrees about
    /// (`x`, `y`), cut to `width`×`height` from that point. Area outside
    /// the source takes `background`. Resolution and codec are carried over.
    #[instrument(skip(self))]
    pub fn copy_crop_rotate(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        angle: f64,
        background: Color,
    ) -> Result<Image, ImagingError> {
        if width == 0 || height == 0 || !angle.is_finite() {
            return Err(ImagingError::InvalidArgument(format!(
                "crop-rotate {width}x{height}+{x}+{y} by {angle}"
            )));
        }
        check_buffer_size(width, height, self.bytes_per_pixel())?;
        Ok(Image {
            pixels: rotate::crop_rotate(&self.pixels, x, y, width, height, angle, background),
            resolution: self.resolution,
            codec: self.codec,
        })
    }

    pub fn flip_x(&mut self) {
        self.pixels = rotate::flip_x(&self.pixels);
    }

    pub fn flip_y(&mut self) {
        self.pixels = rotate::flip_y(&self.pixels);
    }

    #[instrument(skip(self))]
    fn scale_with(
        &mut self,
        filter: ScaleFilter,
        fx: f64,
        fy: Option<f64>,
    ) -> Result<(), ImagingError> {
        let (fx, fy) = resolve_factors(fx, fy)?;
        if filter == ScaleFilter::Best && fx == 1.0 && fy == 1.0 {
            return Ok(());
        }
        let (width, height) = scaled_dimensions(self.width(), self.height(), fx, fy);
        check_buffer_size(width, height, self.bytes_per_pixel())?;
        if !self.is_empty() {
            let filter = filter.resolve(fx, fy);
            debug!(?filter, width, height, "resampling");
            self.pixels = resample(&self.pixels, width, height, filter);
        }
        self.resolution = (
            scaled_resolution(self.resolution.0, fx),
            scaled_resolution(self.resolution.1, fy),
        );
        Ok(())
    }

    /// Scale by `fx` horizontally and `fy` (default `fx`) vertically with
    /// the best filter for the factors. Resolution follows the factors.
    pub fn scale(&mut self, fx: f64, fy: Option<f64>) -> Result<(), ImagingError> {
        self.scale_with(ScaleFilter::Best, fx, fy)
    }

    pub fn nearest_scale(&mut self, fx: f64, fy: Option<f64>) -> Result<(), ImagingError> {
        self.scale_with(ScaleFilter::Nearest, fx, fy)
    }

    pub fn bilinear_scale(&mut self, fx: f64, fy: Option<f64>) -> Result<(), ImagingError> {
        self.scale_with(ScaleFilter::Bilinear, fx, fy)
    }

    /// Area-averaging scale.
    pub fn box_scale(&mut self, fx: f64, fy: Option<f64>) -> Result<(), ImagingError> {
        self.scale_with(ScaleFilter::Box, fx, fy)
    }

    pub fn thumbnail_scale(&mut self, fx: f64, fy: Option<f64>) -> Result<(), ImagingError> {
        self.scale_with(ScaleFilter::Thumbnail, fx, fy)
    }

    // ---------------------------------------------------------------------
    // Tone
    // ---------------------------------------------------------------------

    pub fn invert(&mut self) {
        adjust::invert(&mut self.pixels);
    }

    pub fn normalize(&mut self) {
        adjust::normalize(&mut self.pixels);
    }

    pub fn brightness_contrast_gamma(
        &mut self,
        brightness: f64,
        contrast: f64,
        gamma: f64,
    ) -> Result<(), ImagingError> {
        adjust::brightness_contrast_gamma(&mut self.pixels, brightness, contrast, gamma)
    }

    pub fn hue_saturation_lightness(
        &mut self,
        hue: f64,
        saturation: f64,
        lightness: f64,
    ) -> Result<(), ImagingError> {
        adjust::hue_saturation_lightness(&mut self.pixels, hue, saturation, lightness)
    }

    // ---------------------------------------------------------------------
    // Analysis
    // ---------------------------------------------------------------------

    /// Percentage of dark pixels inside `margin` (rounded down to a
    /// multiple of 8), relative to the whole image.
    pub fn ink_percent(&self, margin: u32) -> f64 {
        adjust::ink_percent(&self.pixels, margin)
    }

    /// True when fewer than `percent` percent of the pixels inside
    /// `margin` are dark.
    pub fn is_empty_page(&self, percent: f64, margin: u32) -> bool {
        self.ink_percent(margin) < percent
    }
}

/// Snapshot of an image's properties, for display and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub x_resolution: u32,
    pub y_resolution: u32,
    pub channels: u8,
    pub channel_depth: u8,
    pub colorspace: Colorspace,
    pub codec: Option<Codec>,
}

impl Image {
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            width: self.width(),
            height: self.height(),
            x_resolution: self.x_resolution(),
            y_resolution: self.y_resolution(),
            channels: self.channels(),
            channel_depth: self.channel_depth(),
            colorspace: self.colorspace(),
            codec: self.codec,
        }
    }
}

fn fill_buffer<P>(buf: &mut ImageBuffer<P, Vec<P::Subpixel>>, rgba: [f32; 4])
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let value: P = pixel_from_rgba(rgba);
    buf.pixels_mut().for_each(|p| *p = value);
}

fn canvas<P: Pixel>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let mut out = ImageBuffer::new(width, height);
    for y in 0..height.min(src.height()) {
        for x in 0..width.min(src.width()) {
            out.put_pixel(x, y, *src.get_pixel(x, y));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> Image {
        Image::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_fn(
            width,
            height,
            |x, y| Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, 128]),
        )))
    }

    // =========================================================================
    // lifecycle
    // =========================================================================

    #[test]
    fn new_image_is_empty() {
        let img = Image::new();
        assert_eq!((img.width(), img.height()), (0, 0));
        assert_eq!(img.resolution(), (0, 0));
        assert_eq!(img.channels(), 3);
        assert_eq!(img.channel_depth(), 8);
        assert_eq!(img.codec(), None);
    }

    #[test]
    fn with_type_and_size_picks_layout() {
        let img = Image::with_type_and_size(1, 16, 4, 3, None).unwrap();
        assert_eq!(img.colorspace(), Colorspace::Gray16);
        assert_eq!((img.width(), img.height()), (4, 3));

        let img = Image::with_type_and_size(4, 32, 1, 1, None).unwrap();
        assert_eq!(img.colorspace(), Colorspace::Rgba32F);
    }

    #[test]
    fn with_type_and_size_fills() {
        let img = Image::with_type_and_size(3, 8, 2, 2, Some(Color::WHITE)).unwrap();
        assert_eq!(img.pixel(1, 1).unwrap(), Color::WHITE);
    }

    #[test]
    fn with_type_and_size_rejects_unknown_layout() {
        assert!(matches!(
            Image::with_type_and_size(2, 32, 1, 1, None),
            Err(ImagingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn clone_is_deep() {
        let mut a = gradient(4, 4);
        let b = a.clone();
        a.set_pixel(0, 0, Color::WHITE).unwrap();
        assert_ne!(a, b);
    }

    // =========================================================================
    // decode / encode
    // =========================================================================

    #[test]
    fn memory_tiff_roundtrip_keeps_pixels_and_resolution() {
        let mut src = gradient(16, 9);
        src.set_resolution(300, 150);
        let data = src
            .encode("tiff", Quality::default(), Compression::Default)
            .unwrap();

        let mut img = Image::new();
        img.decode(&data).unwrap();
        assert_eq!(img.codec(), Some(Codec::Tiff));
        assert_eq!(img.resolution(), (300, 150));
        assert_eq!(img.as_dynamic(), src.as_dynamic());
    }

    #[test]
    fn failed_decode_leaves_handle_unchanged() {
        let mut img = gradient(5, 5);
        img.set_resolution(72, 72);
        let before = img.clone();
        assert!(img.decode(b"definitely not an image").is_err());
        assert_eq!(img, before);
    }

    #[test]
    fn file_roundtrip_uses_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");
        let mut src = gradient(32, 16);
        src.set_resolution(144, 144);
        src.encode_file(&path, Quality::new(90), Compression::Default)
            .unwrap();

        let mut img = Image::new();
        img.decode_file(&path).unwrap();
        assert_eq!(img.codec(), Some(Codec::Jpeg));
        assert_eq!((img.width(), img.height()), (32, 16));
        assert_eq!(img.resolution(), (144, 144));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut img = Image::new();
        assert!(matches!(
            img.decode_file(Path::new("/nonexistent/in.tif")),
            Err(ImagingError::Io(_))
        ));
    }

    #[test]
    fn unknown_codec_name_errors() {
        assert!(matches!(
            gradient(2, 2).encode("gif", Quality::default(), Compression::Default),
            Err(ImagingError::UnsupportedCodec(_))
        ));
    }

    // =========================================================================
    // properties and pixels
    // =========================================================================

    #[test]
    fn resolution_setters() {
        let mut img = Image::new();
        img.set_x_resolution(144);
        img.set_y_resolution(72);
        assert_eq!((img.x_resolution(), img.y_resolution()), (144, 72));
    }

    #[test]
    fn convert_colorspace_by_name() {
        let mut img = gradient(3, 3);
        img.convert_colorspace("gray16").unwrap();
        assert_eq!((img.channels(), img.channel_depth()), (1, 16));
        assert!(matches!(
            img.convert_colorspace("lab"),
            Err(ImagingError::UnsupportedColorspace(_))
        ));
        assert_eq!(img.colorspace(), Colorspace::Gray16);
    }

    #[test]
    fn pixel_access_is_bounds_checked() {
        let mut img = gradient(4, 4);
        assert!(img.pixel(3, 3).is_ok());
        assert!(matches!(
            img.pixel(4, 0),
            Err(ImagingError::OutOfBounds { x: 4, .. })
        ));
        assert!(img.set_pixel(0, 4, Color::BLACK).is_err());
    }

    #[test]
    fn set_pixel_converts_to_layout() {
        let mut img = Image::with_type_and_size(1, 8, 2, 2, None).unwrap();
        img.set_pixel(1, 0, Color::WHITE).unwrap();
        assert_eq!(img.pixel(1, 0).unwrap(), Color::WHITE);
        assert_eq!(img.pixel(0, 0).unwrap(), Color::BLACK);
    }

    #[test]
    fn resize_canvas_keeps_top_left() {
        let mut img = gradient(4, 4);
        let corner = img.pixel(1, 1).unwrap();
        img.resize_canvas(6, 2).unwrap();
        assert_eq!((img.width(), img.height()), (6, 2));
        assert_eq!(img.pixel(1, 1).unwrap(), corner);
        assert_eq!(img.pixel(5, 0).unwrap(), Color::BLACK);
    }

    #[test]
    fn crop_clips_to_image() {
        let mut img = gradient(10, 10);
        let origin = img.pixel(8, 7).unwrap();
        img.crop(8, 7, 100, 100).unwrap();
        assert_eq!((img.width(), img.height()), (2, 3));
        assert_eq!(img.pixel(0, 0).unwrap(), origin);
        assert!(img.crop(5, 0, 1, 1).is_err());
    }

    #[test]
    fn fast_auto_crop_trims_bottom() {
        let mut img = Image::with_type_and_size(3, 8, 4, 8, Some(Color::WHITE)).unwrap();
        img.set_pixel(2, 1, Color::BLACK).unwrap();
        img.fast_auto_crop();
        assert_eq!(img.height(), 2);
    }

    // =========================================================================
    // geometry
    // =========================================================================

    #[test]
    fn quarter_rotation_swaps_size_and_resolution() {
        let mut img = gradient(20, 10);
        img.set_resolution(300, 150);
        img.rotate(90.0, Color::BLACK);
        assert_eq!((img.width(), img.height()), (10, 20));
        assert_eq!(img.resolution(), (150, 300));
    }

    #[test]
    fn free_rotation_keeps_size_and_resolution() {
        let mut img = gradient(20, 10);
        img.set_resolution(300, 150);
        img.rotate(33.0, Color::WHITE);
        assert_eq!((img.width(), img.height()), (20, 10));
        assert_eq!(img.resolution(), (300, 150));
    }

    #[test]
    fn scale_follows_factors_and_resolution() {
        let mut img = gradient(10, 20);
        img.set_resolution(144, 144);
        img.scale(4.0, None).unwrap();
        assert_eq!((img.width(), img.height()), (40, 80));
        assert_eq!(img.resolution(), (576, 576));

        img.box_scale(0.5, None).unwrap();
        assert_eq!((img.width(), img.height()), (20, 40));
        assert_eq!(img.resolution(), (288, 288));
    }

    #[test]
    fn anisotropic_nearest_scale() {
        let mut img = gradient(10, 10);
        img.nearest_scale(2.0, Some(0.5)).unwrap();
        assert_eq!((img.width(), img.height()), (20, 5));
    }

    #[test]
    fn zero_y_factor_means_same_as_x() {
        let mut img = gradient(10, 10);
        img.bilinear_scale(3.0, Some(0.0)).unwrap();
        assert_eq!((img.width(), img.height()), (30, 30));
    }

    #[test]
    fn invalid_factor_leaves_image_unchanged() {
        let mut img = gradient(10, 10);
        let before = img.clone();
        assert!(matches!(
            img.scale(-2.0, None),
            Err(ImagingError::InvalidArgument(_))
        ));
        assert!(img.thumbnail_scale(f64::NAN, None).is_err());
        assert_eq!(img, before);
    }

    #[test]
    fn scale_by_one_is_noop() {
        let mut img = gradient(7, 7);
        let before = img.clone();
        img.scale(1.0, None).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn info_snapshots_properties() {
        let mut img = Image::with_type_and_size(4, 16, 3, 2, None).unwrap();
        img.set_resolution(72, 96);
        let info = img.info();
        assert_eq!((info.width, info.height), (3, 2));
        assert_eq!((info.x_resolution, info.y_resolution), (72, 96));
        assert_eq!((info.channels, info.channel_depth), (4, 16));
        assert_eq!(info.colorspace, Colorspace::Rgba16);
        assert_eq!(info.codec, None);
    }

    #[test]
    fn flips_keep_size() {
        let mut img = gradient(6, 3);
        let left = img.pixel(0, 0).unwrap();
        img.flip_x();
        assert_eq!(img.pixel(5, 0).unwrap(), left);
        img.flip_y();
        assert_eq!(img.pixel(5, 2).unwrap(), left);
    }

    #[test]
    fn free_rotation_of_empty_handle_is_a_no_op() {
        let mut img = Image::new();
        img.rotate(45.0, Color::BLACK);
        assert_eq!(img, Image::new());

        let mut img = Image::new();
        img.set_resolution(100, 200);
        img.rotate(90.0, Color::BLACK);
        assert_eq!(img.resolution(), (200, 100));
    }

    #[test]
    fn non_finite_rotation_keeps_pixels() {
        let mut img = gradient(3, 3);
        let before = img.clone();
        img.rotate(f64::NAN, Color::WHITE);
        img.rotate(f64::INFINITY, Color::WHITE);
        assert_eq!(img, before);
    }

    #[test]
    fn oversized_targets_are_rejected() {
        let mut img = Image::blank(1, 1);
        assert!(matches!(
            img.scale(1e10, None),
            Err(ImagingError::InvalidArgument(_))
        ));
        assert_eq!((img.width(), img.height()), (1, 1));
        assert!(img.resize_canvas(u32::MAX, u32::MAX).is_err());
        assert!(Image::with_type_and_size(4, 32, 100_000, 100_000, None).is_err());
        assert!(img.copy_crop_rotate(0, 0, u32::MAX, u32::MAX, 0.0, Color::BLACK).is_err());
    }

    #[test]
    fn copy_crop_rotate_leaves_source_alone() {
        let mut img = gradient(8, 6);
        img.set_resolution(300, 300);
        let before = img.clone();
        let part = img.copy_crop_rotate(2, 1, 4, 3, 0.0, Color::BLACK).unwrap();
        assert_eq!(img, before);
        assert_eq!((part.width(), part.height()), (4, 3));
        assert_eq!(part.resolution(), (300, 300));
        assert_eq!(part.pixel(1, 1).unwrap(), img.pixel(3, 2).unwrap());
        assert!(img.copy_crop_rotate(0, 0, 0, 3, 10.0, Color::BLACK).is_err());
    }

    #[test]
    fn empty_page_detection() {
        let mut page = Image::with_type_and_size(3, 8, 100, 100, Some(Color::WHITE)).unwrap();
        assert!(page.is_empty_page(0.05, 0));
        // A 10x10 block is 1% ink
        for y in 40..50 {
            for x in 40..50 {
                page.set_pixel(x, y, Color::BLACK).unwrap();
            }
        }
        assert_eq!(page.ink_percent(0), 1.0);
        assert!(!page.is_empty_page(0.5, 0));
        assert!(page.is_empty_page(2.0, 0));
        // Ink in the margin is ignored
        assert!(page.is_empty_page(0.5, 48));
    }
}
