//! Resolution (pixel density) readers for encoded images.
//!
//! `image` decodes pixels but drops density metadata, so it is recovered
//! here from the container bytes:
//!
//! - JPEG: JFIF APP0 segment (`units`, `Xdensity`, `Ydensity`).
//! - PNG: `pHYs` chunk (pixels per metre).
//! - TIFF: `XResolution` / `YResolution` / `ResolutionUnit` tags, read
//!   through the `tiff` crate decoder.
//! - BMP: `biXPelsPerMeter` / `biYPelsPerMeter` in the info header.
//!
//! Every reader returns `None` on missing or malformed data; a density is
//! never a reason to fail a decode.

use super::calculations::{dpcm_to_dpi, dpm_to_dpi};
use super::params::Codec;
use std::io::Cursor;
use tiff::decoder::Decoder;
use tiff::decoder::ifd::Value;
use tiff::tags::Tag;

/// Horizontal and vertical density in dots per inch.
pub type Dpi = (u32, u32);

/// Read the density stored in `data`, dispatching on the sniffed codec.
pub fn read_resolution(codec: Codec, data: &[u8]) -> Option<Dpi> {
    let dpi = match codec {
        Codec::Jpeg => read_jfif_density(data),
        Codec::Png => read_png_phys(data),
        Codec::Tiff => read_tiff_resolution(data),
        Codec::Bmp => read_bmp_density(data),
        _ => None,
    }?;
    (dpi.0 > 0 || dpi.1 > 0).then_some(dpi)
}

// ---------------------------------------------------------------------------
// JPEG: JFIF APP0
// ---------------------------------------------------------------------------

const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";

/// Walk JPEG marker segments up to the first scan looking for APP0/JFIF.
///
/// APP0 payload layout after the identifier:
///   Bytes 0-1: version
///   Byte 2:    units (0 = aspect ratio only, 1 = dpi, 2 = dots per cm)
///   Bytes 3-4: Xdensity (big-endian u16)
///   Bytes 5-6: Ydensity (big-endian u16)
fn read_jfif_density(data: &[u8]) -> Option<Dpi> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // SOS or EOI: no more header segments
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            return None;
        }
        let payload = &data[pos + 4..pos + 2 + length];

        if marker == 0xE0 && payload.starts_with(JFIF_IDENTIFIER) {
            let fields = &payload[JFIF_IDENTIFIER.len()..];
            if fields.len() < 7 {
                return None;
            }
            let units = fields[2];
            let x = u16::from_be_bytes([fields[3], fields[4]]) as f64;
            let y = u16::from_be_bytes([fields[5], fields[6]]) as f64;
            return match units {
                1 => Some((x as u32, y as u32)),
                2 => Some((dpcm_to_dpi(x), dpcm_to_dpi(y))),
                _ => None,
            };
        }

        pos += 2 + length;
    }
    None
}

// ---------------------------------------------------------------------------
// PNG: pHYs chunk
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Walk PNG chunks up to IDAT looking for pHYs.
///
/// Chunk layout: length (u32 BE), type (4 bytes), data, CRC (4 bytes).
/// pHYs data: x pixels per unit (u32), y pixels per unit (u32), unit (u8,
/// 1 = metre).
fn read_png_phys(data: &[u8]) -> Option<Dpi> {
    if !data.starts_with(PNG_SIGNATURE) {
        return None;
    }
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let length =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let kind = &data[pos + 4..pos + 8];
        let start = pos + 8;
        let end = start.checked_add(length)?;
        if end > data.len() {
            return None;
        }

        match kind {
            b"pHYs" if length >= 9 => {
                let chunk = &data[start..end];
                let x = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let y = u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
                return (chunk[8] == 1).then(|| (dpm_to_dpi(x as f64), dpm_to_dpi(y as f64)));
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }

        // data + CRC
        pos = end + 4;
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF: resolution tags
// ---------------------------------------------------------------------------

/// TIFF `ResolutionUnit` values.
const RESUNIT_NONE: u16 = 1;
const RESUNIT_CENTIMETER: u16 = 3;

fn rational_value(value: Value) -> Option<f64> {
    match value {
        Value::Rational(n, d) if d != 0 => Some(n as f64 / d as f64),
        Value::Short(v) => Some(v as f64),
        Value::Unsigned(v) => Some(v as f64),
        Value::Float(v) => Some(v as f64),
        Value::Double(v) => Some(v),
        Value::List(mut values) if !values.is_empty() => rational_value(values.swap_remove(0)),
        _ => None,
    }
}

fn read_tiff_resolution(data: &[u8]) -> Option<Dpi> {
    let mut decoder = Decoder::new(Cursor::new(data)).ok()?;
    let x = decoder
        .find_tag(Tag::XResolution)
        .ok()
        .flatten()
        .and_then(rational_value)?;
    let y = decoder
        .find_tag(Tag::YResolution)
        .ok()
        .flatten()
        .and_then(rational_value)
        .unwrap_or(x);
    // Inch is the TIFF default unit
    let unit = decoder
        .find_tag(Tag::ResolutionUnit)
        .ok()
        .flatten()
        .and_then(|v| v.into_u16().ok())
        .unwrap_or(2);

    match unit {
        RESUNIT_NONE => None,
        RESUNIT_CENTIMETER => Some((dpcm_to_dpi(x), dpcm_to_dpi(y))),
        _ => Some((x.round() as u32, y.round() as u32)),
    }
}

// ---------------------------------------------------------------------------
// BMP: BITMAPINFOHEADER pels per metre
// ---------------------------------------------------------------------------

/// Offsets are from the start of the file: 14-byte file header, then the
/// info header with biXPelsPerMeter at +24 and biYPelsPerMeter at +28.
fn read_bmp_density(data: &[u8]) -> Option<Dpi> {
    if data.len() < 46 || !data.starts_with(b"BM") {
        return None;
    }
    let header_size = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);
    // BITMAPCOREHEADER (12 bytes) carries no density
    if header_size < 40 {
        return None;
    }
    let x = i32::from_le_bytes([data[38], data[39], data[40], data[41]]);
    let y = i32::from_le_bytes([data[42], data[43], data[44], data[45]]);
    if x <= 0 && y <= 0 {
        return None;
    }
    Some((
        dpm_to_dpi(x.max(0) as f64),
        dpm_to_dpi(y.max(0) as f64),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jfif(units: u8, x: u16, y: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 1, units]);
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        data
    }

    #[test]
    fn jfif_dpi_units() {
        assert_eq!(read_jfif_density(&jfif(1, 300, 150)), Some((300, 150)));
    }

    #[test]
    fn jfif_dots_per_cm_converts() {
        assert_eq!(read_jfif_density(&jfif(2, 118, 118)), Some((300, 300)));
    }

    #[test]
    fn jfif_aspect_only_has_no_resolution() {
        assert_eq!(read_jfif_density(&jfif(0, 1, 1)), None);
    }

    #[test]
    fn jfif_truncated_returns_none() {
        let data = jfif(1, 72, 72);
        assert_eq!(read_jfif_density(&data[..12]), None);
        assert_eq!(read_jfif_density(b"not a jpeg"), None);
    }

    fn png_with_phys(x: u32, y: u32, unit: u8) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&[0; 13]);
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"pHYs");
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.push(unit);
        data.extend_from_slice(&[0; 4]);
        data
    }

    #[test]
    fn png_phys_per_metre() {
        assert_eq!(read_png_phys(&png_with_phys(2835, 5669, 1)), Some((72, 144)));
    }

    #[test]
    fn png_phys_unknown_unit() {
        assert_eq!(read_png_phys(&png_with_phys(1, 1, 0)), None);
    }

    #[test]
    fn bmp_pels_per_metre() {
        let mut data = vec![0u8; 54];
        data[0] = b'B';
        data[1] = b'M';
        data[14..18].copy_from_slice(&40u32.to_le_bytes());
        data[38..42].copy_from_slice(&3780i32.to_le_bytes());
        data[42..46].copy_from_slice(&3780i32.to_le_bytes());
        assert_eq!(read_bmp_density(&data), Some((96, 96)));
    }

    #[test]
    fn zero_density_is_unknown() {
        assert_eq!(read_resolution(Codec::Jpeg, &jfif(1, 0, 0)), None);
    }

    #[test]
    fn unsupported_codec_has_no_resolution() {
        assert_eq!(read_resolution(Codec::Webp, b"RIFF"), None);
    }

    #[test]
    fn rational_values_convert() {
        assert_eq!(rational_value(Value::Rational(600, 2)), Some(300.0));
        assert_eq!(rational_value(Value::Rational(1, 0)), None);
        assert_eq!(
            rational_value(Value::List(vec![Value::Rational(72, 1)])),
            Some(72.0)
        );
    }
}
