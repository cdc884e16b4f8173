use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use image::{ImageFormat, RgbaImage};

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a flat RGBA buffer as PNG bytes.
pub fn rgba_to_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let image = RgbaImage::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height} RGBA"))?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("failed to encode raster as png")?;
    Ok(bytes)
}

/// Wrap PNG bytes in a `data:image/png;base64,` URL.
pub fn png_data_url(png_bytes: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(png_bytes);
    format!("{PNG_DATA_URL_PREFIX}{payload}")
}

/// Decode a PNG data URL back into a flat RGBA buffer and its dimensions.
///
/// The inverse of `png_data_url`; primarily a consumer-side and test-side
/// convenience.
pub fn decode_data_url(url: &str) -> Result<(Vec<u8>, u32, u32)> {
    let payload = url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| anyhow!("not a png data url"))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("invalid base64 payload in data url")?;

    let image = image::load_from_memory(&bytes).context("failed to decode png payload")?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_raster(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                out.push(((x * 17 + y * 11) & 255) as u8);
                out.push(((x * 7 + y * 19) & 255) as u8);
                out.push(((x * 23 + y * 3) & 255) as u8);
                out.push(255);
            }
        }
        out
    }

    #[test]
    fn data_url_round_trips_losslessly() {
        let pixels = make_raster(16, 9);
        let png = rgba_to_png(&pixels, 16, 9).expect("png should encode");
        let url = png_data_url(&png);
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));

        let (decoded, width, height) = decode_data_url(&url).expect("data url should decode");
        assert_eq!((width, height), (16, 9));
        assert_eq!(decoded, pixels, "png round trip must be lossless");
    }

    #[test]
    fn mismatched_buffer_length_is_rejected() {
        let err = rgba_to_png(&[0; 12], 2, 2).expect_err("short buffer should fail");
        assert!(err.to_string().contains("2x2"));
    }

    #[test]
    fn decode_rejects_foreign_strings() {
        assert!(decode_data_url("data:image/jpeg;base64,AAAA").is_err());
        assert!(decode_data_url("not a url at all").is_err());
    }
}
