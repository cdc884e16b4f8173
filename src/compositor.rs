//! Executable side of the consumer contract: apply a displacement raster to
//! a flat RGBA image on the CPU.
//!
//! Mirrors what the SVG chain does declaratively: the map is stretched over
//! the source (nearest lookup), offsets are decoded as `channel/255 - 0.5`
//! scaled in source pixels, and each color channel runs at its own scale to
//! fake chromatic aberration. Alpha is never modified.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeError {
    DimensionsOverflow,
    BufferLengthMismatch { expected: usize, actual: usize },
    EmptyMap,
}

impl Display for CompositeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DimensionsOverflow => write!(f, "image dimensions overflowed usize"),
            Self::BufferLengthMismatch { expected, actual } => write!(
                f,
                "RGBA buffer length mismatch: expected {expected} bytes, got {actual} bytes"
            ),
            Self::EmptyMap => write!(f, "displacement map has zero dimensions"),
        }
    }
}

impl Error for CompositeError {}

/// Configuration for one displacement pass over a source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementComposite {
    /// Offset in source pixels at full map intensity.
    pub scale: f32,
    /// Per-channel scale delta: red samples at `scale + aberration`, blue
    /// at `scale - aberration`.
    pub aberration: f32,
}

impl DisplacementComposite {
    /// Warp `src` through `map`, returning a new buffer of the same size.
    ///
    /// `src` is `width x height` RGBA; `map` is `map_width x map_height`
    /// RGBA in the generator's channel convention (R = X, B = Y).
    pub fn apply(
        &self,
        src: &[u8],
        width: usize,
        height: usize,
        map: &[u8],
        map_width: usize,
        map_height: usize,
    ) -> Result<Vec<u8>, CompositeError> {
        let expected_src = rgba_len(width, height)?;
        if src.len() != expected_src {
            return Err(CompositeError::BufferLengthMismatch {
                expected: expected_src,
                actual: src.len(),
            });
        }
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        if map_width == 0 || map_height == 0 {
            return Err(CompositeError::EmptyMap);
        }
        let expected_map = rgba_len(map_width, map_height)?;
        if map.len() != expected_map {
            return Err(CompositeError::BufferLengthMismatch {
                expected: expected_map,
                actual: map.len(),
            });
        }

        let channel_scales = [
            self.scale + self.aberration,
            self.scale,
            self.scale - self.aberration,
        ];

        let mut out = vec![0_u8; expected_src];
        for y in 0..height {
            // Nearest map row; the SVG filter stretches the low-res map the
            // same way before sampling.
            let map_y = y * map_height / height;
            for x in 0..width {
                let map_x = x * map_width / width;
                let map_idx = (map_y * map_width + map_x) * 4;

                let offset_x = f32::from(map[map_idx]) / 255.0 - 0.5;
                let offset_y = f32::from(map[map_idx + 2]) / 255.0 - 0.5;

                let dst_idx = (y * width + x) * 4;
                for (channel, scale) in channel_scales.iter().enumerate() {
                    let sample_x = (x as f32 + offset_x * scale)
                        .clamp(0.0, (width - 1) as f32);
                    let sample_y = (y as f32 + offset_y * scale)
                        .clamp(0.0, (height - 1) as f32);
                    out[dst_idx + channel] =
                        bilinear_channel(src, width, height, sample_x, sample_y, channel);
                }
                out[dst_idx + 3] = src[dst_idx + 3];
            }
        }

        Ok(out)
    }
}

fn rgba_len(width: usize, height: usize) -> Result<usize, CompositeError> {
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(CompositeError::DimensionsOverflow)
}

/// Bilinear sample of one channel at a fractional source position.
#[inline(always)]
fn bilinear_channel(src: &[u8], width: usize, height: usize, x: f32, y: f32, channel: usize) -> u8 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |px: usize, py: usize| f32::from(src[(py * width + px) * 4 + channel]);

    let value = at(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + at(x1, y0) * fx * (1.0 - fy)
        + at(x0, y1) * (1.0 - fx) * fy
        + at(x1, y1) * fx * fy;

    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: usize, height: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                out.push(((x * 17 + y * 11) & 255) as u8);
                out.push(((x * 7 + y * 19) & 255) as u8);
                out.push(((x * 23 + y * 3) & 255) as u8);
                out.push(((x * 29 + y * 13) & 255) as u8);
            }
        }
        out
    }

    fn mid_gray_map(width: usize, height: usize) -> Vec<u8> {
        let mut map = vec![128_u8; width * height * 4];
        for px in map.chunks_exact_mut(4) {
            px[3] = 255;
        }
        map
    }

    #[test]
    fn zero_scale_is_an_exact_noop() {
        let width = 12;
        let height = 8;
        let src = gradient_frame(width, height);
        let map = mid_gray_map(3, 2);

        let node = DisplacementComposite {
            scale: 0.0,
            aberration: 0.0,
        };
        let out = node
            .apply(&src, width, height, &map, 3, 2)
            .expect("composite should succeed");
        assert_eq!(out, src);
    }

    #[test]
    fn uniform_source_is_unchanged_by_any_map() {
        let width = 10;
        let height = 10;
        let mut src = vec![0_u8; width * height * 4];
        for px in src.chunks_exact_mut(4) {
            px.copy_from_slice(&[40, 90, 200, 255]);
        }
        // A deliberately violent map.
        let mut map = mid_gray_map(width, height);
        for (i, px) in map.chunks_exact_mut(4).enumerate() {
            px[0] = if i % 2 == 0 { 0 } else { 255 };
            px[2] = if i % 3 == 0 { 255 } else { 0 };
        }

        let node = DisplacementComposite {
            scale: 25.0,
            aberration: 10.0,
        };
        let out = node
            .apply(&src, width, height, &map, width, height)
            .expect("composite should succeed");
        assert_eq!(out, src, "warping a uniform image changes nothing");
    }

    #[test]
    fn full_intensity_red_channel_shifts_sampling_right() {
        let width = 4;
        let height = 1;
        // Distinct red values per column.
        let mut src = vec![0_u8; width * 4];
        for x in 0..width {
            src[x * 4] = (x as u8 + 1) * 10;
            src[x * 4 + 3] = 255;
        }

        // R=255 -> +0.5 map intensity; scale 2 -> sample one pixel right.
        let mut map = vec![0_u8; width * 4];
        for x in 0..width {
            map[x * 4] = 255;
            map[x * 4 + 2] = 128;
            map[x * 4 + 3] = 255;
        }

        let node = DisplacementComposite {
            scale: 2.0,
            aberration: 0.0,
        };
        let out = node
            .apply(&src, width, height, &map, width, height)
            .expect("composite should succeed");

        assert_eq!(out[0], src[4], "column 0 samples from column 1");
        assert_eq!(out[4], src[8], "column 1 samples from column 2");
        assert_eq!(out[12], src[12], "last column clamps to itself");
    }

    #[test]
    fn alpha_is_preserved_exactly() {
        let width = 16;
        let height = 9;
        let src = gradient_frame(width, height);
        let alpha_before: Vec<u8> = src.chunks_exact(4).map(|px| px[3]).collect();

        let mut map = mid_gray_map(4, 3);
        map[0] = 255;
        map[2] = 0;

        let node = DisplacementComposite {
            scale: 18.0,
            aberration: 7.0,
        };
        let out = node
            .apply(&src, width, height, &map, 4, 3)
            .expect("composite should succeed");

        let alpha_after: Vec<u8> = out.chunks_exact(4).map(|px| px[3]).collect();
        assert_eq!(alpha_before, alpha_after);
    }

    #[test]
    fn buffer_length_mismatch_is_rejected() {
        let node = DisplacementComposite {
            scale: 1.0,
            aberration: 0.0,
        };
        let err = node
            .apply(&[0; 15], 2, 2, &mid_gray_map(1, 1), 1, 1)
            .expect_err("short source buffer should fail");
        assert!(matches!(err, CompositeError::BufferLengthMismatch { .. }));

        let err = node
            .apply(&gradient_frame(2, 2), 2, 2, &[0; 7], 1, 1)
            .expect_err("short map buffer should fail");
        assert!(matches!(err, CompositeError::BufferLengthMismatch { .. }));
    }

    #[test]
    fn empty_map_is_rejected() {
        let node = DisplacementComposite {
            scale: 1.0,
            aberration: 0.0,
        };
        let err = node
            .apply(&gradient_frame(2, 2), 2, 2, &[], 0, 0)
            .expect_err("empty map should fail");
        assert_eq!(err, CompositeError::EmptyMap);
    }
}
