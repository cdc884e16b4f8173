//! Displacement map rasterization over flat RGBA buffers.
//!
//! The raster contract, consumed by the SVG filter chain and the CPU
//! compositor alike:
//! - R encodes X displacement, `dx / max_scale + 0.5`
//! - G and B both encode Y displacement, `dy / max_scale + 0.5`
//!   (the downstream filter reads Y through its Blue channel selector)
//! - A is always 255
//! - 128 means "no displacement"
//!
//! Generation is synchronous and deterministic: two passes over the raster,
//! one to sample the fragment and find the normalization scale, one to
//! attenuate the border seam and encode.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::encode;
use crate::fragment::{Fragment, Uv};

/// Internal raster resolution relative to the logical surface size. The
/// downstream filter upsamples the map, so 20% keeps a full regeneration
/// cheap enough to run inside a resize callback.
pub const RASTER_SCALE: f32 = 0.2;

/// Pixels within this many raster pixels of a border have their displacement
/// attenuated linearly to zero, so the consuming filter never samples a hard
/// seam just outside the surface.
const EDGE_ATTENUATION_BAND: f32 = 2.0;

/// Failures raised when building or serializing a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    ZeroDimensions { width: u32, height: u32 },
    DimensionsOverflow,
    Encoding(String),
}

impl Display for GeneratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimensions { width, height } => {
                write!(f, "surface dimensions must be positive, got {width}x{height}")
            }
            Self::DimensionsOverflow => write!(f, "raster dimensions overflowed usize"),
            Self::Encoding(message) => write!(f, "failed to serialize raster: {message}"),
        }
    }
}

impl Error for GeneratorError {}

/// Owns the backing raster for one live surface.
///
/// One generator corresponds to one observed surface size; replacing the
/// size means dropping this generator and constructing a new one (the
/// surface controller does exactly that). `update` replaces the whole
/// buffer, never patches it.
pub struct DisplacementGenerator<F> {
    fragment: F,
    logical_width: u32,
    logical_height: u32,
    raster_width: u32,
    raster_height: u32,
    pixels: Vec<u8>,
    normalization_scale: f32,
}

impl<F: Fragment> DisplacementGenerator<F> {
    /// Allocate a generator for a `width` x `height` logical surface.
    ///
    /// The backing raster is `floor(width * 0.2) x floor(height * 0.2)`,
    /// floored at one pixel per axis. Zero dimensions are rejected rather
    /// than deferred to a zero-length allocation.
    pub fn new(width: u32, height: u32, fragment: F) -> Result<Self, GeneratorError> {
        if width == 0 || height == 0 {
            return Err(GeneratorError::ZeroDimensions { width, height });
        }

        let raster_width = ((width as f32 * RASTER_SCALE) as u32).max(1);
        let raster_height = ((height as f32 * RASTER_SCALE) as u32).max(1);
        let len = (raster_width as usize)
            .checked_mul(raster_height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or(GeneratorError::DimensionsOverflow)?;

        Ok(Self {
            fragment,
            logical_width: width,
            logical_height: height,
            raster_width,
            raster_height,
            pixels: vec![0; len],
            normalization_scale: 1.0,
        })
    }

    /// Regenerate the raster by evaluating the fragment at every pixel.
    ///
    /// Runs to completion on the calling thread; `&mut self` is the
    /// no-concurrent-update contract.
    pub fn update(&mut self, pointer: Option<Uv>) -> &[u8] {
        self.normalization_scale = fill_displacement_buffer(
            &mut self.pixels,
            self.raster_width,
            self.raster_height,
            &self.fragment,
            pointer,
        );
        &self.pixels
    }

    /// Regenerate, then serialize the raster as a base64 PNG data URL
    /// suitable as the image input of a displacement filter.
    pub fn update_data_url(&mut self, pointer: Option<Uv>) -> Result<String, GeneratorError> {
        self.update(pointer);
        let png = encode::rgba_to_png(&self.pixels, self.raster_width, self.raster_height)
            .map_err(|error| GeneratorError::Encoding(error.to_string()))?;
        Ok(encode::png_data_url(&png))
    }

    pub fn logical_width(&self) -> u32 {
        self.logical_width
    }

    pub fn logical_height(&self) -> u32 {
        self.logical_height
    }

    pub fn raster_width(&self) -> u32 {
        self.raster_width
    }

    pub fn raster_height(&self) -> u32 {
        self.raster_height
    }

    /// The raster from the most recent `update`. All zeros before the first.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The `max_scale` divisor of the most recent `update`, floored at 1.
    pub fn normalization_scale(&self) -> f32 {
        self.normalization_scale
    }
}

/// Compute a displacement raster into a fresh buffer.
///
/// The pure form of the algorithm, independent of the owning generator and
/// of any serialization backend. Returns the RGBA buffer and the
/// normalization scale that was applied.
pub fn compute_displacement_buffer<F: Fragment>(
    raster_width: u32,
    raster_height: u32,
    fragment: &F,
    pointer: Option<Uv>,
) -> (Vec<u8>, f32) {
    let mut pixels = vec![0; raster_width as usize * raster_height as usize * 4];
    let max_scale =
        fill_displacement_buffer(&mut pixels, raster_width, raster_height, fragment, pointer);
    (pixels, max_scale)
}

fn fill_displacement_buffer<F: Fragment>(
    pixels: &mut [u8],
    raster_width: u32,
    raster_height: u32,
    fragment: &F,
    pointer: Option<Uv>,
) -> f32 {
    let w = raster_width as usize;
    let h = raster_height as usize;
    debug_assert_eq!(pixels.len(), w * h * 4);

    let fw = raster_width as f32;
    let fh = raster_height as f32;

    // Pass 1: sample the fragment and find the largest displacement.
    let mut samples = vec![(0.0f32, 0.0f32); w * h];
    let mut max_scale = 0.0f32;
    for y in 0..h {
        for x in 0..w {
            let uv = Uv::new(x as f32 / fw, y as f32 / fh);
            let pos = fragment.displace(uv, pointer);
            let dx = pos.x * fw - x as f32;
            let dy = pos.y * fh - y as f32;
            max_scale = max_scale.max(dx.abs()).max(dy.abs());
            samples[y * w + x] = (dx, dy);
        }
    }

    // Floored at 1 so a near-identity fragment encodes as uniform mid-gray
    // instead of amplifying numerical noise.
    let max_scale = max_scale.max(1.0);

    // Pass 2: attenuate the border band, normalize, encode.
    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = samples[y * w + x];

            let edge_distance = x.min(y).min(w - x - 1).min(h - y - 1) as f32;
            let edge_factor = (edge_distance / EDGE_ATTENUATION_BAND).min(1.0);

            let r = (dx * edge_factor) / max_scale + 0.5;
            let g = (dy * edge_factor) / max_scale + 0.5;

            let idx = (y * w + x) * 4;
            pixels[idx] = encode_channel(r);
            pixels[idx + 1] = encode_channel(g);
            pixels[idx + 2] = encode_channel(g);
            pixels[idx + 3] = 255;
        }
    }

    max_scale
}

/// Round half away from zero so a 0.5 normalized value lands on 128, the
/// exact "no displacement" byte.
#[inline(always)]
fn encode_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
