//! lensmap: headless, deterministic compiler for displacement maps.
//!
//! A displacement map is a raster whose channels encode per-pixel coordinate
//! offsets: R carries X displacement, B carries Y displacement (G duplicates
//! B for the downstream filter's channel selectors), and 128 is "no
//! displacement". lensmap synthesizes such maps from a lens-shaped fragment
//! function, serializes them as PNG data URLs, and can either emit the SVG
//! filter chain that consumes them or apply them directly to an image.

pub mod compositor;
pub mod encode;
pub mod filter;
pub mod fragment;
pub mod generator;
pub mod manifest;
pub mod schema;
pub mod sdf;
pub mod surface;
