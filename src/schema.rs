use anyhow::{bail, Result};
use serde::Deserialize;

use crate::filter::FilterChainSpec;
use crate::fragment::LiquidGlass;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub surface: Surface,
    #[serde(default)]
    pub lens: LensConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Manifest {
    pub fn validate(&self) -> Result<()> {
        self.surface.validate()?;
        self.lens.validate()?;
        self.filter.validate()?;
        Ok(())
    }
}

/// Logical size of the surface being distorted.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!(
                "surface dimensions must be positive, got {}x{}",
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

/// Lens shape parameters in normalized surface coordinates.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LensConfig {
    pub half_width: f32,
    pub half_height: f32,
    pub corner_radius: f32,
    pub falloff_start: f32,
}

impl Default for LensConfig {
    fn default() -> Self {
        let lens = LiquidGlass::default();
        Self {
            half_width: lens.half_width,
            half_height: lens.half_height,
            corner_radius: lens.corner_radius,
            falloff_start: lens.falloff_start,
        }
    }
}

impl LensConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("lens.half_width", self.half_width),
            ("lens.half_height", self.half_height),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 0.5 {
                bail!("{name} must be in (0, 0.5], got {value}");
            }
        }

        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            bail!(
                "lens.corner_radius must be non-negative, got {}",
                self.corner_radius
            );
        }
        // Radii past the half extents are how the over-rounded lens is made,
        // but far past them the distance field stops describing a shape.
        let radius_limit = self.half_width.min(self.half_height) + 0.5;
        if self.corner_radius > radius_limit {
            bail!(
                "lens.corner_radius {} exceeds the usable limit {radius_limit} for half extents {}x{}",
                self.corner_radius,
                self.half_width,
                self.half_height
            );
        }

        if !self.falloff_start.is_finite() || self.falloff_start <= 0.0 {
            bail!(
                "lens.falloff_start must be positive, got {}",
                self.falloff_start
            );
        }
        Ok(())
    }

    pub fn to_fragment(&self) -> LiquidGlass {
        LiquidGlass {
            half_width: self.half_width,
            half_height: self.half_height,
            corner_radius: self.corner_radius,
            falloff_start: self.falloff_start,
        }
    }
}

/// Downstream filter chain parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterConfig {
    pub scale: f32,
    pub aberration: f32,
    pub blur: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let chain = FilterChainSpec::default();
        Self {
            scale: chain.scale,
            aberration: chain.aberration,
            blur: chain.blur,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() {
            bail!("filter.scale must be finite, got {}", self.scale);
        }
        if !self.aberration.is_finite() || self.aberration < 0.0 {
            bail!(
                "filter.aberration must be non-negative, got {}",
                self.aberration
            );
        }
        if !self.blur.is_finite() || self.blur < 0.0 {
            bail!("filter.blur must be non-negative, got {}", self.blur);
        }
        Ok(())
    }

    pub fn to_chain(&self) -> FilterChainSpec {
        FilterChainSpec {
            scale: self.scale,
            aberration: self.aberration,
            blur: self.blur,
            ..FilterChainSpec::default()
        }
    }
}
