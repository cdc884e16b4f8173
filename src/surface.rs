//! Regeneration lifecycle for one observed surface.
//!
//! The controller is driven by two inputs, "size changed" and "visibility
//! changed", decoupled from whatever observer mechanism produces them. It
//! owns at most one generator at a time; replacing the size drops the old
//! generator before the new one allocates, and a destroyed controller can
//! never touch a generator again because it no longer has one.

use crate::fragment::{Fragment, Uv};
use crate::generator::{DisplacementGenerator, GeneratorError};

/// Size deltas below this many pixels (in both dimensions) do not trigger
/// regeneration. Guards against sub-pixel layout jitter thrashing the
/// generator on every layout pass.
pub const RESIZE_HYSTERESIS_PX: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
    Uninitialized,
    Ready,
    Destroyed,
}

pub struct SurfaceController<F: Fragment + Clone> {
    fragment: F,
    phase: SurfacePhase,
    visible: bool,
    pending_size: Option<(u32, u32)>,
    generated_size: Option<(u32, u32)>,
    generator: Option<DisplacementGenerator<F>>,
    map: Option<String>,
    generation: u64,
}

impl<F: Fragment + Clone> SurfaceController<F> {
    pub fn new(fragment: F) -> Self {
        Self {
            fragment,
            phase: SurfacePhase::Uninitialized,
            visible: true,
            pending_size: None,
            generated_size: None,
            generator: None,
            map: None,
            generation: 0,
        }
    }

    /// Report a new observed size.
    ///
    /// Zero-sized surfaces are skipped outright (degenerate geometry is a
    /// caller-side condition, and this effect is cosmetic). While hidden the
    /// size is only recorded; generation happens when the surface is next
    /// visible.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GeneratorError> {
        if self.phase == SurfacePhase::Destroyed {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.pending_size = Some((width, height));
        if !self.visible {
            return Ok(());
        }
        self.apply_pending()
    }

    /// Report a visibility change. Becoming visible applies any size that
    /// arrived while hidden, through the same hysteresis check.
    pub fn set_visible(&mut self, visible: bool) -> Result<(), GeneratorError> {
        if self.phase == SurfacePhase::Destroyed {
            return Ok(());
        }

        self.visible = visible;
        if visible {
            self.apply_pending()
        } else {
            Ok(())
        }
    }

    /// Re-evaluate the current generator with a pointer position.
    ///
    /// Pointer tracking regenerates the map in place; it does not rebuild
    /// the generator and is skipped entirely while hidden or before the
    /// first resize.
    pub fn pointer_moved(&mut self, pointer: Uv) -> Result<(), GeneratorError> {
        if self.phase != SurfacePhase::Ready || !self.visible {
            return Ok(());
        }
        let Some(generator) = self.generator.as_mut() else {
            return Ok(());
        };

        self.map = Some(generator.update_data_url(Some(pointer))?);
        Ok(())
    }

    /// Drop the generator and enter the terminal phase. All later inputs
    /// are no-ops.
    pub fn destroy(&mut self) {
        self.generator = None;
        self.map = None;
        self.phase = SurfacePhase::Destroyed;
    }

    pub fn phase(&self) -> SurfacePhase {
        self.phase
    }

    /// Counts generator rebuilds. Unchanged when hysteresis or visibility
    /// gating skips a resize.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The data URL from the most recent generation, if any.
    pub fn current_map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn generated_size(&self) -> Option<(u32, u32)> {
        self.generated_size
    }

    fn apply_pending(&mut self) -> Result<(), GeneratorError> {
        let Some((width, height)) = self.pending_size else {
            return Ok(());
        };

        if let Some((generated_width, generated_height)) = self.generated_size {
            if width.abs_diff(generated_width) < RESIZE_HYSTERESIS_PX
                && height.abs_diff(generated_height) < RESIZE_HYSTERESIS_PX
            {
                return Ok(());
            }
        }

        // Drop the previous backing buffer before the replacement allocates.
        self.generator = None;

        let mut generator = DisplacementGenerator::new(width, height, self.fragment.clone())?;
        let map = generator.update_data_url(None)?;

        self.generator = Some(generator);
        self.map = Some(map);
        self.generated_size = Some((width, height));
        self.generation += 1;
        self.phase = SurfacePhase::Ready;
        Ok(())
    }
}
