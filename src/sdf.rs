//! Scalar geometry primitives for the lens fragment function.
//!
//! Self-contained and deterministic: no allocations, no external math crate,
//! plain `f32` throughout.

/// Signed distance from a point to a rounded rectangle centered at the origin.
///
/// `half_width` and `half_height` are the box half-extents, `radius` the
/// corner radius. Negative inside, zero on the boundary, positive outside.
///
/// The function does not validate `radius <= min(half_width, half_height)`;
/// an over-large radius is a legitimate way to produce a strongly rounded
/// shape and manifest validation bounds it separately.
#[inline(always)]
pub fn rounded_rect_sdf(x: f32, y: f32, half_width: f32, half_height: f32, radius: f32) -> f32 {
    let qx = x.abs() - half_width + radius;
    let qy = y.abs() - half_height + radius;
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    qx.max(qy).min(0.0) + outside - radius
}

/// Cubic Hermite easing between `edge0` and `edge1`.
///
/// Accepts a descending edge pair (`edge0 > edge1`), which flips the ease
/// direction: the result is 1 at `edge1` and 0 at `edge0`. The lens falloff
/// relies on this to get a flat interior with a sharp boundary transition.
#[inline(always)]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
