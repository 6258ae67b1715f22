//! Attribute gradients over screen space.
//!
//! Each interpolated attribute is a linear plane `q(x, y) = q0 + x * dq/dx +
//! y * dq/dy`. The four-lane value is pre-offset to the quad's pixel
//! positions, so evaluating at the quad base yields all four pixels at once.
//!
//! Evaluation is not incremental: the plane is recomputed from the quad
//! position every time. Stepping an accumulator across a span accumulates
//! rounding drift that shows up as banding over long spans.

use crate::simd::QuadF32;
use crate::state::MAX_TEXTURE_UNITS;

pub(crate) struct GradientEquation {
    value: QuadF32,
    dqdx: f32,
    dqdy: f32,
}

impl GradientEquation {
    /// Builds the plane through attribute values (q1, q2, q3) at the
    /// triangle's vertices. `(x1, y1)` is the first vertex position,
    /// `(dx21, dy21, dx31, dy31)` the screen-space deltas of the other two,
    /// and `rcp_area` the signed reciprocal area of the unswapped vertex
    /// order.
    pub fn new(
        q1: f32,
        q2: f32,
        q3: f32,
        x1: f32,
        y1: f32,
        dx21: f32,
        dy21: f32,
        dx31: f32,
        dy31: f32,
        rcp_area: f32,
    ) -> Self {
        let dq21 = q2 - q1;
        let dq31 = q3 - q1;
        let dqdx = rcp_area * (dq21 * dy31 - dq31 * dy21);
        let dqdy = rcp_area * (dq31 * dx21 - dq21 * dx31);

        // Interpolant value at the screen-space origin
        let value = q1 - x1 * dqdx - y1 * dqdy;

        Self {
            value: QuadF32::new(value, value + dqdx, value + dqdy, value + dqdx + dqdy),
            dqdx,
            dqdy,
        }
    }

    /// Evaluates the plane at the quad whose base pixel is broadcast in
    /// (x, y).
    #[inline]
    pub fn at(&self, x: QuadF32, y: QuadF32) -> QuadF32 {
        y.mul_add(
            QuadF32::splat(self.dqdy),
            x.mul_add(QuadF32::splat(self.dqdx), self.value),
        )
    }

    pub fn dqdx(&self) -> f32 {
        self.dqdx
    }

    pub fn dqdy(&self) -> f32 {
        self.dqdy
    }
}

/// Gradients of the (s, t, r, q) coordinates of one texture unit.
pub(crate) struct TexCoordGradients {
    pub s: GradientEquation,
    pub t: GradientEquation,
    pub r: GradientEquation,
    pub q: GradientEquation,
}

/// All gradients set up for one triangle.
pub(crate) struct AttributeGradients {
    pub z: GradientEquation,
    pub rcp_w: GradientEquation,
    pub red: GradientEquation,
    pub green: GradientEquation,
    pub blue: GradientEquation,
    pub alpha: GradientEquation,
    pub tex: [TexCoordGradients; MAX_TEXTURE_UNITS],
}
