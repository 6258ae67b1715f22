//! Triangle rasterization core.
//!
//! [`rasterize`] fills one already-projected triangle into a render-target
//! tile, running the complete fixed-function per-fragment pipeline over 2x2
//! pixel quads. Triangles arrive raster-ready: screen-space positions,
//! reciprocal w, and attributes already divided by the view-space w.

mod edge;
mod fragment;
mod gradient;

use log::trace;

use crate::math::Vec4;
use crate::simd::QuadF32;
use crate::state::{DrawState, MAX_TEXTURE_UNITS};
use crate::target::RenderTarget;
use crate::texture::TextureSampler;

use edge::EdgeEquation;
use gradient::{AttributeGradients, GradientEquation, TexCoordGradients};

/// One raster-ready vertex.
///
/// `position` holds screen-space x and y in (fractional) pixels, z in [0, 1]
/// depth-buffer space, and w = 1 / view-space w. `color` and `tex_coords`
/// must already be divided by the view-space w so that they interpolate
/// linearly in screen space; the pipeline multiplies the interpolated values
/// back by the per-pixel w.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterVertex {
    pub position: Vec4,
    pub color: Vec4,
    pub tex_coords: [Vec4; MAX_TEXTURE_UNITS],
}

impl RasterVertex {
    /// Vertex with all texture coordinates zeroed.
    pub fn new(position: Vec4, color: Vec4) -> Self {
        Self {
            position,
            color,
            tex_coords: [Vec4::ZERO; MAX_TEXTURE_UNITS],
        }
    }
}

/// An ordered triple of raster-ready vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [RasterVertex; 3],
}

impl Triangle {
    pub fn new(vertices: [RasterVertex; 3]) -> Self {
        Self { vertices }
    }
}

/// Rasterizes the selected triangles in submission order.
pub fn rasterize_indexed<S: TextureSampler>(
    triangles: &[Triangle],
    indices: &[usize],
    state: &DrawState,
    sampler: &S,
    target: &mut RenderTarget,
) {
    for &index in indices {
        rasterize(&triangles[index], state, sampler, target);
    }
}

/// Rasterizes one triangle into the target tile.
///
/// The triangle must be non-degenerate (its signed screen-space area is not
/// zero); degenerate input is a programmer error caught by a debug assert.
pub fn rasterize<S: TextureSampler>(
    triangle: &Triangle,
    state: &DrawState,
    sampler: &S,
    target: &mut RenderTarget,
) {
    let v1 = triangle.vertices[0].position;
    let v2 = triangle.vertices[1].position;
    let v3 = triangle.vertices[2].position;

    // Signed reciprocal area of the triangle as submitted. The sign feeds
    // the gradient slopes; the edge equations use a vertex order chosen so
    // their interior test is always `value > 0`.
    let rcp_area = 1.0 / ((v2.x - v1.x) * (v3.y - v1.y) - (v2.y - v1.y) * (v3.x - v1.x));
    debug_assert!(rcp_area.is_finite(), "degenerate triangle");

    // Fixed point coordinates with 4 subpixel bits
    let to_fixed = |c: f32| (c * 16.0) as i32;

    let (x1, y1) = (to_fixed(v1.x), to_fixed(v1.y));
    let ((x2, y2), (x3, y3)) = if rcp_area < 0.0 {
        (
            (to_fixed(v2.x), to_fixed(v2.y)),
            (to_fixed(v3.x), to_fixed(v3.y)),
        )
    } else {
        (
            (to_fixed(v3.x), to_fixed(v3.y)),
            (to_fixed(v2.x), to_fixed(v2.y)),
        )
    };

    // Bounding box against the tile, then the scissor rect
    let mut min_y = ((y1.min(y2).min(y3) + 0x0f) >> 4).max(target.min_y());
    let mut max_y = ((y1.max(y2).max(y3) + 0x0f) >> 4).min(target.max_y());
    let mut min_x = ((x1.min(x2).min(x3) + 0x0f) >> 4).max(target.min_x());
    let mut max_x = ((x1.max(x2).max(x3) + 0x0f) >> 4).min(target.max_x());

    if state.scissor.enabled {
        state
            .scissor
            .cut(&mut min_x, &mut min_y, &mut max_x, &mut max_y);
    }

    // Rasterization starts at the top-left pixel of a quad; the width is
    // rounded up to whole quads.
    min_x &= !1;
    min_y &= !1;

    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let width = (1 + (max_x - min_x)) & !1;

    trace!(
        "rasterize bbox ({}..{}, {}..{}) width {}",
        min_x,
        max_x,
        min_y,
        max_y,
        width
    );

    // Write position into the quad-interleaved color and depth buffers
    let start_x = min_x - target.min_x();
    let start_y = min_y - target.min_y();
    let tile_width = target.width();

    let mut offset = ((start_x << 1) + start_y * tile_width) as usize;
    let stride = ((tile_width - width) << 1) as usize;

    // Edge equations over the reordered vertices
    let (dx12, dx23, dx31) = (x1 - x2, x2 - x3, x3 - x1);
    let (dy12, dy23, dy31) = (y1 - y2, y2 - y3, y3 - y1);

    let mut edges = [
        EdgeEquation::new(x1, y1, dx12, dy12, min_x, min_y, width),
        EdgeEquation::new(x2, y2, dx23, dy23, min_x, min_y, width),
        EdgeEquation::new(x3, y3, dx31, dy31, min_x, min_y, width),
    ];

    // Gradient equations over the vertices as submitted
    let fdx21 = v2.x - v1.x;
    let fdy21 = v2.y - v1.y;
    let fdx31 = v3.x - v1.x;
    let fdy31 = v3.y - v1.y;

    let grad = |q1: f32, q2: f32, q3: f32| {
        GradientEquation::new(q1, q2, q3, v1.x, v1.y, fdx21, fdy21, fdx31, fdy31, rcp_area)
    };

    let c = [
        triangle.vertices[0].color,
        triangle.vertices[1].color,
        triangle.vertices[2].color,
    ];

    let grads = AttributeGradients {
        z: grad(v1.z, v2.z, v3.z),
        rcp_w: grad(v1.w, v2.w, v3.w),
        red: grad(c[0].x, c[1].x, c[2].x),
        green: grad(c[0].y, c[1].y, c[2].y),
        blue: grad(c[0].z, c[1].z, c[2].z),
        alpha: grad(c[0].w, c[1].w, c[2].w),
        tex: std::array::from_fn(|i| {
            let t = [
                triangle.vertices[0].tex_coords[i],
                triangle.vertices[1].tex_coords[i],
                triangle.vertices[2].tex_coords[i],
            ];
            TexCoordGradients {
                s: grad(t[0].x, t[1].x, t[2].x),
                t: grad(t[0].y, t[1].y, t[2].y),
                r: grad(t[0].z, t[1].z, t[2].z),
                q: grad(t[0].w, t[1].w, t[2].w),
            }
        }),
    };

    // Polygon offset bias from the maximum depth slope
    let z_offset = if state.polygon_offset.fill_enabled {
        let m = QuadF32::splat(grads.z.dqdx())
            .abs()
            .max(QuadF32::splat(grads.z.dqdy()).abs());
        m.mul_add(
            QuadF32::splat(state.polygon_offset.factor),
            QuadF32::splat(state.polygon_offset.r_times_units),
        )
    } else {
        QuadF32::splat(0.0)
    };

    // Walk the bounding box in quads. Edge values advance incrementally;
    // gradients are re-evaluated from the quad position inside the fragment
    // pipeline.
    let (color, depth) = target.buffers();

    let mut y = min_y;
    while y < max_y {
        let y_quad = QuadF32::splat(y as f32);

        let mut x = min_x;
        while x < max_x {
            let coverage = edges[0].coverage() & edges[1].coverage() & edges[2].coverage();
            if coverage.any() {
                fragment::shade_quad(
                    state, sampler, &grads, z_offset, x, y_quad, coverage, color, depth, offset,
                );
            }

            for edge in edges.iter_mut() {
                edge.step_x();
            }
            offset += 4;
            x += 2;
        }

        for edge in edges.iter_mut() {
            edge.step_y();
        }
        offset += stride;
        y += 2;
    }
}
