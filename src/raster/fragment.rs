//! Per-quad fragment pipeline.
//!
//! Executes the fixed-function per-fragment operations for one covered 2x2
//! quad: depth test, perspective-correct attribute interpolation, texture
//! environment per unit, alpha test, blending, packing, color mask and the
//! masked backbuffer store. Lanes whose mask bit is clear never modify the
//! target.

use log::warn;

use crate::raster::gradient::AttributeGradients;
use crate::simd::{ColorQuad, QuadF32, QuadI32};
use crate::state::{BlendFactor, DrawState, TexEnv, TexEnvMode, TextureBaseFormat};
use crate::texture::{TexCoordQuad, TextureSampler};

/// Shades one quad at pixel (x, y) whose coverage mask has at least one lane
/// set. `offset` addresses the quad's four entries in both buffers.
#[allow(clippy::too_many_arguments)]
pub(crate) fn shade_quad<S: TextureSampler>(
    state: &DrawState,
    sampler: &S,
    grads: &AttributeGradients,
    z_offset: QuadF32,
    x: i32,
    y: QuadF32,
    mut mask: QuadI32,
    color: &mut [u32],
    depth: &mut [f32],
    offset: usize,
) {
    let x = QuadF32::splat(x as f32);

    // Early depth test. The passing depth values are kept around in case the
    // write has to happen after the alpha test.
    let mut depth_values = None;

    if state.depth.test_enabled {
        let buffer_z = QuadF32::from_slice(&depth[offset..offset + 4]);
        let current_z = z_offset + grads.z.at(x, y);

        mask = mask & state.depth.func.compare(current_z, buffer_z);
        if !mask.any() {
            return;
        }

        if state.depth.write_enabled && !state.deferred_depth_write {
            buffer_z
                .blend(current_z, mask)
                .write_to(&mut depth[offset..offset + 4]);
        }

        depth_values = Some((buffer_z, current_z));
    }

    // Perspective w from the linearly interpolated reciprocal.
    let w = grads.rcp_w.at(x, y).recip();

    let mut src_color = ColorQuad {
        r: grads.red.at(x, y) * w,
        g: grads.green.at(x, y) * w,
        b: grads.blue.at(x, y) * w,
        a: grads.alpha.at(x, y) * w,
    };

    // Texture environment, unit by unit in index order.
    for (unit, tex_grads) in state.texture_units.iter().zip(&grads.tex) {
        let Some(texture) = unit.texture else {
            continue;
        };

        let coords = TexCoordQuad {
            s: tex_grads.s.at(x, y) * w,
            t: tex_grads.t.at(x, y) * w,
            r: tex_grads.r.at(x, y) * w,
            q: tex_grads.q.at(x, y) * w,
        };
        let tex_color = sampler.sample(texture, &unit.params, &coords);

        apply_tex_env(&mut src_color, &tex_color, &unit.env, texture.format());
    }

    // Alpha test
    if state.alpha.enabled {
        let reference = QuadF32::splat(state.alpha.reference);

        mask = mask & state.alpha.func.compare(src_color.a, reference);
        if !mask.any() {
            return;
        }

        // The depth write deferred to this point sees the alpha-test mask,
        // which realizes the specified fragment ordering while still keeping
        // the early depth rejection above.
        if state.deferred_depth_write && state.depth.write_enabled {
            if let Some((buffer_z, current_z)) = depth_values {
                buffer_z
                    .blend(current_z, mask)
                    .write_to(&mut depth[offset..offset + 4]);
            }
        }
    }

    // Blending with the color buffer
    let backbuffer = QuadI32::from_u32_slice(&color[offset..offset + 4]);

    if state.blend.enabled {
        let dst_color = ColorQuad::unpack(backbuffer);
        let src_factor = blend_factor(state.blend.src_factor, &src_color, &dst_color);
        let dst_factor = blend_factor(state.blend.dst_factor, &src_color, &dst_color);

        src_color = ColorQuad {
            r: src_color.r.mul_add(src_factor.r, dst_color.r * dst_factor.r),
            g: src_color.g.mul_add(src_factor.g, dst_color.g * dst_factor.g),
            b: src_color.b.mul_add(src_factor.b, dst_color.b * dst_factor.b),
            a: src_color.a.mul_add(src_factor.a, dst_color.a * dst_factor.a),
        };
    }

    // Pack, apply the color mask, and store through the coverage mask so
    // untouched lanes keep their backbuffer value.
    let packed = src_color
        .pack()
        .merge_bits(backbuffer, QuadI32::splat(state.color_mask as i32));

    backbuffer
        .blend(packed, mask)
        .write_to_u32(&mut color[offset..offset + 4]);
}

/// Applies one unit's texture environment to the fragment color.
///
/// Rows of the mode/format table that are undefined (e.g. DECAL on an alpha
/// texture) leave the fragment untouched.
fn apply_tex_env(src: &mut ColorQuad, tex: &ColorQuad, env: &TexEnv, format: TextureBaseFormat) {
    use TextureBaseFormat::*;

    let one = QuadF32::splat(1.0);

    match env.mode {
        TexEnvMode::Replace => match format {
            Alpha => src.a = tex.a,
            Luminance | Rgb => {
                src.r = tex.r;
                src.g = tex.g;
                src.b = tex.b;
            }
            LuminanceAlpha | Intensity | Rgba => *src = *tex,
        },

        TexEnvMode::Modulate => match format {
            Alpha => src.a = src.a * tex.a,
            LuminanceAlpha | Intensity | Rgba => {
                src.a = src.a * tex.a;
                src.r = src.r * tex.r;
                src.g = src.g * tex.g;
                src.b = src.b * tex.b;
            }
            Luminance | Rgb => {
                src.r = src.r * tex.r;
                src.g = src.g * tex.g;
                src.b = src.b * tex.b;
            }
        },

        TexEnvMode::Decal => match format {
            Rgb => {
                src.r = tex.r;
                src.g = tex.g;
                src.b = tex.b;
            }
            Rgba => {
                src.r = QuadF32::lerp(src.r, tex.r, tex.a);
                src.g = QuadF32::lerp(src.g, tex.g, tex.a);
                src.b = QuadF32::lerp(src.b, tex.b, tex.a);
            }
            _ => {}
        },

        TexEnvMode::Add => match format {
            Alpha => src.a = src.a * tex.a,
            LuminanceAlpha | Rgba => {
                src.a = src.a * tex.a;
                src.r = one.min(src.r + tex.r);
                src.g = one.min(src.g + tex.g);
                src.b = one.min(src.b + tex.b);
            }
            Luminance | Rgb => {
                src.r = one.min(src.r + tex.r);
                src.g = one.min(src.g + tex.g);
                src.b = one.min(src.b + tex.b);
            }
            Intensity => {
                src.a = one.min(src.a + tex.a);
                src.r = one.min(src.r + tex.r);
                src.g = one.min(src.g + tex.g);
                src.b = one.min(src.b + tex.b);
            }
        },

        TexEnvMode::Blend => {
            let const_r = QuadF32::splat(env.color.x);
            let const_g = QuadF32::splat(env.color.y);
            let const_b = QuadF32::splat(env.color.z);

            match format {
                Alpha => src.a = src.a * tex.a,
                LuminanceAlpha | Rgba => {
                    src.a = src.a * tex.a;
                    src.r = QuadF32::lerp(tex.r, src.r, const_r);
                    src.g = QuadF32::lerp(tex.g, src.g, const_g);
                    src.b = QuadF32::lerp(tex.b, src.b, const_b);
                }
                Luminance | Rgb => {
                    src.r = QuadF32::lerp(tex.r, src.r, const_r);
                    src.g = QuadF32::lerp(tex.g, src.g, const_g);
                    src.b = QuadF32::lerp(tex.b, src.b, const_b);
                }
                Intensity => {
                    src.a = QuadF32::lerp(tex.a, src.a, QuadF32::splat(env.color.w));
                    src.r = QuadF32::lerp(tex.r, src.r, const_r);
                    src.g = QuadF32::lerp(tex.g, src.g, const_g);
                    src.b = QuadF32::lerp(tex.b, src.b, const_b);
                }
            }
        }

        // TODO: implement the combine stage instead of the magenta stub
        TexEnvMode::Combine => {
            warn!("combine texture environment is not implemented");
            *src = ColorQuad::splat(1.0, 0.0, 1.0, 1.0);
        }
    }
}

/// Per-channel blend factor. The alpha channel uses the alpha component of
/// vector sources; the color channels use the per-channel component.
fn blend_factor(factor: BlendFactor, src: &ColorQuad, dst: &ColorQuad) -> ColorQuad {
    let zero = QuadF32::splat(0.0);
    let one = QuadF32::splat(1.0);

    match factor {
        BlendFactor::Zero => ColorQuad {
            r: zero,
            g: zero,
            b: zero,
            a: zero,
        },
        BlendFactor::One => ColorQuad {
            r: one,
            g: one,
            b: one,
            a: one,
        },
        BlendFactor::SrcColor => *src,
        BlendFactor::OneMinusSrcColor => ColorQuad {
            r: one - src.r,
            g: one - src.g,
            b: one - src.b,
            a: one - src.a,
        },
        BlendFactor::DstColor => *dst,
        BlendFactor::OneMinusDstColor => ColorQuad {
            r: one - dst.r,
            g: one - dst.g,
            b: one - dst.b,
            a: one - dst.a,
        },
        BlendFactor::SrcAlpha => ColorQuad {
            r: src.a,
            g: src.a,
            b: src.a,
            a: src.a,
        },
        BlendFactor::OneMinusSrcAlpha => {
            let f = one - src.a;
            ColorQuad {
                r: f,
                g: f,
                b: f,
                a: f,
            }
        }
        BlendFactor::DstAlpha => ColorQuad {
            r: dst.a,
            g: dst.a,
            b: dst.a,
            a: dst.a,
        },
        BlendFactor::OneMinusDstAlpha => {
            let f = one - dst.a;
            ColorQuad {
                r: f,
                g: f,
                b: f,
                a: f,
            }
        }
        BlendFactor::SrcAlphaSaturate => {
            let f = src.a.min(one - dst.a);
            ColorQuad {
                r: f,
                g: f,
                b: f,
                a: one,
            }
        }
    }
}
