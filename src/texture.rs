//! Texture objects and the sampler seam.
//!
//! The raster core is agnostic to filtering and wrap policy: it hands a
//! texture object, its sampling parameters and a four-lane coordinate quad to
//! a [`TextureSampler`] and gets four RGBA lanes back. Any sampler honoring
//! that contract is acceptable; [`NearestSampler`] is the reference
//! implementation used by the tests and benchmarks.

use std::fmt;
use std::path::Path;

use crate::simd::{ColorQuad, QuadF32};
use crate::state::TextureBaseFormat;

/// Error produced while building a texture object.
#[derive(Debug)]
pub enum TextureError {
    Image(image::ImageError),
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Image(e) => write!(f, "failed to decode image: {}", e),
            TextureError::SizeMismatch { expected, actual } => {
                write!(f, "texel data has {} entries, expected {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::Image(e)
    }
}

/// Wrap behavior for coordinates outside [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// Sampling parameters handed through to the sampler.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextureParams {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

/// A texture with ARGB texel storage and a base format.
///
/// The base format does not change how texels are stored; it selects which
/// channels the texture environment combines into the fragment.
pub struct TextureObject {
    format: TextureBaseFormat,
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl TextureObject {
    /// Wraps existing `0xAARRGGBB` texel data.
    pub fn new(
        format: TextureBaseFormat,
        width: u32,
        height: u32,
        data: Vec<u32>,
    ) -> Result<Self, TextureError> {
        let expected = (width * height) as usize;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            format,
            width,
            height,
            data,
        })
    }

    /// Load a texture from an image file (PNG, JPG, etc.) as RGBA.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();

        // Convert RGBA bytes to ARGB u32
        let data: Vec<u32> = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            })
            .collect();

        Self::new(TextureBaseFormat::Rgba, width, height, data)
    }

    pub fn format(&self) -> TextureBaseFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at integer coordinates, packed as `0xAARRGGBB`.
    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> u32 {
        self.data[(y * self.width + x) as usize]
    }
}

impl fmt::Debug for TextureObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureObject")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Four-lane (s, t, r, q) texture coordinates.
#[derive(Clone, Copy, Debug)]
pub struct TexCoordQuad {
    pub s: QuadF32,
    pub t: QuadF32,
    pub r: QuadF32,
    pub q: QuadF32,
}

/// The sampling seam between the raster core and texture filtering.
///
/// Implementations receive perspective-corrected (s, t, r, q) for four pixels
/// and return RGBA lanes in [0, 1].
pub trait TextureSampler {
    fn sample(
        &self,
        texture: &TextureObject,
        params: &TextureParams,
        coords: &TexCoordQuad,
    ) -> ColorQuad;
}

/// Nearest-neighbor sampler over the 2D (s, t) plane; r and q are ignored.
pub struct NearestSampler;

impl NearestSampler {
    #[inline]
    fn wrap(coord: f32, mode: WrapMode, size: u32) -> u32 {
        let normalized = match mode {
            // rem_euclid handles negative values correctly, unlike %
            WrapMode::Repeat => coord.rem_euclid(1.0),
            WrapMode::ClampToEdge => coord.clamp(0.0, 1.0),
        };
        ((normalized * size as f32) as u32).min(size - 1)
    }
}

impl TextureSampler for NearestSampler {
    fn sample(
        &self,
        texture: &TextureObject,
        params: &TextureParams,
        coords: &TexCoordQuad,
    ) -> ColorQuad {
        let mut texels = [0u32; 4];
        for (i, texel) in texels.iter_mut().enumerate() {
            let x = Self::wrap(coords.s.lane(i), params.wrap_s, texture.width());
            let y = Self::wrap(coords.t.lane(i), params.wrap_t, texture.height());
            *texel = texture.texel(x, y);
        }

        let normalize = QuadF32::splat(1.0 / 255.0);
        let channel = |shift: u32| {
            QuadF32::new(
                ((texels[0] >> shift) & 0xff) as f32,
                ((texels[1] >> shift) & 0xff) as f32,
                ((texels[2] >> shift) & 0xff) as f32,
                ((texels[3] >> shift) & 0xff) as f32,
            ) * normalize
        };

        ColorQuad {
            a: channel(24),
            r: channel(16),
            g: channel(8),
            b: channel(0),
        }
    }
}
