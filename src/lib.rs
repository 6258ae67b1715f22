//! Software rasterization core for a fixed-function pipeline.
//!
//! Fills already-projected triangles into a render-target tile with
//! depth-tested, textured, alpha-tested, blended and color-masked pixels,
//! processing 2x2 quads through the per-fragment pipeline.

// Public API - exposed to library consumers
pub mod math;
pub mod raster;
pub mod simd;
pub mod state;
pub mod target;
pub mod texture;

// Re-export commonly needed types at crate root for convenience
pub use raster::{rasterize, rasterize_indexed, RasterVertex, Triangle};
pub use state::DrawState;
pub use target::{RenderTarget, TileBuffer};
pub use texture::{NearestSampler, TextureObject, TextureSampler};
