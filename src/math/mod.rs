//! Small vector math used by the raster core.

pub mod vec4;

pub use vec4::Vec4;
