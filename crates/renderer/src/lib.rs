//! Image rendering for gridded data.
//!
//! - [`boxfill`]: one rainbow-coloured pixel per data value
//! - [`png`]: hand-written indexed PNG encoder

pub mod boxfill;
pub mod png;

pub use boxfill::{BoxFillRenderer, ColourScale, RenderError, RenderedImage};
pub use png::PngError;
