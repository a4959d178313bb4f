//! Box-fill rendering: every data value becomes one pixel coloured from a
//! rainbow palette.
//!
//! Palette layout (256 entries):
//! - index 0: fill (no data), drawn in the background colour or transparent
//! - index 1: black, for values outside the colour scale
//! - indices 2..=255: the rainbow, from the scale minimum to the maximum

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use wms_common::{is_fill, RenderOptions};

use crate::png::{create_png_indexed, PaletteColor, PngError};

const FILL_INDEX: u8 = 0;
const OUT_OF_RANGE_INDEX: u8 = 1;
const FIRST_COLOUR_INDEX: u8 = 2;
/// Number of palette slots the scale is stretched across.
const COLOUR_SLOTS: f32 = 253.0;

/// Control points of the rainbow, from dark blue through red to dark red.
const RAINBOW: [(u8, u8, u8); 63] = [
    (0, 0, 143), (0, 0, 159), (0, 0, 175), (0, 0, 191), (0, 0, 207), (0, 0, 223), (0, 0, 239),
    (0, 0, 255), (0, 11, 255), (0, 27, 255), (0, 43, 255), (0, 59, 255), (0, 75, 255),
    (0, 91, 255), (0, 107, 255), (0, 123, 255), (0, 139, 255), (0, 155, 255), (0, 171, 255),
    (0, 187, 255), (0, 203, 255), (0, 219, 255), (0, 235, 255), (0, 251, 255), (7, 255, 247),
    (23, 255, 231), (39, 255, 215), (55, 255, 199), (71, 255, 183), (87, 255, 167),
    (103, 255, 151), (119, 255, 135), (135, 255, 119), (151, 255, 103), (167, 255, 87),
    (183, 255, 71), (199, 255, 55), (215, 255, 39), (231, 255, 23), (247, 255, 7),
    (255, 247, 0), (255, 231, 0), (255, 215, 0), (255, 199, 0), (255, 183, 0), (255, 167, 0),
    (255, 151, 0), (255, 135, 0), (255, 119, 0), (255, 103, 0), (255, 87, 0), (255, 71, 0),
    (255, 55, 0), (255, 39, 0), (255, 23, 0), (255, 7, 0), (246, 0, 0), (228, 0, 0),
    (211, 0, 0), (193, 0, 0), (175, 0, 0), (158, 0, 0), (140, 0, 0),
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("output format {0} is not supported")]
    UnsupportedFormat(String),

    #[error("no frames to render")]
    NoFrames,

    #[error("frame {index} has {actual} values, expected {expected}")]
    FrameSize {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Png(#[from] PngError),
}

/// An encoded image ready to send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// The value range mapped onto the rainbow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourScale {
    pub min: f32,
    pub max: f32,
}

impl ColourScale {
    /// Smallest and largest non-fill values over all frames, or `None` when
    /// every value is fill.
    pub fn from_frames(frames: &[Arc<Vec<f32>>]) -> Option<Self> {
        let mut values = frames.iter().flat_map(|f| f.iter()).copied().filter(|v| !is_fill(*v));
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    /// Palette index of one value.
    pub fn colour_index(&self, value: f32) -> u8 {
        if is_fill(value) {
            return FILL_INDEX;
        }
        if value < self.min || value > self.max {
            return OUT_OF_RANGE_INDEX;
        }
        let span = self.max - self.min;
        if span <= 0.0 {
            return FIRST_COLOUR_INDEX;
        }
        let slot = (COLOUR_SLOTS / span * (value - self.min)) as u8;
        FIRST_COLOUR_INDEX.saturating_add(slot)
    }
}

/// Builds the 256-entry palette for the given options.
pub fn rainbow_palette(options: &RenderOptions) -> Vec<PaletteColor> {
    let alpha = options.alpha();
    let [bg_r, bg_g, bg_b] = options.bg_rgb();

    let mut palette = Vec::with_capacity(256);
    palette.push((bg_r, bg_g, bg_b, if options.transparent { 0 } else { alpha }));
    palette.push((0, 0, 0, alpha));

    let last = RAINBOW.len() - 1;
    for i in 0..254usize {
        // 63 control points spread over the 254 remaining slots
        let position = (i * last) as f32 / COLOUR_SLOTS;
        let lower = (position as usize).min(last);
        let upper = (lower + 1).min(last);
        let weight = position - lower as f32;
        let blend = |a: u8, b: u8| ((1.0 - weight) * a as f32 + weight * b as f32) as u8;
        let (r0, g0, b0) = RAINBOW[lower];
        let (r1, g1, b1) = RAINBOW[upper];
        palette.push((blend(r0, r1), blend(g0, g1), blend(b0, b1), alpha));
    }
    palette
}

/// Renders data frames as box-fill images.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxFillRenderer;

impl BoxFillRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `frames` (each `width * height` values, row 0 at the top).
    ///
    /// The colour scale comes from `options.scale`, or from the data of all
    /// frames when none is given. PNG has no animation, so only the first
    /// frame is encoded.
    pub fn render(
        &self,
        frames: &[Arc<Vec<f32>>],
        width: usize,
        height: usize,
        options: &RenderOptions,
        mime: &str,
    ) -> Result<RenderedImage, RenderError> {
        if mime != "image/png" {
            return Err(RenderError::UnsupportedFormat(mime.to_string()));
        }
        let first = frames.first().ok_or(RenderError::NoFrames)?;
        let expected = width * height;
        for (index, frame) in frames.iter().enumerate() {
            if frame.len() != expected {
                return Err(RenderError::FrameSize {
                    index,
                    expected,
                    actual: frame.len(),
                });
            }
        }

        let scale = match options.scale {
            Some((min, max)) => ColourScale { min, max },
            // All fill: any scale will do, every pixel maps to index 0
            None => ColourScale::from_frames(frames).unwrap_or(ColourScale { min: 0.0, max: 0.0 }),
        };
        debug!(
            width,
            height,
            frames = frames.len(),
            scale_min = scale.min,
            scale_max = scale.max,
            "Rendering box-fill image"
        );

        let indices: Vec<u8> = first.iter().map(|&v| scale.colour_index(v)).collect();
        let bytes = create_png_indexed(width, height, &rainbow_palette(options), &indices)?;

        Ok(RenderedImage {
            bytes,
            mime: mime.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_common::FILL_VALUE;

    #[test]
    fn test_palette_layout() {
        let palette = rainbow_palette(&RenderOptions::default());
        assert_eq!(palette.len(), 256);
        assert_eq!(palette[0], (255, 255, 255, 255));
        assert_eq!(palette[1], (0, 0, 0, 255));
        assert_eq!(palette[2], (0, 0, 143, 255));
        assert_eq!(palette[255], (140, 0, 0, 255));
    }

    #[test]
    fn test_palette_transparency_and_opacity() {
        let options = RenderOptions {
            transparent: true,
            bgcolor: 0x102030,
            opacity: 50,
            ..Default::default()
        };
        let palette = rainbow_palette(&options);
        assert_eq!(palette[0], (0x10, 0x20, 0x30, 0));
        assert!(palette[1..].iter().all(|c| c.3 == options.alpha()));
    }

    #[test]
    fn test_colour_index() {
        let scale = ColourScale { min: 0.0, max: 253.0 };
        assert_eq!(scale.colour_index(FILL_VALUE), 0);
        assert_eq!(scale.colour_index(-1.0), 1);
        assert_eq!(scale.colour_index(254.0), 1);
        assert_eq!(scale.colour_index(0.0), 2);
        assert_eq!(scale.colour_index(100.0), 102);
        assert_eq!(scale.colour_index(253.0), 255);

        let flat = ColourScale { min: 5.0, max: 5.0 };
        assert_eq!(flat.colour_index(5.0), 2);
    }

    #[test]
    fn test_auto_scale_spans_all_frames() {
        let frames = [Arc::new(vec![1.0, FILL_VALUE]), Arc::new(vec![-3.0, 8.0])];
        assert_eq!(
            ColourScale::from_frames(&frames),
            Some(ColourScale { min: -3.0, max: 8.0 })
        );
        assert_eq!(ColourScale::from_frames(&[Arc::new(vec![FILL_VALUE])]), None);
    }

    #[test]
    fn test_render_errors() {
        let renderer = BoxFillRenderer::new();
        let options = RenderOptions::default();
        assert!(matches!(
            renderer.render(&[], 1, 1, &options, "image/png"),
            Err(RenderError::NoFrames)
        ));
        assert!(matches!(
            renderer.render(&[Arc::new(vec![1.0])], 1, 1, &options, "image/gif"),
            Err(RenderError::UnsupportedFormat(_))
        ));
        let uneven = [Arc::new(vec![1.0, 2.0]), Arc::new(vec![1.0])];
        assert!(matches!(
            renderer.render(&uneven, 2, 1, &options, "image/png"),
            Err(RenderError::FrameSize { index: 1, .. })
        ));
    }
}
