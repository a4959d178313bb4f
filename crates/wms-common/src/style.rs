//! Rendering options carried by map requests.
//!
//! These come from the `TRANSPARENT`, `BGCOLOR`, `SCALE` and `OPACITY`
//! request parameters. `SCALE` and `OPACITY` are extensions to WMS.

use serde::{Deserialize, Serialize};

use crate::{WmsError, WmsResult};

/// How a frame should be coloured and composited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Fill pixels are fully transparent instead of `bgcolor`.
    pub transparent: bool,
    /// Background colour as `0xRRGGBB`.
    pub bgcolor: u32,
    /// Colour scale range; `None` means auto-scale from the data.
    pub scale: Option<(f32, f32)>,
    /// Layer opacity in percent, 0..=100.
    pub opacity: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            transparent: false,
            bgcolor: 0xFFFFFF,
            scale: None,
            opacity: 100,
        }
    }
}

impl RenderOptions {
    /// Parse the four rendering parameters, each given as its raw request
    /// value (callers substitute the defaults `false`, `0xFFFFFF`, `0,0`, `100`).
    pub fn parse(transparent: &str, bgcolor: &str, scale: &str, opacity: &str) -> WmsResult<Self> {
        Ok(Self {
            transparent: parse_transparent(transparent)?,
            bgcolor: parse_bgcolor(bgcolor)?,
            scale: parse_scale(scale)?,
            opacity: parse_opacity(opacity)?,
        })
    }

    /// Background colour as `[r, g, b]`.
    pub fn bg_rgb(&self) -> [u8; 3] {
        [
            ((self.bgcolor >> 16) & 0xFF) as u8,
            ((self.bgcolor >> 8) & 0xFF) as u8,
            (self.bgcolor & 0xFF) as u8,
        ]
    }

    /// Opacity scaled to an 8-bit alpha value.
    pub fn alpha(&self) -> u8 {
        ((self.opacity as u32 * 255 + 50) / 100) as u8
    }
}

pub fn parse_transparent(value: &str) -> WmsResult<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(WmsError::invalid_parameter(
            "transparent",
            "The value of TRANSPARENT must be \"TRUE\" or \"FALSE\"",
        )),
    }
}

pub fn parse_bgcolor(value: &str) -> WmsResult<u32> {
    let invalid = || WmsError::invalid_parameter("bgcolor", format!("Invalid format for BGCOLOR: {}", value));
    let hex = value
        .strip_prefix("0x")
        .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(invalid)?;
    u32::from_str_radix(hex, 16).map_err(|_| invalid())
}

/// `0,0` signals auto-scale and yields `None`.
pub fn parse_scale(value: &str) -> WmsResult<Option<(f32, f32)>> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 2 {
        return Err(WmsError::invalid_parameter(
            "scale",
            "The SCALE parameter must be of the form SCALEMIN,SCALEMAX",
        ));
    }
    let parse = |s: &str| {
        s.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| WmsError::invalid_parameter("scale", "Invalid number in SCALE parameter"))
    };
    let (min, max) = (parse(parts[0])?, parse(parts[1])?);
    if min == 0.0 && max == 0.0 {
        Ok(None)
    } else {
        Ok(Some((min, max)))
    }
}

pub fn parse_opacity(value: &str) -> WmsResult<u8> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|v| (0..=100).contains(v))
        .map(|v| v as u8)
        .ok_or_else(|| {
            WmsError::invalid_parameter(
                "opacity",
                "The OPACITY parameter must be a valid number in the range 0 to 100 inclusive",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_to_default_options() {
        let opts = RenderOptions::parse("false", "0xFFFFFF", "0,0", "100").unwrap();
        assert_eq!(opts, RenderOptions::default());
        assert_eq!(opts.alpha(), 255);
    }

    #[test]
    fn test_transparent_is_case_insensitive() {
        assert!(parse_transparent("TRUE").unwrap());
        assert!(!parse_transparent("False").unwrap());
        assert!(parse_transparent("yes").is_err());
    }

    #[test]
    fn test_bgcolor() {
        assert_eq!(parse_bgcolor("0x00FF80").unwrap(), 0x00FF80);
        let opts = RenderOptions {
            bgcolor: 0x102030,
            ..Default::default()
        };
        assert_eq!(opts.bg_rgb(), [0x10, 0x20, 0x30]);
        for bad in ["FFFFFF", "0xFFFFF", "0xFFFFFFF", "0xGGGGGG", "#FFFFFF"] {
            assert!(
                matches!(parse_bgcolor(bad), Err(WmsError::InvalidParameter { .. })),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_scale() {
        assert_eq!(parse_scale("0,0").unwrap(), None);
        assert_eq!(parse_scale("-2.5,30").unwrap(), Some((-2.5, 30.0)));
        assert!(parse_scale("1").is_err());
        assert!(parse_scale("1,x").is_err());
    }

    #[test]
    fn test_opacity() {
        assert_eq!(parse_opacity("0").unwrap(), 0);
        assert_eq!(parse_opacity("100").unwrap(), 100);
        assert!(parse_opacity("101").is_err());
        assert!(parse_opacity("-1").is_err());
        assert!(parse_opacity("half").is_err());
        let opts = RenderOptions {
            opacity: 50,
            ..Default::default()
        };
        assert_eq!(opts.alpha(), 128);
    }
}
