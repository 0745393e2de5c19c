//! Style configuration loaded from JSON.
//!
//! The fields mirror the options of the QR generation form: background color or
//! transparency, border width/radius/color, padding and an optional logo file.
//!
//! ```json
//! {
//!   "bg_color": "white",
//!   "border_width": 10,
//!   "border_radius": 20,
//!   "border_color": "#ff8800",
//!   "padding": 40,
//!   "logo": "static/logo.png",
//!   "ecc": "high"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use image::Rgba;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::qrcode::QrCodeEcc;
use crate::render::{Background, Border, StyleDescriptor, DEFAULT_QUIET_ZONE, DEFAULT_SCALE};

/// User-facing style options. Numbers are signed so that negative input is
/// reported as [`Error::InvalidStyleParameter`] rather than a parse error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub bg_color: String,
    pub transparent_bg: bool,
    /// Color of the dark modules.
    pub fill_color: String,
    pub border_width: i64,
    pub border_radius: i64,
    pub border_color: String,
    /// Quiet zone in pixels, converted to whole modules at the configured scale.
    pub padding: Option<i64>,
    pub logo: Option<PathBuf>,
    pub ecc: QrCodeEcc,
    /// Pixels per module.
    pub scale: i64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            bg_color: "white".to_string(),
            transparent_bg: false,
            fill_color: "black".to_string(),
            border_width: 0,
            border_radius: 0,
            border_color: "black".to_string(),
            padding: None,
            logo: None,
            ecc: QrCodeEcc::default(),
            scale: i64::from(DEFAULT_SCALE),
        }
    }
}

impl StyleConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!("loaded style config from {}", path.display());
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pixels per module, at least 1.
    pub fn scale(&self) -> Result<u32> {
        match non_negative("scale", self.scale)? {
            0 => Err(Error::style("scale must be at least 1 pixel per module")),
            scale => Ok(scale),
        }
    }

    /// Builds the style descriptor, decoding the logo file if one is set.
    ///
    /// A zero `border_width` means no border; the radius is ignored then.
    pub fn to_style(&self) -> Result<StyleDescriptor> {
        let scale = self.scale()?;
        let background = if self.transparent_bg {
            Background::Transparent
        } else {
            Background::Solid(parse_color(&self.bg_color)?)
        };
        let quiet_zone = match self.padding {
            Some(padding) => non_negative("padding", padding)? / scale,
            None => DEFAULT_QUIET_ZONE,
        };
        let width = non_negative("border_width", self.border_width)?;
        let radius = non_negative("border_radius", self.border_radius)?;
        let border = (width > 0)
            .then(|| parse_color(&self.border_color))
            .transpose()?
            .map(|color| Border::new(width, color).rounded(radius));
        let logo = match &self.logo {
            Some(path) => Some(image::open(path)?.to_rgba8()),
            None => None,
        };

        Ok(StyleDescriptor {
            background,
            foreground: parse_color(&self.fill_color)?,
            logo,
            border,
            quiet_zone,
        })
    }
}

fn non_negative(name: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::style(format!("{name} must be between 0 and {}, got {value}", u32::MAX)))
}

/// Parses a color name (`white`, `red`, `transparent`, ...) or a hex notation
/// `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(s: &str) -> Result<Rgba<u8>> {
    let s = s.trim();
    let named = match s.to_ascii_lowercase().as_str() {
        "white" => Some([255, 255, 255, 255]),
        "black" => Some([0, 0, 0, 255]),
        "red" => Some([255, 0, 0, 255]),
        "green" => Some([0, 128, 0, 255]),
        "blue" => Some([0, 0, 255, 255]),
        "yellow" => Some([255, 255, 0, 255]),
        "orange" => Some([255, 165, 0, 255]),
        "purple" => Some([128, 0, 128, 255]),
        "gray" | "grey" => Some([128, 128, 128, 255]),
        "transparent" => Some([0, 0, 0, 0]),
        _ => None,
    };
    if let Some(rgba) = named {
        return Ok(Rgba(rgba));
    }

    let invalid = || Error::ConfigError(format!("invalid color: {s}"));
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize, width: usize| -> Result<u8> {
        let digits = &hex[i * width..(i + 1) * width];
        let value = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
        // #rgb expands each digit: f -> ff
        Ok(if width == 1 { value * 17 } else { value })
    };
    match hex.len() {
        3 => Ok(Rgba([channel(0, 1)?, channel(1, 1)?, channel(2, 1)?, 255])),
        6 => Ok(Rgba([channel(0, 2)?, channel(1, 2)?, channel(2, 2)?, 255])),
        8 => Ok(Rgba([channel(0, 2)?, channel(1, 2)?, channel(2, 2)?, channel(3, 2)?])),
        _ => Err(invalid()),
    }
}
