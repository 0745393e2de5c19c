//! Rasterizes a [`QrCode`] into a styled image.
//!
//! Rendering runs in a fixed order: the module raster on a solid or transparent
//! background, then the centered logo, then the border, and finally the rounded
//! corner mask. Every style parameter is validated before any pixel is written.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::qrcode::QrCode;

/// Pixels per module used when the caller has no preference.
pub const DEFAULT_SCALE: u32 = 10;

/// Light border around the symbol, in modules, required by the QR standard.
pub const DEFAULT_QUIET_ZONE: u32 = 4;

/// Upper bound for the side of a rendered image, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// The logo edge is the shorter side of the raster divided by this.
pub const LOGO_DIVISOR: u32 = 6;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// How the area behind the modules is painted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Background {
    Solid(Rgba<u8>),
    /// Alpha 0 everywhere no module, logo or border is drawn.
    Transparent,
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid(WHITE)
    }
}

/// A colored frame around the rendered symbol.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Border {
    /// Frame thickness in pixels, must be positive.
    pub width: u32,
    pub color: Rgba<u8>,
    /// Radius of the rounded corners in pixels, 0 for square corners.
    pub corner_radius: u32,
}

impl Border {
    pub fn new(width: u32, color: Rgba<u8>) -> Self {
        Self {
            width,
            color,
            corner_radius: 0,
        }
    }

    pub fn rounded(mut self, corner_radius: u32) -> Self {
        self.corner_radius = corner_radius;
        self
    }
}

/// Everything about the look of a rendered symbol apart from its scale.
///
/// # Example
///
/// ```rust
/// use qrstamp::render::{Border, StyleDescriptor};
/// use image::Rgba;
///
/// let style = StyleDescriptor::default()
///     .transparent()
///     .with_border(Border::new(8, Rgba([255, 0, 0, 255])).rounded(16));
/// assert!(style.border.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct StyleDescriptor {
    pub background: Background,
    /// Color of the dark modules.
    pub foreground: Rgba<u8>,
    /// Composited at the center; any size, resized on render.
    pub logo: Option<RgbaImage>,
    pub border: Option<Border>,
    /// Quiet zone width in modules.
    pub quiet_zone: u32,
}

impl Default for StyleDescriptor {
    fn default() -> Self {
        Self {
            background: Background::default(),
            foreground: BLACK,
            logo: None,
            border: None,
            quiet_zone: DEFAULT_QUIET_ZONE,
        }
    }
}

impl StyleDescriptor {
    pub fn with_background(mut self, color: Rgba<u8>) -> Self {
        self.background = Background::Solid(color);
        self
    }

    pub fn transparent(mut self) -> Self {
        self.background = Background::Transparent;
        self
    }

    pub fn with_foreground(mut self, color: Rgba<u8>) -> Self {
        self.foreground = color;
        self
    }

    pub fn with_logo(mut self, logo: RgbaImage) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_quiet_zone(mut self, modules: u32) -> Self {
        self.quiet_zone = modules;
        self
    }

    /// Checks the style against the symbol and scale, returning the side of the
    /// final image in pixels.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidStyleParameter`] for a zero scale, a zero border width, a
    /// corner radius larger than half the final image, or an image larger than
    /// [`MAX_DIMENSION`].
    pub fn validate(&self, qr: &QrCode, scale: u32) -> Result<u32> {
        if scale == 0 {
            return Err(Error::style("scale must be at least 1 pixel per module"));
        }
        let too_large = || Error::style(format!("image side exceeds {MAX_DIMENSION} pixels"));
        let modules = self
            .quiet_zone
            .checked_mul(2)
            .and_then(|qz| qz.checked_add(qr.size() as u32))
            .ok_or_else(too_large)?;
        let mut side = modules.checked_mul(scale).ok_or_else(too_large)?;
        if let Some(border) = &self.border {
            if border.width == 0 {
                return Err(Error::style("border width must be positive"));
            }
            side = border
                .width
                .checked_mul(2)
                .and_then(|w| w.checked_add(side))
                .ok_or_else(too_large)?;
            if border.corner_radius > side / 2 {
                return Err(Error::style(format!(
                    "corner radius {} does not fit a {side}px image",
                    border.corner_radius
                )));
            }
        }
        if side > MAX_DIMENSION {
            return Err(too_large());
        }
        Ok(side)
    }

    fn needs_alpha(&self) -> bool {
        let translucent_background = match self.background {
            Background::Transparent => true,
            Background::Solid(color) => color[3] < 255,
        };
        let border_alpha = self
            .border
            .map_or(false, |b| b.corner_radius > 0 || b.color[3] < 255);
        translucent_background || border_alpha || self.foreground[3] < 255
    }
}

/// Renders the symbol with the given style at `scale` pixels per module.
///
/// The result is an RGBA image when the style asks for transparency or rounded
/// corners, an RGB image otherwise.
///
/// # Errors
///
/// Returns [`Error::InvalidStyleParameter`] before any rendering work if the
/// style does not validate, see [`StyleDescriptor::validate`].
///
/// # Example
///
/// ```rust
/// use qrstamp::qrcode::{QrCode, QrCodeEcc};
/// use qrstamp::render::{render, StyleDescriptor};
///
/// let qr = QrCode::encode_text("https://example.com", QrCodeEcc::High).unwrap();
/// let img = render(&qr, &StyleDescriptor::default(), 10).unwrap();
/// assert_eq!(img.width(), (29 + 2 * 4) * 10);
/// ```
pub fn render(qr: &QrCode, style: &StyleDescriptor, scale: u32) -> Result<DynamicImage> {
    let side = style.validate(qr, scale)?;

    let mut img = rasterize(qr, style, scale);

    if let Some(logo) = &style.logo {
        if !logo_within_error_budget(qr, style, scale) {
            warn!(
                "logo covers more modules than {:?} error correction can recover at version {}",
                qr.error_correction_level(),
                qr.version()
            );
        }
        overlay_logo(&mut img, logo);
    }

    if let Some(border) = &style.border {
        img = add_border(&img, border);
        if border.corner_radius > 0 {
            let mask = rounded_rect_mask(img.width(), img.height(), border.corner_radius);
            apply_alpha_mask(&mut img, &mask);
        }
    }
    debug_assert_eq!(img.width(), side);
    debug!("rendered {}x{} px at scale {}", img.width(), img.height(), scale);

    Ok(if style.needs_alpha() {
        DynamicImage::ImageRgba8(img)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).into_rgb8())
    })
}

/// Paints the background and one `scale`-sized block per dark module.
fn rasterize(qr: &QrCode, style: &StyleDescriptor, scale: u32) -> RgbaImage {
    let qz = style.quiet_zone;
    let side = (qr.size() as u32 + 2 * qz) * scale;
    let background = match style.background {
        Background::Solid(color) => color,
        Background::Transparent => TRANSPARENT,
    };
    let mut img = RgbaImage::from_pixel(side, side, background);
    for (y, row) in qr.rows().enumerate() {
        for (x, module) in row.iter().enumerate() {
            if !module.is_dark() {
                continue;
            }
            let left = (x as u32 + qz) * scale;
            let top = (y as u32 + qz) * scale;
            for py in top..top + scale {
                for px in left..left + scale {
                    img.put_pixel(px, py, style.foreground);
                }
            }
        }
    }
    img
}

/// Composites `logo` at the center of `base`, resized to a square of
/// [`LOGO_DIVISOR`]th of the shorter side.
///
/// The logo's alpha channel decides the blend: opaque logo pixels replace the base,
/// transparent ones leave it untouched. Nothing outside the logo square changes.
pub fn overlay_logo(base: &mut RgbaImage, logo: &RgbaImage) {
    let target = base.width().min(base.height()) / LOGO_DIVISOR;
    if target == 0 || logo.width() == 0 || logo.height() == 0 {
        return;
    }
    let logo: Cow<RgbaImage> = if logo.dimensions() == (target, target) {
        Cow::Borrowed(logo)
    } else {
        Cow::Owned(imageops::resize(logo, target, target, FilterType::Lanczos3))
    };
    let left = (base.width() - target) / 2;
    let top = (base.height() - target) / 2;
    for (x, y, src) in logo.enumerate_pixels() {
        blend_pixel(base.get_pixel_mut(left + x, top + y), src);
    }
}

/// Source-over compositing of one pixel.
fn blend_pixel(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let sa = u32::from(src[3]);
    if sa == 255 {
        *dst = *src;
        return;
    }
    if sa == 0 {
        return;
    }
    let da = u32::from(dst[3]);
    // Both terms scaled by 255 * 255
    let out_a = sa * 255 + da * (255 - sa);
    for c in 0..3 {
        let value = u32::from(src[c]) * sa * 255 + u32::from(dst[c]) * da * (255 - sa);
        dst[c] = ((value + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

/// Returns a new image `2 * width` larger on each axis, filled with the border
/// color, with `inner` copied unchanged (alpha included) at its center.
pub fn add_border(inner: &RgbaImage, border: &Border) -> RgbaImage {
    let w = border.width;
    let mut out = RgbaImage::from_pixel(inner.width() + 2 * w, inner.height() + 2 * w, border.color);
    imageops::replace(&mut out, inner, i64::from(w), i64::from(w));
    out
}

/// Single-channel mask of a `width` x `height` rectangle with quarter-circle
/// corners of `radius`: 255 inside, 0 outside.
pub fn rounded_rect_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if rounded_rect_contains(x, y, width, height, radius) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Tests the pixel center against the rounded rectangle, in half-pixel units.
fn rounded_rect_contains(x: u32, y: u32, w: u32, h: u32, r: u32) -> bool {
    let (px, py) = (2 * i64::from(x) + 1, 2 * i64::from(y) + 1);
    let (w2, h2, r2) = (2 * i64::from(w), 2 * i64::from(h), 2 * i64::from(r));
    let cx = if px < r2 {
        r2
    } else if px > w2 - r2 {
        w2 - r2
    } else {
        return true;
    };
    let cy = if py < r2 {
        r2
    } else if py > h2 - r2 {
        h2 - r2
    } else {
        return true;
    };
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r2 * r2
}

/// Multiplies the alpha channel of `img` by `mask`.
pub fn apply_alpha_mask(img: &mut RgbaImage, mask: &GrayImage) {
    debug_assert_eq!(img.dimensions(), mask.dimensions());
    for (pixel, m) in img.pixels_mut().zip(mask.pixels()) {
        pixel[3] = ((u32::from(pixel[3]) * u32::from(m[0]) + 127) / 255) as u8;
    }
}

/// Rough check that the modules hidden by the logo stay within what the symbol's
/// error correction can rebuild. Returns `true` when there is no logo.
///
/// Each hidden module is counted as a lost bit and compared against half of the
/// error correction codewords, the number of errors Reed-Solomon can correct.
pub fn logo_within_error_budget(qr: &QrCode, style: &StyleDescriptor, scale: u32) -> bool {
    if style.logo.is_none() || scale == 0 {
        return true;
    }
    let side = (qr.size() as u32 + 2 * style.quiet_zone) * scale;
    let logo_modules = (side / LOGO_DIVISOR).div_ceil(scale) + 1;
    let covered = (logo_modules * logo_modules) as usize;
    let correctable = qr.version().num_ecc_codewords(qr.error_correction_level()) / 2;
    covered <= correctable * 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrcode::QrCodeEcc;
    use image::{ColorType, GenericImageView};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn example() -> QrCode {
        QrCode::encode_text("https://example.com", QrCodeEcc::High).unwrap()
    }

    #[test]
    fn test_plain_render_dimensions() {
        let qr = example();
        let img = render(&qr, &StyleDescriptor::default(), 10).unwrap();
        let side = (qr.size() as u32 + 2 * DEFAULT_QUIET_ZONE) * 10;
        assert_eq!(img.dimensions(), (side, side));
        assert_eq!(img.color(), ColorType::Rgb8);
        assert_eq!(img.get_pixel(0, 0), WHITE);
        assert_eq!(img.get_pixel(side - 1, side - 1), WHITE);
        // Top-left finder corner
        assert_eq!(img.get_pixel(40, 40), BLACK);
        assert_eq!(img.get_pixel(49, 49), BLACK);
    }

    #[test]
    fn test_module_blocks_follow_matrix() {
        let qr = example();
        let scale = 3;
        let img = render(&qr, &StyleDescriptor::default().with_quiet_zone(2), scale)
            .unwrap()
            .to_rgba8();
        for y in 0..qr.size() {
            for x in 0..qr.size() {
                let expected = if qr.get_module(x, y) { BLACK } else { WHITE };
                let px = (x as u32 + 2) * scale + 1;
                let py = (y as u32 + 2) * scale + 1;
                assert_eq!(*img.get_pixel(px, py), expected, "module ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_border_grows_image() {
        let qr = example();
        let plain = render(&qr, &StyleDescriptor::default(), 10).unwrap();
        let style = StyleDescriptor::default().with_border(Border::new(5, RED));
        let img = render(&qr, &style, 10).unwrap();
        assert_eq!(img.width(), plain.width() + 10);
        assert_eq!(img.height(), plain.height() + 10);
        let img = img.to_rgba8();
        let last = img.width() - 1;
        for &(x, y) in &[(0, 0), (4, 100), (last, last), (100, last - 4), (last, 0)] {
            assert_eq!(*img.get_pixel(x, y), RED, "pixel ({x}, {y})");
        }
        assert_eq!(*img.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_rounded_corners_are_transparent() {
        let qr = example();
        let style = StyleDescriptor::default().with_border(Border::new(5, RED).rounded(20));
        let img = render(&qr, &style, 10).unwrap();
        assert_eq!(img.color(), ColorType::Rgba8);
        let img = img.to_rgba8();
        let last = img.width() - 1;
        let mid = img.width() / 2;
        for &(x, y) in &[(0, 0), (last, 0), (0, last), (last, last)] {
            assert_eq!(img.get_pixel(x, y)[3], 0, "corner ({x}, {y})");
        }
        for &(x, y) in &[(mid, 0), (0, mid), (last, mid), (mid, last)] {
            assert_eq!(*img.get_pixel(x, y), RED, "edge ({x}, {y})");
        }
    }

    #[test]
    fn test_transparent_background() {
        let qr = example();
        let img = render(&qr, &StyleDescriptor::default().transparent(), 4).unwrap();
        assert_eq!(img.color(), ColorType::Rgba8);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(16, 16), BLACK);
    }

    #[test]
    fn test_border_keeps_inner_alpha() {
        let qr = example();
        let style = StyleDescriptor::default()
            .transparent()
            .with_border(Border::new(5, RED));
        let img = render(&qr, &style, 4).unwrap().to_rgba8();
        assert_eq!(*img.get_pixel(0, 0), RED);
        assert_eq!(img.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn test_translucent_colors_keep_alpha() {
        let qr = example();

        let clear_border = StyleDescriptor::default().with_border(Border::new(5, TRANSPARENT));
        let img = render(&qr, &clear_border, 4).unwrap();
        assert_eq!(img.color(), ColorType::Rgba8);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(5, 5), WHITE);

        let half_red = Rgba([255, 0, 0, 128]);
        let img = render(&qr, &StyleDescriptor::default().with_border(Border::new(5, half_red)), 4)
            .unwrap();
        assert_eq!(img.color(), ColorType::Rgba8);
        assert_eq!(img.get_pixel(0, 0), half_red);

        let half_black = Rgba([0, 0, 0, 128]);
        let img = render(&qr, &StyleDescriptor::default().with_foreground(half_black), 4).unwrap();
        assert_eq!(img.color(), ColorType::Rgba8);
        // Top-left finder corner at quiet zone 4, scale 4
        assert_eq!(img.get_pixel(16, 16), half_black);
        assert_eq!(img.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn test_logo_overlay_replaces_center_block_only() {
        let mut base = RgbaImage::from_fn(300, 300, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 7) as u8, 255])
        });
        let original = base.clone();
        let logo = RgbaImage::from_fn(50, 50, |x, y| Rgba([200, x as u8, y as u8, 255]));
        overlay_logo(&mut base, &logo);
        for (x, y, pixel) in base.enumerate_pixels() {
            let inside = (125..175).contains(&x) && (125..175).contains(&y);
            if inside {
                assert_eq!(pixel, logo.get_pixel(x - 125, y - 125));
            } else {
                assert_eq!(pixel, original.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_logo_alpha_is_respected() {
        let mut base = RgbaImage::from_pixel(300, 300, WHITE);
        let mut logo = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 0]));
        logo.put_pixel(0, 0, Rgba([0, 0, 0, 128]));
        overlay_logo(&mut base, &logo);
        assert_eq!(*base.get_pixel(126, 126), WHITE);
        let half = base.get_pixel(125, 125);
        assert_eq!(half[3], 255);
        assert!((126..=128).contains(&half[0]), "{half:?}");
    }

    #[test]
    fn test_logo_is_resized() {
        let qr = example();
        let logo = RgbaImage::from_pixel(100, 100, RED);
        let style = StyleDescriptor::default().with_logo(logo);
        let img = render(&qr, &style, 10).unwrap().to_rgba8();
        // 370 / 6 = 61 pixel logo starting at 154
        let center = img.get_pixel(185, 185);
        assert!(center[0] >= 250 && center[1] <= 5 && center[2] <= 5, "{center:?}");
        let outside = img.get_pixel(152, 185);
        assert!(outside[0] == outside[1], "{outside:?}");
    }

    #[test]
    fn test_invalid_style_parameters() {
        let qr = example();
        let default = StyleDescriptor::default();
        assert!(matches!(render(&qr, &default, 0), Err(Error::InvalidStyleParameter(_))));

        let zero_border = StyleDescriptor::default().with_border(Border::new(0, RED));
        assert!(matches!(render(&qr, &zero_border, 10), Err(Error::InvalidStyleParameter(_))));

        let huge_radius = StyleDescriptor::default().with_border(Border::new(5, RED).rounded(1000));
        assert!(matches!(render(&qr, &huge_radius, 10), Err(Error::InvalidStyleParameter(_))));

        let huge_zone = StyleDescriptor::default().with_quiet_zone(u32::MAX);
        assert!(matches!(render(&qr, &huge_zone, 10), Err(Error::InvalidStyleParameter(_))));

        assert!(matches!(render(&qr, &default, 1000), Err(Error::InvalidStyleParameter(_))));
    }

    #[test]
    fn test_rounded_rect_mask() {
        let mask = rounded_rect_mask(100, 60, 20);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(99, 59)[0], 0);
        assert_eq!(mask.get_pixel(50, 0)[0], 255);
        assert_eq!(mask.get_pixel(0, 30)[0], 255);
        assert_eq!(mask.get_pixel(20, 20)[0], 255);
        assert_eq!(rounded_rect_mask(10, 10, 0).pixels().filter(|p| p[0] == 0).count(), 0);
    }

    #[test]
    fn test_logo_budget() {
        let logo = RgbaImage::from_pixel(10, 10, RED);
        let style = StyleDescriptor::default().with_logo(logo);
        let low = QrCode::encode_text("hi", QrCodeEcc::Low).unwrap();
        let high = QrCode::encode_text("hi", QrCodeEcc::High).unwrap();
        assert!(!logo_within_error_budget(&low, &style, 10));
        assert!(logo_within_error_budget(&high, &style, 10));
        assert!(logo_within_error_budget(&low, &StyleDescriptor::default(), 10));
    }
}
