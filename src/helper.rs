use crate::error::Result;
use crate::qrcode::{QrCode, QrCodeEcc};
use crate::render::{render, Background, StyleDescriptor};

use image::{DynamicImage, ImageFormat, Rgba};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/*---- Utilities ----*/

// Returns a string of SVG code for an image depicting the given QR Code, using
// the quiet zone, background and foreground of `style`. Logo and border are
// raster-only and not drawn. The string always uses Unix newlines (\n).
pub fn to_svg_string(qr: &QrCode, style: &StyleDescriptor) -> String {
	let border = style.quiet_zone as i32;
	let mut result = String::new();
	result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
	result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
	let dimension = qr.size() + border * 2;
	result += &format!(
		"<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n", dimension);
	if let Background::Solid(color) = style.background {
		result += &format!("\t<rect width=\"100%\" height=\"100%\" {}/>\n", svg_fill(color));
	}
	result += "\t<path d=\"";
	let mut first = true;
	for y in 0 .. qr.size() {
		for x in 0 .. qr.size() {
			if qr.get_module(x, y) {
				if !first {
					result += " ";
				}
				first = false;
				result += &format!("M{},{}h1v1h-1z", x + border, y + border);
			}
		}
	}
	result += &format!("\" {}/>\n", svg_fill(style.foreground));
	result += "</svg>\n";
	result
}

// fill and, for translucent colors, fill-opacity attributes
fn svg_fill(color: Rgba<u8>) -> String {
	let [r, g, b, a] = color.0;
	let mut attrs = format!("fill=\"#{:02X}{:02X}{:02X}\"", r, g, b);
	if a < 255 {
		attrs += &format!(" fill-opacity=\"{:.3}\"", f32::from(a) / 255.0);
	}
	attrs
}

/// Returns the QR Code as text, two characters per module, for printing to a terminal.
pub fn to_ascii_string(qr: &QrCode, border: u32) -> String {
	let border = border as i32;
	let mut result = String::new();
	for y in -border .. qr.size() + border {
		for x in -border .. qr.size() + border {
			let c: char = if qr.get_module(x, y) { '█' } else { ' ' };
			result.push(c);
			result.push(c);
		}
		result.push('\n');
	}
	result
}

/// Derives a file-friendly identifier from a URL: the first label of the host.
///
/// Returns `None` when nothing usable remains, e.g. for text that is not a URL.
///
/// # Example
///
/// ```rust
/// use qrstamp::helper::artifact_id;
///
/// assert_eq!(artifact_id("https://example.com/page"), Some("example".to_string()));
/// assert_eq!(artifact_id("plain text"), None);
/// ```
pub fn artifact_id(text: &str) -> Option<String> {
	let (_, rest) = text.split_once("//")?;
	let label = rest
		.split(|c: char| matches!(c, '.' | '/' | ':' | '?' | '#' | '@'))
		.next()
		.unwrap_or("");
	let id: String = label
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
		.collect();
	if id.is_empty() { None } else { Some(id) }
}

/// Saves a rendered image as PNG and returns the path written.
///
/// # Arguments
///
/// * `img` - The rendered image.
/// * `directory_path` - Optional. The directory path where the image will be saved. If not provided, the default directory is "generated".
/// * `filename` - Optional. The name of the image file, without extension. If not provided, a timestamp-based filename will be used.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the image cannot be encoded.
///
/// # Example
///
/// ```rust,no_run
/// use qrstamp::helper::{generate_image_buffer, save_png};
/// use qrstamp::qrcode::QrCodeEcc;
/// use qrstamp::render::StyleDescriptor;
/// use std::path::Path;
///
/// let img = generate_image_buffer("Hello, World!", QrCodeEcc::High, &StyleDescriptor::default(), 10).unwrap();
/// let path = save_png(&img, Some(Path::new("images")), Some("qr_code")).unwrap();
/// println!("{}", path.display());
/// ```
pub fn save_png(img: &DynamicImage, directory_path: Option<&Path>, filename: Option<&str>) -> Result<PathBuf> {
	let directory_path = directory_path.unwrap_or(Path::new("generated"));
	let filename = match filename {
		Some(name) => name.to_string(),
		None => {
			let since_the_epoch = SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap_or_default();
			since_the_epoch.as_millis().to_string()
		}
	};

	// Check if the directory exists, create it if it doesn't
	if !directory_path.exists() {
		fs::create_dir_all(directory_path)?;
	}

	let file_path = directory_path.join(format!("{}.png", filename));
	img.save_with_format(&file_path, ImageFormat::Png)?;
	info!("saved {}x{} image to {}", img.width(), img.height(), file_path.display());
	Ok(file_path)
}

/// Generates a styled QR Code image from the provided content.
///
/// # Arguments
///
/// * `content` - The content to encode into the QR Code.
/// * `ecl` - Error correction level; use `High` together with a logo.
/// * `style` - Background, logo, border and quiet zone.
/// * `scale` - Pixels per module.
///
/// # Example
///
/// ```
/// use qrstamp::helper::generate_image_buffer;
/// use qrstamp::qrcode::QrCodeEcc;
/// use qrstamp::render::StyleDescriptor;
///
/// let style = StyleDescriptor::default().with_quiet_zone(4);
/// let img = generate_image_buffer("Hello, world!", QrCodeEcc::Low, &style, 1).unwrap();
/// assert_eq!((img.width(), img.height()), (29, 29));
/// ```
pub fn generate_image_buffer(content: &str, ecl: QrCodeEcc, style: &StyleDescriptor, scale: u32) -> Result<DynamicImage> {
	let qr = QrCode::encode_text(content, ecl)?;
	render(&qr, style, scale)
}
