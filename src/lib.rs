//! # qrstamp
//!
//! A Rust library for generating QR codes and rendering them as styled images.
//!
//! `qrstamp` encodes text or binary data into QR codes following the QR Code Model 2
//! specification, then rasterizes the symbol with an optional centered logo, a solid or
//! transparent background and a colored border with optional rounded corners.
//!
//! ## Features
//!
//! - Encode data in numeric, alphanumeric, byte, or ECI modes, versions 1 to 40.
//! - Support four error correction levels: Low, Medium, Quartile, High (the default).
//! - Render to in-memory images, PNG files, SVG strings or console text.
//! - Style QR codes with logos, custom colors, borders and rounded corners.
//! - Load styles from JSON, mirroring the options of a QR generation form.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qrstamp = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Generate a bordered QR code with rounded corners:
//!
//! ```rust
//! use image::Rgba;
//! use qrstamp::render::{Border, StyleDescriptor};
//! use qrstamp::QrCodeEcc;
//!
//! let qr = qrstamp::encode(b"https://example.com", QrCodeEcc::High).unwrap();
//! let style = StyleDescriptor::default()
//!     .with_border(Border::new(5, Rgba([255, 165, 0, 255])).rounded(20));
//! let img = qrstamp::render(&qr, &style, 10).unwrap();
//! assert_eq!(img.width(), (29 + 2 * 4) * 10 + 10);
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Core QR code encoding functionality.
//! - [`render`]: Rasterizing a symbol with background, logo and border styling.
//! - [`config`]: JSON style configuration.
//! - [`helper`]: SVG and console output, saving PNG files.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod helper;
pub mod qrcode;
mod reed_solomon;
pub mod render;

pub use error::{Error, Result};
pub use qrcode::{DataTooLong, Mask, Module, QrCode, QrCodeEcc, QrSegment, QrSegmentMode, Version};
pub use render::{render, Background, Border, StyleDescriptor};

/// Encodes arbitrary bytes into a QR code at the given error correction level.
///
/// Data made only of digits or of the alphanumeric character set uses the matching
/// compact mode, anything else (including any UTF-8 text) is encoded in byte mode.
/// The smallest fitting version and the mask with the lowest penalty are chosen.
///
/// # Errors
///
/// Returns [`Error::DataTooLong`] when the data exceeds the capacity of version 40
/// at `ecl`.
pub fn encode(data: &[u8], ecl: QrCodeEcc) -> Result<QrCode> {
    let segs = QrSegment::make_segments(data);
    QrCode::encode_segments(&segs, ecl)
}
