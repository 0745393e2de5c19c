use image::{DynamicImage, Rgba, RgbaImage};
use qrstamp::render::{Border, StyleDescriptor};
use qrstamp::{encode, render, QrCodeEcc};

/// Decodes the first symbol found in `img` with an independent reader.
fn decode(img: &DynamicImage) -> Vec<u8> {
    let luma = img.to_luma8();
    let (w, h) = luma.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
        luma.get_pixel(x as u32, y as u32)[0]
    });
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one symbol");
    let mut content = Vec::new();
    grids[0].decode_to(&mut content).unwrap();
    content
}

const SAMPLES: [&str; 5] = [
    "https://example.com",
    "HELLO WORLD 123",
    "0123456789012345",
    "Grüße aus Köln ✓",
    "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor \
     incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
     exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.",
];

#[test]
fn plain_render_decodes_back() {
    for ecl in QrCodeEcc::ALL {
        for text in SAMPLES {
            let qr = encode(text.as_bytes(), ecl).unwrap();
            let img = render(&qr, &StyleDescriptor::default(), 4).unwrap();
            assert_eq!(decode(&img), text.as_bytes(), "{text:?} at {ecl:?}");
        }
    }
}

#[test]
fn large_version_decodes_back() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(4);
    let qr = encode(text.as_bytes(), QrCodeEcc::High).unwrap();
    assert!(qr.version().value() >= 7);
    let img = render(&qr, &StyleDescriptor::default(), 4).unwrap();
    assert_eq!(decode(&img), text.as_bytes());
}

#[test]
fn colored_border_decodes_back() {
    let qr = encode(b"https://example.com", QrCodeEcc::High).unwrap();
    let style = StyleDescriptor::default()
        .with_border(Border::new(6, Rgba([200, 200, 255, 255])).rounded(12));
    let img = render(&qr, &style, 6).unwrap();
    assert_eq!(decode(&DynamicImage::ImageRgb8(img.to_rgb8())), b"https://example.com");
}

#[test]
fn logo_at_high_correction_decodes_back() {
    let qr = encode(b"https://example.com", QrCodeEcc::High).unwrap();
    let logo = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
    let style = StyleDescriptor::default().with_logo(logo);
    let img = render(&qr, &style, 8).unwrap();
    assert_eq!(decode(&img), b"https://example.com");
}
