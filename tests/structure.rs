use qrstamp::{encode, DataTooLong, Error, QrCode, QrCodeEcc, QrSegment, Version};

fn symbol(version: u8, ecl: QrCodeEcc) -> QrCode {
    let segs = QrSegment::make_segments(b"x");
    let ver = Version::new(version);
    QrCode::encode_segments_advanced(&segs, ecl, ver, ver, None, false).unwrap()
}

fn assert_finder(qr: &QrCode, left: i32, top: i32) {
    for dy in 0..7 {
        for dx in 0..7 {
            let ring = (dx - 3i32).abs().max((dy - 3i32).abs());
            assert_eq!(
                qr.get_module(left + dx, top + dy),
                ring != 2,
                "finder at ({left}, {top}), offset ({dx}, {dy}), version {}",
                qr.version()
            );
        }
    }
}

fn assert_separators(qr: &QrCode) {
    let size = qr.size();
    for i in 0..8 {
        // Top-left
        assert!(!qr.get_module(7, i));
        assert!(!qr.get_module(i, 7));
        // Top-right
        assert!(!qr.get_module(size - 8, i));
        assert!(!qr.get_module(size - 1 - i, 7));
        // Bottom-left
        assert!(!qr.get_module(7, size - 1 - i));
        assert!(!qr.get_module(i, size - 8));
    }
}

fn assert_timing(qr: &QrCode) {
    for i in 8..qr.size() - 8 {
        assert_eq!(qr.get_module(i, 6), i % 2 == 0, "horizontal timing at {i}");
        assert_eq!(qr.get_module(6, i), i % 2 == 0, "vertical timing at {i}");
    }
}

fn assert_alignment(qr: &QrCode) {
    let positions = qr.version().alignment_pattern_positions();
    let last = positions.len().saturating_sub(1);
    for (i, &cx) in positions.iter().enumerate() {
        for (j, &cy) in positions.iter().enumerate() {
            if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                continue;
            }
            for dy in -2i32..=2 {
                for dx in -2i32..=2 {
                    let ring = dx.abs().max(dy.abs());
                    assert_eq!(
                        qr.get_module(cx + dx, cy + dy),
                        ring != 1,
                        "alignment at ({cx}, {cy}), version {}",
                        qr.version()
                    );
                }
            }
        }
    }
}

fn read_version_block(qr: &QrCode, transpose: bool) -> u32 {
    let mut bits = 0;
    for i in 0..18 {
        let a = qr.size() - 11 + i % 3;
        let b = i / 3;
        let (x, y) = if transpose { (b, a) } else { (a, b) };
        if qr.get_module(x, y) {
            bits |= 1 << i;
        }
    }
    bits
}

#[test]
fn function_patterns_at_fixed_positions() {
    for ecl in QrCodeEcc::ALL {
        for ver in 1..=40u8 {
            let qr = symbol(ver, ecl);
            let size = qr.size();
            assert_eq!(size, 17 + 4 * i32::from(ver));
            assert_eq!(qr.rows().count(), size as usize);
            assert_finder(&qr, 0, 0);
            assert_finder(&qr, size - 7, 0);
            assert_finder(&qr, 0, size - 7);
            assert_separators(&qr);
            assert_timing(&qr);
            assert_alignment(&qr);
            assert!(qr.get_module(8, size - 8), "dark module, version {ver}");

            if ver >= 7 {
                let top_right = read_version_block(&qr, false);
                assert_eq!(top_right, read_version_block(&qr, true));
                assert_eq!(top_right >> 12, u32::from(ver));
            }
        }
    }
}

#[test]
fn encode_is_deterministic() {
    for ecl in QrCodeEcc::ALL {
        for text in ["https://example.com", "0123456789", "Grüße aus Köln", ""] {
            let a = encode(text.as_bytes(), ecl).unwrap();
            let b = encode(text.as_bytes(), ecl).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.mask(), b.mask());
        }
    }
}

#[test]
fn smallest_version_is_selected() {
    // 17 bytes fit 1-L; 18 do not
    assert_eq!(encode(&[b'a'; 17], QrCodeEcc::Low).unwrap().version().value(), 1);
    assert_eq!(encode(&[b'a'; 18], QrCodeEcc::Low).unwrap().version().value(), 2);
    // 7 bytes fit 1-H; 8 do not
    assert_eq!(encode(&[b'a'; 7], QrCodeEcc::High).unwrap().version().value(), 1);
    assert_eq!(encode(&[b'a'; 8], QrCodeEcc::High).unwrap().version().value(), 2);
    assert_eq!(encode(b"", QrCodeEcc::High).unwrap().version().value(), 1);
}

#[test]
fn capacity_boundary_at_version_40_high() {
    let max = Version::MAX.byte_capacity(QrCodeEcc::High);
    assert_eq!(max, 1273);

    let fits = vec![b'a'; max];
    let qr = encode(&fits, QrCodeEcc::High).unwrap();
    assert_eq!(qr.version(), Version::MAX);
    assert_eq!(qr.size(), 177);

    let too_long = vec![b'a'; max + 1];
    match encode(&too_long, QrCodeEcc::High) {
        Err(Error::DataTooLong(DataTooLong::DataOverCapacity(used, capacity))) => {
            assert_eq!(used, 4 + 16 + 8 * (max + 1));
            assert_eq!(capacity, 1276 * 8);
        }
        other => panic!("expected DataTooLong, got {other:?}"),
    }
}

#[test]
fn binary_data_uses_byte_mode() {
    let data: Vec<u8> = (0..=255).collect();
    let qr = QrCode::encode_binary(&data, QrCodeEcc::Medium).unwrap();
    let qr2 = encode(&data, QrCodeEcc::Medium).unwrap();
    assert_eq!(qr, qr2);
}
