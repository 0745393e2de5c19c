//! QR code encoding functionality.
//!
//! This module turns text or binary data into a QR Code Model 2 symbol. It covers
//! versions 1 to 40, the four error correction levels and the numeric, alphanumeric,
//! byte and ECI segment modes.
//!
//! The symbol is built on a grid of cells that remembers which modules belong to
//! function patterns, which ones are still reserved for format information and which
//! ones carry data. Only data modules are masked. The finished [`QrCode`] exposes
//! nothing but dark and light modules.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::reed_solomon;

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are immutable after creation.
///
/// # Creation
///
/// - High-level: [`QrCode::encode_text`] or [`QrCode::encode_binary`].
/// - Mid-level: [`QrCode::encode_segments`] or [`QrCode::encode_segments_advanced`].
/// - Low-level: [`QrCode::encode_codewords`].
///
/// # Example
///
/// ```rust
/// use qrstamp::qrcode::{QrCode, QrCodeEcc};
///
/// let qr = QrCode::encode_text("Hello, World!", QrCodeEcc::Low).unwrap();
/// println!("Version: {}", qr.version().value());
/// assert_eq!(qr.size(), 21);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrCode {
    version: Version,

    /// The width and height of this QR Code, measured in modules, between
    /// 21 and 177 (inclusive). This is equal to version * 4 + 17.
    size: i32,

    ecl: QrCodeEcc,

    mask: Mask,

    /// Row-major, `size * size` entries.
    modules: Vec<Module>,
}

impl QrCode {
    /// Encodes a text string into a QR code.
    ///
    /// The most compact single segment mode is chosen for the whole text (numeric,
    /// alphanumeric or byte) and the smallest version that holds the data at `ecl`
    /// is used. The mask is chosen automatically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataTooLong`] if the text does not fit in version 40.
    pub fn encode_text(text: &str, ecl: QrCodeEcc) -> Result<Self> {
        let segs = QrSegment::make_segments(text.as_bytes());
        QrCode::encode_segments(&segs, ecl)
    }

    /// Encodes binary data into a QR code using byte mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataTooLong`] if the data does not fit in version 40.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qrstamp::qrcode::{QrCode, QrCodeEcc};
    ///
    /// let qr = QrCode::encode_binary(&[0xde, 0xad, 0xbe, 0xef], QrCodeEcc::High).unwrap();
    /// assert_eq!(qr.version().value(), 1);
    /// ```
    pub fn encode_binary(data: &[u8], ecl: QrCodeEcc) -> Result<Self> {
        let segs = [QrSegment::make_bytes(data)];
        QrCode::encode_segments(&segs, ecl)
    }

    /// Encodes the given segments at the given level, with automatic version and
    /// mask selection over the full version range.
    pub fn encode_segments(segs: &[QrSegment], ecl: QrCodeEcc) -> Result<Self> {
        QrCode::encode_segments_advanced(segs, ecl, Version::MIN, Version::MAX, None, false)
    }

    /// Encodes the given segments with full control over the encoding parameters.
    ///
    /// The smallest possible QR Code version within `[minversion, maxversion]` is
    /// chosen. If `boostecl` is `true`, the ECC level may be higher than `ecl` if it
    /// can be done without increasing the version. The `mask` can be `None` for
    /// automatic selection or a value from 0 to 7.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidVersionRange`] if `minversion > maxversion`.
    /// - [`Error::DataTooLong`] if the segments fit in no version of the range.
    pub fn encode_segments_advanced(
        segs: &[QrSegment],
        mut ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<Self> {
        if minversion > maxversion {
            return Err(Error::InvalidVersionRange {
                min: minversion.value(),
                max: maxversion.value(),
            });
        }

        // Find the minimal version number to use
        let mut version: Version = minversion;
        let datausedbits: usize = loop {
            let datacapacitybits: usize = version.num_data_codewords(ecl) * 8;
            let dataused: Option<usize> = QrSegment::get_total_bits(segs, version);
            match dataused {
                Some(n) if n <= datacapacitybits => break n,
                _ if version >= maxversion => {
                    return Err(match dataused {
                        None => DataTooLong::SegmentTooLong,
                        Some(n) => DataTooLong::DataOverCapacity(n, datacapacitybits),
                    }
                    .into());
                }
                _ => version = Version::new(version.value() + 1),
            }
        };

        // Increase the error correction level while the data still fits
        for &newecl in &[QrCodeEcc::Medium, QrCodeEcc::Quartile, QrCodeEcc::High] {
            if boostecl && datausedbits <= version.num_data_codewords(newecl) * 8 {
                ecl = newecl;
            }
        }

        let datacodewords = build_data_codewords(segs, version, ecl);
        QrCode::encode_codewords(version, ecl, &datacodewords, mask)
    }

    /// Creates a QR Code from already assembled data codewords.
    ///
    /// `datacodewords` should hold exactly `version.num_data_codewords(ecl)` bytes;
    /// shorter input is completed with the standard `0xEC`/`0x11` pad bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataTooLong`] if more codewords are given than the version holds.
    pub fn encode_codewords(
        version: Version,
        ecl: QrCodeEcc,
        datacodewords: &[u8],
        mask: Option<Mask>,
    ) -> Result<Self> {
        let capacity = version.num_data_codewords(ecl);
        if datacodewords.len() > capacity {
            return Err(
                DataTooLong::DataOverCapacity(datacodewords.len() * 8, capacity * 8).into(),
            );
        }
        let mut data = datacodewords.to_vec();
        data.extend(PAD_BYTES.iter().cycle().take(capacity - data.len()));

        let canvas = unmasked_canvas(version, ecl, &data);
        let (mask, canvas) = match mask {
            Some(msk) => (msk, canvas.masked(ecl, msk)),
            None => choose_mask(&canvas, ecl),
        };
        debug!(
            "encoded version {} ({}x{}), ecc {:?}, mask {}",
            version.value(),
            canvas.size,
            canvas.size,
            ecl,
            mask.value()
        );

        Ok(QrCode {
            version,
            size: canvas.size,
            ecl,
            mask,
            modules: canvas.into_modules(),
        })
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Returns this QR Code's error correction level.
    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.ecl
    }

    /// Returns this QR Code's mask, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the module at the given coordinates, `Light` outside the symbol.
    pub fn module(&self, x: i32, y: i32) -> Module {
        let range = 0..self.size;
        if range.contains(&x) && range.contains(&y) {
            self.modules[(y * self.size + x) as usize]
        } else {
            Module::Light
        }
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        self.module(x, y).is_dark()
    }

    /// Iterates over the rows of the symbol, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Module]> {
        self.modules.chunks(self.size as usize)
    }
}

/// Color of one module of a finished symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Module {
    Light,
    Dark,
}

impl Module {
    fn from_bit(isdark: bool) -> Self {
        if isdark {
            Module::Dark
        } else {
            Module::Light
        }
    }

    pub fn is_dark(self) -> bool {
        self == Module::Dark
    }

    fn inverted(self) -> Self {
        match self {
            Module::Light => Module::Dark,
            Module::Dark => Module::Light,
        }
    }
}

/// A cell of the symbol under construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Cell {
    /// Free for codeword bits.
    Unset,
    /// Format information area, written once the mask is known.
    Reserved,
    /// Finder, separator, timing, alignment, version and format modules.
    Function(Module),
    /// Codeword and remainder bits; the only cells a mask touches.
    Data(Module),
}

#[derive(Clone)]
struct Canvas {
    version: Version,
    size: i32,
    cells: Vec<Cell>,
}

impl Canvas {
    fn new(version: Version) -> Self {
        let size = version.size();
        Self {
            version,
            size,
            cells: vec![Cell::Unset; (size * size) as usize],
        }
    }

    fn index(&self, x: i32, y: i32) -> usize {
        let range = 0..self.size;
        assert!(range.contains(&x) && range.contains(&y));
        (y * self.size + x) as usize
    }

    fn get(&self, x: i32, y: i32) -> Cell {
        self.cells[self.index(x, y)]
    }

    fn is_dark(&self, x: i32, y: i32) -> bool {
        match self.get(x, y) {
            Cell::Function(m) | Cell::Data(m) => m.is_dark(),
            Cell::Unset | Cell::Reserved => false,
        }
    }

    fn set_function(&mut self, x: i32, y: i32, isdark: bool) {
        let index = self.index(x, y);
        self.cells[index] = Cell::Function(Module::from_bit(isdark));
    }

    fn set_function_unbounded(&mut self, x: i32, y: i32, isdark: bool) {
        let range = 0..self.size;
        if range.contains(&x) && range.contains(&y) {
            self.set_function(x, y, isdark);
        }
    }

    fn reserve(&mut self, x: i32, y: i32) {
        let index = self.index(x, y);
        self.cells[index] = Cell::Reserved;
    }

    fn draw_function_patterns(&mut self) {
        let size = self.size;

        // Timing patterns; finders and alignment patterns overwrite the crossings
        for i in 0..size {
            self.set_function(6, i, i % 2 == 0);
            self.set_function(i, 6, i % 2 == 0);
        }

        // Finder patterns with their separators
        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        let alignpatpos = self.version.alignment_pattern_positions();
        let numalign = alignpatpos.len();
        for (i, &pos0) in alignpatpos.iter().enumerate() {
            for (j, &pos1) in alignpatpos.iter().enumerate() {
                // The three corners hold finder patterns
                if (i == 0 && j == 0) || (i == 0 && j == numalign - 1) || (i == numalign - 1 && j == 0)
                {
                    continue;
                }
                self.draw_alignment_pattern(pos0, pos1);
            }
        }

        self.reserve_format_area();
        self.draw_version_bits();
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let dist: i32 = dx.abs().max(dy.abs());
                self.set_function_unbounded(x + dx, y + dy, dist != 2 && dist != 4);
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                self.set_function(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn reserve_format_area(&mut self) {
        let size = self.size;
        for i in 0..6 {
            self.reserve(8, i);
        }
        self.reserve(8, 7);
        self.reserve(8, 8);
        self.reserve(7, 8);
        for i in 9..15 {
            self.reserve(14 - i, 8);
        }
        for i in 0..8 {
            self.reserve(size - 1 - i, 8);
        }
        for i in 8..15 {
            self.reserve(8, size - 15 + i);
        }
        // Always dark
        self.set_function(8, size - 8, true);
    }

    fn draw_version_bits(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let bits = version_bits(ver);
        for i in 0u8..18 {
            let bit: bool = get_bit(bits, i);
            let a: i32 = self.size - 11 + i32::from(i % 3);
            let b: i32 = i32::from(i / 3);
            self.set_function(a, b, bit);
            self.set_function(b, a, bit);
        }
    }

    fn draw_format_bits(&mut self, ecl: QrCodeEcc, mask: Mask) {
        let bits = format_bits(ecl, mask);
        for i in 0..6 {
            self.set_function(8, i, get_bit(bits, i as u8));
        }
        self.set_function(8, 7, get_bit(bits, 6));
        self.set_function(8, 8, get_bit(bits, 7));
        self.set_function(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function(14 - i, 8, get_bit(bits, i as u8));
        }
        let size = self.size;
        for i in 0..8 {
            self.set_function(size - 1 - i, 8, get_bit(bits, i as u8));
        }
        for i in 8..15 {
            self.set_function(8, size - 15 + i, get_bit(bits, i as u8));
        }
        self.set_function(8, size - 8, true);
    }

    /// Places the codeword bits in the zig-zag order, two columns at a time from the
    /// bottom-right corner, skipping the vertical timing column. Cells left over once
    /// the codewords run out become light data modules.
    fn draw_codewords(&mut self, data: &[u8]) {
        let size: i32 = self.size;
        let numbits = data.len() * 8;
        let mut i: usize = 0;
        let mut right: i32 = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            let upward: bool = ((right + 1) & 2) == 0;
            for vert in 0..size {
                let y = if upward { size - 1 - vert } else { vert };
                for j in 0..2 {
                    let x = right - j;
                    let index = self.index(x, y);
                    if self.cells[index] == Cell::Unset {
                        let isdark =
                            i < numbits && get_bit(data[i >> 3].into(), 7 - ((i & 7) as u8));
                        self.cells[index] = Cell::Data(Module::from_bit(isdark));
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert!(i >= numbits);
    }

    fn apply_mask(&mut self, mask: Mask) {
        let size = self.size;
        for y in 0..size {
            for x in 0..size {
                let index = (y * size + x) as usize;
                if let Cell::Data(m) = self.cells[index] {
                    if mask.inverts(x, y) {
                        self.cells[index] = Cell::Data(m.inverted());
                    }
                }
            }
        }
    }

    fn masked(&self, ecl: QrCodeEcc, mask: Mask) -> Canvas {
        let mut result = self.clone();
        result.apply_mask(mask);
        result.draw_format_bits(ecl, mask);
        result
    }

    fn penalty_score(&self) -> i32 {
        let mut result: i32 = 0;
        let size = self.size;

        // Adjacent modules in a row having the same color, and finder-like patterns
        for y in 0..size {
            let mut runcolor = false;
            let mut runx: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for x in 0..size {
                if self.is_dark(x, y) == runcolor {
                    runx += 1;
                    if runx == 5 {
                        result += PENALTY_N1;
                    } else if runx > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runx);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = self.is_dark(x, y);
                    runx = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runx) * PENALTY_N3;
        }
        // Same for columns
        for x in 0..size {
            let mut runcolor = false;
            let mut runy: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for y in 0..size {
                if self.is_dark(x, y) == runcolor {
                    runy += 1;
                    if runy == 5 {
                        result += PENALTY_N1;
                    } else if runy > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runy);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = self.is_dark(x, y);
                    runy = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runy) * PENALTY_N3;
        }

        // 2*2 blocks of modules having same color
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color: bool = self.is_dark(x, y);
                if color == self.is_dark(x + 1, y)
                    && color == self.is_dark(x, y + 1)
                    && color == self.is_dark(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        // Balance of dark and light modules
        let dark = self
            .cells
            .iter()
            .filter(|c| matches!(c, Cell::Function(Module::Dark) | Cell::Data(Module::Dark)))
            .count() as i32;
        let total = size * size;
        // Smallest k such that (45-5k)% <= dark/total <= (55+5k)%
        let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result += k * PENALTY_N4;
        result
    }

    fn into_modules(self) -> Vec<Module> {
        self.cells
            .into_iter()
            .map(|cell| match cell {
                Cell::Function(m) | Cell::Data(m) => m,
                Cell::Unset | Cell::Reserved => Module::Light,
            })
            .collect()
    }
}

/// Builds the symbol up to, but not including, masking and format information.
fn unmasked_canvas(version: Version, ecl: QrCodeEcc, datacodewords: &[u8]) -> Canvas {
    let allcodewords = add_ecc_and_interleave(datacodewords, version, ecl);
    let mut canvas = Canvas::new(version);
    canvas.draw_function_patterns();
    canvas.draw_codewords(&allcodewords);
    canvas
}

/// Tries all eight masks and keeps the one with the lowest penalty; ties go to the
/// lower mask number.
fn choose_mask(canvas: &Canvas, ecl: QrCodeEcc) -> (Mask, Canvas) {
    let mut best: Option<(i32, Mask, Canvas)> = None;
    for i in 0u8..8 {
        let msk = Mask::new(i);
        let candidate = canvas.masked(ecl, msk);
        let penalty = candidate.penalty_score();
        if best.as_ref().map_or(true, |(minpenalty, _, _)| penalty < *minpenalty) {
            best = Some((penalty, msk, candidate));
        }
    }
    match best {
        Some((penalty, msk, chosen)) => {
            debug!("mask {} selected with penalty {}", msk.value(), penalty);
            (msk, chosen)
        }
        None => unreachable!("eight masks were evaluated"),
    }
}

/// Concatenates the segments, then adds the terminator and pad bytes up to the
/// data capacity of `version` at `ecl`.
fn build_data_codewords(segs: &[QrSegment], version: Version, ecl: QrCodeEcc) -> Vec<u8> {
    let datacapacitybits: usize = version.num_data_codewords(ecl) * 8;
    let mut bb = BitBuffer::new();
    for seg in segs {
        bb.append_bits(seg.mode.mode_bits(), 4);
        bb.append_bits(seg.numchars as u32, seg.mode.num_char_count_bits(version));
        for i in 0..seg.bitlength {
            let bit: u8 = (seg.data[i >> 3] >> (7 - (i & 7))) & 1;
            bb.append_bits(bit.into(), 1);
        }
    }

    // Add terminator and pad up to a byte if applicable
    let numzerobits: usize = core::cmp::min(4, datacapacitybits - bb.len());
    bb.append_bits(0, numzerobits as u8);
    let numzerobits: usize = bb.len().wrapping_neg() & 7;
    bb.append_bits(0, numzerobits as u8);
    debug_assert_eq!(bb.len() % 8, 0);

    // Pad with alternating bytes until data capacity is reached
    for &padbyte in PAD_BYTES.iter().cycle() {
        if bb.len() >= datacapacitybits {
            break;
        }
        bb.append_bits(padbyte.into(), 8);
    }
    bb.into_bytes()
}

/// Splits the data codewords into blocks, appends the Reed-Solomon codewords of
/// each block and interleaves the result.
fn add_ecc_and_interleave(data: &[u8], ver: Version, ecl: QrCodeEcc) -> Vec<u8> {
    assert_eq!(data.len(), ver.num_data_codewords(ecl));
    let numblocks: usize = table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
    let blockecclen: usize = table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
    let rawcodewords: usize = ver.num_raw_data_modules() / 8;
    let numshortblocks: usize = numblocks - (rawcodewords % numblocks);
    let shortblockdatalen: usize = rawcodewords / numblocks - blockecclen;

    let mut result = vec![0u8; rawcodewords];
    let mut dat: &[u8] = data;
    for i in 0..numblocks {
        let datlen: usize = shortblockdatalen + usize::from(i >= numshortblocks);
        let ecc = reed_solomon::compute_remainder(&dat[..datlen], blockecclen);
        let mut k: usize = i;
        for (j, &b) in dat[..datlen].iter().enumerate() {
            if j == shortblockdatalen {
                k -= numshortblocks;
            }
            result[k] = b;
            k += numblocks;
        }
        let mut k: usize = data.len() + i;
        for &b in &ecc {
            result[k] = b;
            k += numblocks;
        }
        dat = &dat[datlen..];
    }
    debug_assert_eq!(dat.len(), 0);
    result
}

/// The 15-bit format information word: level and mask protected by a BCH(15,5) code.
fn format_bits(ecl: QrCodeEcc, mask: Mask) -> u32 {
    let data = u32::from((ecl.format_bits() << 3) | mask.value());
    let mut rem: u32 = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

/// The 18-bit version information word, protected by a BCH(18,6) code.
fn version_bits(ver: u32) -> u32 {
    let mut rem: u32 = ver;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
    }
    (ver << 12) | rem
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
    table[ecl.ordinal()][usize::from(ver.value())] as usize
}

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    /// Pushes the given run length to the front, the light border counting as
    /// part of the first run.
    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size;
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    /// Can only be called immediately after a light run is added.
    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        debug_assert!(n <= self.qr_size * 3);
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size;
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

const PAD_BYTES: [u8; 2] = [0xec, 0x11];

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Error correction level for a QR code.
///
/// Higher levels survive more damage (or a bigger logo) at the cost of capacity.
/// The default is [`QrCodeEcc::High`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    #[default]
    High,
}

impl QrCodeEcc {
    /// All levels, lowest first.
    pub const ALL: [QrCodeEcc; 4] = [
        QrCodeEcc::Low,
        QrCodeEcc::Medium,
        QrCodeEcc::Quartile,
        QrCodeEcc::High,
    ];

    /// Returns an unsigned 2-bit integer (in the range 0 to 3).
    fn ordinal(self) -> usize {
        use QrCodeEcc::*;
        match self {
            Low => 0,
            Medium => 1,
            Quartile => 2,
            High => 3,
        }
    }

    /// Returns the 2-bit value written in the format information.
    fn format_bits(self) -> u8 {
        use QrCodeEcc::*;
        match self {
            Low => 1,
            Medium => 0,
            Quartile => 3,
            High => 2,
        }
    }
}

impl FromStr for QrCodeEcc {
    type Err = String;

    /// Accepts `L`/`M`/`Q`/`H` or the full level names, case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(QrCodeEcc::Low),
            "m" | "medium" => Ok(QrCodeEcc::Medium),
            "q" | "quartile" => Ok(QrCodeEcc::Quartile),
            "h" | "high" => Ok(QrCodeEcc::High),
            other => Err(format!("unknown error correction level: {other}")),
        }
    }
}

/// A segment of data in a QR code.
///
/// Supports numeric, alphanumeric, byte, or ECI modes. Segments are immutable and created using
/// factory functions like [`QrSegment::make_numeric`], [`QrSegment::make_alphanumeric`] or
/// [`QrSegment::make_bytes`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrSegment {
    mode: QrSegmentMode,
    numchars: usize,
    data: Vec<u8>,
    bitlength: usize,
}

impl QrSegment {
    /// Creates a segment for binary data in byte mode.
    pub fn make_bytes(data: &[u8]) -> Self {
        QrSegment::new(QrSegmentMode::Byte, data.len(), data.to_vec(), data.len() * 8)
    }

    /// Creates a segment for a string of decimal digits in numeric mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharacter`] if `text` contains anything but `0`-`9`.
    pub fn make_numeric(text: &str) -> Result<Self> {
        if let Some(ch) = text.chars().find(|c| !c.is_ascii_digit()) {
            return Err(Error::UnsupportedCharacter {
                ch,
                mode: QrSegmentMode::Numeric,
            });
        }
        Ok(QrSegment::numeric_from_bytes(text.as_bytes()))
    }

    /// Creates a segment for alphanumeric text.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharacter`] for any other character.
    pub fn make_alphanumeric(text: &str) -> Result<Self> {
        if let Some(ch) = text.chars().find(|&c| !ALPHANUMERIC_CHARSET.contains(c)) {
            return Err(Error::UnsupportedCharacter {
                ch,
                mode: QrSegmentMode::Alphanumeric,
            });
        }
        Ok(QrSegment::alphanumeric_from_bytes(text.as_bytes()))
    }

    /// Creates a segment representing an Extended Channel Interpretation
    /// (ECI) designator with the given assignment value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EciOutOfRange`] if `assignval` is 1,000,000 or more.
    pub fn make_eci(assignval: u32) -> Result<Self> {
        let mut bb = BitBuffer::new();
        if assignval < 1 << 7 {
            bb.append_bits(assignval, 8);
        } else if assignval < 1 << 14 {
            bb.append_bits(0b10, 2);
            bb.append_bits(assignval, 14);
        } else if assignval < 1_000_000 {
            bb.append_bits(0b110, 3);
            bb.append_bits(assignval, 21);
        } else {
            return Err(Error::EciOutOfRange(assignval));
        }
        let bitlength = bb.len();
        Ok(QrSegment::new(QrSegmentMode::Eci, 0, bb.into_bytes(), bitlength))
    }

    /// Returns the segments for `data` in the most compact single mode:
    /// numeric, then alphanumeric, then byte. Empty data gives no segments.
    pub fn make_segments(data: &[u8]) -> Vec<Self> {
        if data.is_empty() {
            Vec::new()
        } else if data.iter().all(u8::is_ascii_digit) {
            vec![QrSegment::numeric_from_bytes(data)]
        } else if data.iter().all(|&b| ALPHANUMERIC_CHARSET.as_bytes().contains(&b)) {
            vec![QrSegment::alphanumeric_from_bytes(data)]
        } else {
            vec![QrSegment::make_bytes(data)]
        }
    }

    fn numeric_from_bytes(digits: &[u8]) -> Self {
        let mut bb = BitBuffer::new();
        for chunk in digits.chunks(3) {
            let value = chunk
                .iter()
                .fold(0u32, |acc, &b| acc * 10 + u32::from(b - b'0'));
            bb.append_bits(value, chunk.len() as u8 * 3 + 1);
        }
        let bitlength = bb.len();
        QrSegment::new(QrSegmentMode::Numeric, digits.len(), bb.into_bytes(), bitlength)
    }

    fn alphanumeric_from_bytes(text: &[u8]) -> Self {
        let mut bb = BitBuffer::new();
        for pair in text.chunks(2) {
            let value = pair.iter().fold(0u32, |acc, &b| {
                acc * 45 + ALPHANUMERIC_CHARSET.bytes().position(|c| c == b).unwrap_or(0) as u32
            });
            bb.append_bits(value, if pair.len() == 2 { 11 } else { 6 });
        }
        let bitlength = bb.len();
        QrSegment::new(QrSegmentMode::Alphanumeric, text.len(), bb.into_bytes(), bitlength)
    }

    fn new(mode: QrSegmentMode, numchars: usize, data: Vec<u8>, bitlength: usize) -> Self {
        debug_assert!(bitlength == 0 || (bitlength - 1) / 8 < data.len());
        Self {
            mode,
            numchars,
            data,
            bitlength,
        }
    }

    pub fn mode(&self) -> QrSegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    /// Number of payload bits, excluding mode indicator and count field.
    pub fn bit_len(&self) -> usize {
        self.bitlength
    }

    /// Total bits needed to encode the segments at `version`, or `None` if a
    /// segment has too many characters for its count field.
    fn get_total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let ccbits: u8 = seg.mode.num_char_count_bits(version);
            if let Some(limit) = (1usize).checked_shl(ccbits.into()) {
                if seg.numchars >= limit {
                    return None;
                }
            }
            result = result.checked_add(4 + usize::from(ccbits))?;
            result = result.checked_add(seg.bitlength)?;
        }
        Some(result)
    }

    pub fn is_numeric(text: &str) -> bool {
        text.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }
}

static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Describes how a segment's data bits are interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QrSegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
    Eci,
}

impl QrSegmentMode {
    fn mode_bits(self) -> u32 {
        use QrSegmentMode::*;
        match self {
            Numeric => 0x1,
            Alphanumeric => 0x2,
            Byte => 0x4,
            Eci => 0x7,
        }
    }

    /// Width of the character count field, which grows at versions 10 and 27.
    fn num_char_count_bits(self, ver: Version) -> u8 {
        use QrSegmentMode::*;
        (match self {
            Numeric => [10, 12, 14],
            Alphanumeric => [9, 11, 13],
            Byte => [8, 16, 16],
            Eci => [0, 0, 0],
        })[usize::from((ver.value() + 7) / 17)]
    }
}

/// An appendable sequence of bits, packed big-endian into bytes.
#[derive(Clone, Default, Debug)]
pub struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0);
        for i in (0..len).rev() {
            let shift: usize = 7 - (self.length & 7);
            let bit: u8 = ((val >> i) as u8) & 1;
            if shift == 7 {
                self.data.push(bit << shift);
            } else if let Some(last) = self.data.last_mut() {
                *last |= bit << shift;
            }
            self.length += 1;
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Error type for when data exceeds QR code capacity.
///
/// Ways to handle this error include:
///
/// - Decrease the error correction level if it was greater than `QrCodeEcc::Low`.
/// - Increase the maxversion argument if it was less than `Version::MAX`.
/// - Change the text or binary data to be shorter.
/// - Change the text to fit the character set of a particular segment mode (e.g. alphanumeric).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataTooLong {
    /// A segment has too many characters for its count field.
    #[error("Segment too long")]
    SegmentTooLong,
    /// Data length exceeds capacity, both in bits.
    #[error("Data length = {0} bits, Max capacity = {1} bits")]
    DataOverCapacity(usize, usize),
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Like [`Version::new`], returning `None` outside [1, 40].
    pub const fn try_new(ver: u8) -> Option<Self> {
        if Version::MIN.value() <= ver && ver <= Version::MAX.value() {
            Some(Self(ver))
        } else {
            None
        }
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Side length in modules.
    pub const fn size(self) -> i32 {
        self.0 as i32 * 4 + 17
    }

    /// Center coordinates of the alignment patterns along one axis, ascending.
    /// Empty for version 1. Patterns sit at every combination of these except the
    /// three finder corners.
    pub fn alignment_pattern_positions(self) -> Vec<i32> {
        let ver = i32::from(self.0);
        if ver == 1 {
            return Vec::new();
        }
        let numalign: i32 = ver / 7 + 2;
        let step: i32 = if ver == 32 {
            26
        } else {
            ((ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2)) * 2
        };
        let mut result: Vec<i32> = (0..numalign - 1)
            .map(|i| self.size() - 7 - i * step)
            .collect();
        result.push(6);
        result.reverse();
        result
    }

    /// Number of modules available for codewords (data plus error correction),
    /// remainder bits included.
    pub fn num_raw_data_modules(self) -> usize {
        let ver = usize::from(self.0);
        let mut result: usize = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let numalign: usize = ver / 7 + 2;
            result -= (25 * numalign - 10) * numalign - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    /// Number of 8-bit data codewords at the given level.
    pub fn num_data_codewords(self, ecl: QrCodeEcc) -> usize {
        self.num_raw_data_modules() / 8
            - table_get(&ECC_CODEWORDS_PER_BLOCK, self, ecl)
                * table_get(&NUM_ERROR_CORRECTION_BLOCKS, self, ecl)
    }

    /// Total error correction codewords at the given level.
    pub fn num_ecc_codewords(self, ecl: QrCodeEcc) -> usize {
        self.num_raw_data_modules() / 8 - self.num_data_codewords(ecl)
    }

    /// Largest byte-mode payload that fits in this version at the given level.
    pub fn byte_capacity(self, ecl: QrCodeEcc) -> usize {
        let overhead = 4 + usize::from(QrSegmentMode::Byte.num_char_count_bits(self));
        (self.num_data_codewords(ecl) * 8 - overhead) / 8
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this mask flips the data module at column `x`, row `y`.
    fn inverts(self, x: i32, y: i32) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => ((x * y) % 2) + ((x * y) % 3) == 0,
            6 => (((x * y) % 2) + ((x * y) % 3)) % 2 == 0,
            7 => (((x + y) % 2) + ((x * y) % 3)) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}
