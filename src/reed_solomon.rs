//! Reed-Solomon error correction over GF(2^8) with the QR field polynomial
//! x^8 + x^4 + x^3 + x^2 + 1 (0x11D).
//!
//! The exponent/logarithm tables and every generator polynomial a QR symbol can
//! ask for (degree 1 to 30) are computed at compile time.

/// Largest number of error correction codewords per block in any version/level.
pub(crate) const MAX_DEGREE: usize = 30;

const FIELD_POLY: u16 = 0x11d;

const fn build_exp_table() -> [u8; 256] {
    let mut exp = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= FIELD_POLY;
        }
        i += 1;
    }
    exp[255] = exp[0];
    exp
}

const fn build_log_table() -> [u8; 256] {
    let mut log = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        log[GF_EXP[i] as usize] = i as u8;
        i += 1;
    }
    log
}

const GF_EXP: [u8; 256] = build_exp_table();
const GF_LOG: [u8; 256] = build_log_table();

const fn gf_mul(x: u8, y: u8) -> u8 {
    if x == 0 || y == 0 {
        return 0;
    }
    GF_EXP[(GF_LOG[x as usize] as usize + GF_LOG[y as usize] as usize) % 255]
}

/// Coefficients of (x - a^0)(x - a^1)...(x - a^(d-1)) for every degree d,
/// highest power first with the implicit leading 1 dropped.
const fn build_generators() -> [[u8; MAX_DEGREE]; MAX_DEGREE + 1] {
    let mut table = [[0u8; MAX_DEGREE]; MAX_DEGREE + 1];
    let mut degree = 1;
    while degree <= MAX_DEGREE {
        let mut divisor = [0u8; MAX_DEGREE];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        let mut n = 0;
        while n < degree {
            let mut j = 0;
            while j < degree {
                divisor[j] = gf_mul(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
                j += 1;
            }
            root = gf_mul(root, 0x02);
            n += 1;
        }
        table[degree] = divisor;
        degree += 1;
    }
    table
}

static GENERATORS: [[u8; MAX_DEGREE]; MAX_DEGREE + 1] = build_generators();

/// Returns the generator polynomial of the given degree.
pub(crate) fn generator(degree: usize) -> &'static [u8] {
    assert!((1..=MAX_DEGREE).contains(&degree), "Degree out of range");
    &GENERATORS[degree][..degree]
}

/// Computes the `degree` error correction codewords for one block of data.
pub(crate) fn compute_remainder(data: &[u8], degree: usize) -> Vec<u8> {
    let divisor = generator(degree);
    let mut result = vec![0u8; degree];
    for &b in data {
        let factor: u8 = b ^ result[0];
        result.copy_within(1.., 0);
        result[degree - 1] = 0;
        for (x, &y) in result.iter_mut().zip(divisor) {
            *x ^= gf_mul(y, factor);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_inverse() {
        for x in 1..=255u8 {
            assert_eq!(GF_EXP[GF_LOG[x as usize] as usize], x);
        }
        assert_eq!(gf_mul(0x02, 0x80), 0x1d);
        assert_eq!(gf_mul(0, 0x53), 0);
    }

    #[test]
    fn test_generator_degree_7() {
        assert_eq!(generator(7), &[127, 122, 154, 164, 11, 68, 117]);
    }

    #[test]
    fn test_hello_world_1m_remainder() {
        // "HELLO WORLD", version 1-M data codewords.
        let data = [32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236, 17, 236, 17];
        assert_eq!(
            compute_remainder(&data, 10),
            vec![196, 35, 39, 119, 235, 215, 231, 226, 93, 23]
        );
    }
}
