//! Gray-coded BPSK/QPSK/16-QAM/64-QAM constellations and the soft demapper.

use num_complex::Complex64;

/// Converts a Gray-coded `k`-bit value (MSB first) to its natural binary
/// value, then to a symmetric odd-integer amplitude level (e.g. for k=2:
/// {-3,-1,1,3}).
fn gray_to_amplitude(bits: &[u8]) -> i32 {
    let k = bits.len();
    let mut binary = vec![0u8; k];
    binary[0] = bits[0];
    for i in 1..k {
        binary[i] = binary[i - 1] ^ bits[i];
    }
    let mut value: i32 = 0;
    for &b in &binary {
        value = (value << 1) | b as i32;
    }
    2 * value - ((1 << k) - 1)
}

/// Returns the unit-average-power normalization factor for `nbpsc` bits per
/// subcarrier, matching IEEE 802.11a Table 17-9 (sqrt(2), sqrt(10), sqrt(42)).
fn normalization(nbpsc: usize) -> f64 {
    match nbpsc {
        1 => 1.0,
        2 => 2f64.sqrt(),
        4 => 10f64.sqrt(),
        6 => 42f64.sqrt(),
        other => panic!("unsupported Nbpsc {other}"),
    }
}

/// Maps `nbpsc` bits (MSB first) to a unit-average-power constellation
/// point. BPSK uses only the real axis.
pub fn map_symbol(nbpsc: usize, bits: &[u8]) -> Complex64 {
    assert_eq!(bits.len(), nbpsc);
    let scale = normalization(nbpsc);
    if nbpsc == 1 {
        let re = gray_to_amplitude(bits) as f64;
        Complex64::new(re / scale, 0.0)
    } else {
        let half = nbpsc / 2;
        let re = gray_to_amplitude(&bits[..half]) as f64;
        let im = gray_to_amplitude(&bits[half..]) as f64;
        Complex64::new(re / scale, im / scale)
    }
}

/// Enumerates the full constellation, indexed by the integer formed from
/// its `nbpsc` mapping bits (MSB first).
pub fn constellation(nbpsc: usize) -> Vec<Complex64> {
    let n = 1usize << nbpsc;
    (0..n)
        .map(|code| {
            let bits: Vec<u8> = (0..nbpsc)
                .map(|i| ((code >> (nbpsc - 1 - i)) & 1) as u8)
                .collect();
            map_symbol(nbpsc, &bits)
        })
        .collect()
}

/// Maximum magnitude of a scaled LLR, per the dense fixed-point convention
/// used throughout the FEC chain (values are scaled by 10).
pub const LLR_CLIP: f64 = 10_000.0;

/// Computes the `nbpsc` per-bit LLRs for a received sample `y` given the
/// noise variance `sigma2`, clipped to `+/- LLR_CLIP` and scaled by 10.
pub fn soft_demap(y: Complex64, nbpsc: usize, sigma2: f64) -> Vec<i32> {
    let sigma2 = sigma2.max(1e-9);
    let points = constellation(nbpsc);
    let dist: Vec<f64> = points.iter().map(|p| (y - p).norm_sqr() / sigma2).collect();

    (0..nbpsc)
        .map(|bit_pos| {
            let mut max1 = f64::NEG_INFINITY;
            let mut max0 = f64::NEG_INFINITY;
            for (code, &d) in dist.iter().enumerate() {
                let bit = (code >> (nbpsc - 1 - bit_pos)) & 1;
                let score = -d;
                if bit == 1 {
                    max1 = max1.max(score);
                } else {
                    max0 = max0.max(score);
                }
            }
            let mut sum1 = 0.0;
            let mut sum0 = 0.0;
            for (code, &d) in dist.iter().enumerate() {
                let bit = (code >> (nbpsc - 1 - bit_pos)) & 1;
                let score = (-d - if bit == 1 { max1 } else { max0 }).exp();
                if bit == 1 {
                    sum1 += score;
                } else {
                    sum0 += score;
                }
            }
            let llr = (max1 + sum1.ln()) - (max0 + sum0.ln());
            let scaled = llr * 10.0;
            scaled.clamp(-LLR_CLIP, LLR_CLIP) as i32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constellations_have_unit_average_power() {
        for nbpsc in [1usize, 2, 4, 6] {
            let points = constellation(nbpsc);
            let avg: f64 = points.iter().map(|p| p.norm_sqr()).sum::<f64>() / points.len() as f64;
            assert!((avg - 1.0).abs() < 1e-9, "nbpsc={nbpsc} avg power {avg}");
        }
    }

    #[test]
    fn adjacent_points_differ_by_one_bit() {
        for nbpsc in [2usize, 4, 6] {
            let half = nbpsc / 2;
            let levels = 1usize << half;
            for level in 0..levels - 1 {
                let bits_a: Vec<u8> = (0..half).map(|i| ((level >> (half - 1 - i)) & 1) as u8).collect();
                let bits_b: Vec<u8> = (0..half)
                    .map(|i| (((level + 1) >> (half - 1 - i)) & 1) as u8)
                    .collect();
                let diff = bits_a.iter().zip(&bits_b).filter(|(a, b)| a != b).count();
                assert_eq!(diff, 1, "nbpsc={nbpsc} level {level}->{}", level + 1);
            }
        }
    }

    #[test]
    fn demapper_favors_transmitted_symbol_at_low_noise() {
        for nbpsc in [1usize, 2, 4, 6] {
            let points = constellation(nbpsc);
            for (code, &s) in points.iter().enumerate() {
                let llrs = soft_demap(s, nbpsc, 1e-6);
                for bit_pos in 0..nbpsc {
                    let bit = (code >> (nbpsc - 1 - bit_pos)) & 1;
                    if bit == 1 {
                        assert!(llrs[bit_pos] > 0, "nbpsc={nbpsc} code={code}");
                    } else {
                        assert!(llrs[bit_pos] < 0, "nbpsc={nbpsc} code={code}");
                    }
                }
            }
        }
    }
}
