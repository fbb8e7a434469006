//! OFDM framer: subcarrier layout, IFFT/FFT, cyclic prefix, and the
//! STS/LTS training sequences.

use num_complex::Complex64;
use once_cell::sync::Lazy;
use rustfft::{num_complex::Complex32, FftPlanner};

pub const NFFT: usize = 64;
pub const NCP: usize = 16;
pub const SYMBOL_LEN: usize = NFFT + NCP;

/// Subcarrier indices carrying DATA, in transmit order.
pub static DATA_CARRIERS: Lazy<Vec<i32>> = Lazy::new(|| {
    let mut v = Vec::with_capacity(48);
    v.extend(-26..=-22);
    v.extend(-20..=-8);
    v.extend(-6..=-1);
    v.extend(1..=6);
    v.extend(8..=20);
    v.extend(22..=26);
    v
});

/// Subcarrier indices carrying pilots, in transmit order.
pub const PILOT_CARRIERS: [i32; 4] = [-21, -7, 7, 21];
/// Fixed pilot template multiplied by the per-symbol polarity bit.
pub const PILOT_TEMPLATE: [f64; 4] = [1.0, 1.0, 1.0, -1.0];

/// Maps a signed subcarrier index (negative indices wrap) to its FFT bin.
pub fn bin_of(subcarrier: i32) -> usize {
    subcarrier.rem_euclid(NFFT as i32) as usize
}

fn planner_pair() -> (std::sync::Arc<dyn rustfft::Fft<f32>>, std::sync::Arc<dyn rustfft::Fft<f32>>) {
    let mut planner = FftPlanner::new();
    (planner.plan_fft_forward(NFFT), planner.plan_fft_inverse(NFFT))
}

/// Inverse-transforms a 64-bin spectrum (DC and guard bins already zero) to
/// the time domain, normalized so unit spectral energy maps to unit
/// average time-domain energy.
pub fn ifft64(spectrum: &[Complex64; NFFT]) -> Vec<Complex64> {
    let (_, ifft) = planner_pair();
    let mut buf: Vec<Complex32> = spectrum
        .iter()
        .map(|c| Complex32::new(c.re as f32, c.im as f32))
        .collect();
    ifft.process(&mut buf);
    let scale = 1.0 / (NFFT as f32);
    buf.iter()
        .map(|c| Complex64::new((c.re * scale) as f64, (c.im * scale) as f64))
        .collect()
}

/// Forward-transforms `NFFT` time-domain samples to the frequency domain.
pub fn fft64(time: &[Complex64]) -> Vec<Complex64> {
    assert_eq!(time.len(), NFFT);
    let (fft, _) = planner_pair();
    let mut buf: Vec<Complex32> = time
        .iter()
        .map(|c| Complex32::new(c.re as f32, c.im as f32))
        .collect();
    fft.process(&mut buf);
    buf.iter().map(|c| Complex64::new(c.re as f64, c.im as f64)).collect()
}

/// Places 48 DATA symbols and 4 pilot symbols (already multiplied by the
/// per-symbol polarity) onto a 64-bin spectrum with DC and guard bins zero.
pub fn place_subcarriers(data: &[Complex64], pilots: [Complex64; 4]) -> [Complex64; NFFT] {
    assert_eq!(data.len(), DATA_CARRIERS.len());
    let mut spectrum = [Complex64::new(0.0, 0.0); NFFT];
    for (&idx, &sym) in DATA_CARRIERS.iter().zip(data.iter()) {
        spectrum[bin_of(idx)] = sym;
    }
    for (&idx, &sym) in PILOT_CARRIERS.iter().zip(pilots.iter()) {
        spectrum[bin_of(idx)] = sym;
    }
    spectrum
}

/// Builds the four pilot symbols for symbol ordinal `n`: the fixed
/// template multiplied by the scrambler-derived polarity bit.
pub fn pilot_symbols(polarity_ordinal: usize) -> [Complex64; 4] {
    let p = if crate::bits::scrambler::bit(crate::bits::scrambler::PILOT_SEED, polarity_ordinal) == 1 {
        -1.0
    } else {
        1.0
    };
    std::array::from_fn(|i| Complex64::new(PILOT_TEMPLATE[i] * p, 0.0))
}

/// IFFTs one OFDM symbol and prepends its cyclic prefix, returning
/// `SYMBOL_LEN + 1` (81) time-domain samples: the cyclic prefix, the
/// symbol itself, and one trailing wrap sample (`time[0]`, the sample the
/// symbol's own periodicity would repeat next). `overlap_add_concat`
/// consumes that trailing sample when blending into the following
/// segment, so the net stride contributed per symbol is exactly
/// `SYMBOL_LEN` (80) despite the one-sample crossfade at each boundary.
pub fn modulate_symbol(spectrum: &[Complex64; NFFT]) -> Vec<Complex64> {
    let time = ifft64(spectrum);
    let mut out = Vec::with_capacity(SYMBOL_LEN + 1);
    out.extend_from_slice(&time[NFFT - NCP..]);
    out.extend_from_slice(&time);
    out.push(time[0]);
    out
}

/// STS nonzero subcarrier indices and their unscaled +/-1+/-1j values, per
/// clause 17.3.3.
const STS_INDICES: [i32; 12] = [4, 8, 12, 16, 20, 24, -24, -20, -16, -12, -8, -4];
/// Sign applied to `(1+j) * sqrt(13/6)` at each index above, in the same
/// order, per clause 17.3.3.
const STS_SIGNS: [f64; 12] = [-1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, 1.0, -1.0, -1.0, 1.0];

/// The 64-long +/-1 LTS pattern, natural subcarrier order (index 0 = DC).
#[rustfmt::skip]
const LTS_PATTERN: [i32; NFFT] = [
    0, 1,-1,-1, 1, 1,-1, 1,-1, 1,-1,-1,-1,-1,-1, 1,
    1,-1,-1, 1,-1, 1,-1, 1, 1, 1, 1, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 1, 1,-1,-1, 1, 1,-1, 1,-1, 1,
    1, 1, 1, 1, 1,-1,-1, 1, 1,-1, 1,-1, 1, 1, 1, 1,
];

/// Number of 16-sample repeats composing the STS (spans `2*(NCP+NFFT)`
/// samples).
pub const STS_SAMPLES: usize = 2 * (NCP + NFFT);
/// The long cyclic prefix preceding the two LTS repeats.
pub const LTS_PREFIX_LEN: usize = 2 * NCP;
pub const LTS_SAMPLES: usize = LTS_PREFIX_LEN + 2 * NFFT;

/// Raw (pre-blend) STS, one sample longer than `STS_SAMPLES`: the tiled
/// 16-sample period plus one trailing wrap sample, consumed the same way
/// `modulate_symbol`'s trailing sample is consumed when this sequence is
/// overlap-added against the LTS that follows it.
static STS_TIME: Lazy<Vec<Complex64>> = Lazy::new(|| {
    let mut spectrum = [Complex64::new(0.0, 0.0); NFFT];
    let scale = (13.0f64 / 6.0).sqrt();
    for (i, &idx) in STS_INDICES.iter().enumerate() {
        let sign = STS_SIGNS[i];
        spectrum[bin_of(idx)] = Complex64::new(sign, sign) * scale;
    }
    let one_period = ifft64(&spectrum);
    let tile_len = NFFT / 4; // 16 samples
    let base = &one_period[..tile_len];
    (0..=STS_SAMPLES).map(|n| base[n % tile_len]).collect()
});

/// Raw (pre-blend) LTS, one sample longer than `LTS_SAMPLES` for the same
/// reason as [`STS_TIME`]: a trailing wrap sample the overlap-add with the
/// SIGNAL symbol consumes.
static LTS_TIME: Lazy<Vec<Complex64>> = Lazy::new(|| {
    let mut spectrum = [Complex64::new(0.0, 0.0); NFFT];
    for (bin, &v) in LTS_PATTERN.iter().enumerate() {
        spectrum[bin] = Complex64::new(v as f64, 0.0);
    }
    let one_symbol = ifft64(&spectrum);
    let mut out = Vec::with_capacity(LTS_SAMPLES + 1);
    out.extend_from_slice(&one_symbol[NFFT - LTS_PREFIX_LEN..]);
    out.extend_from_slice(&one_symbol);
    out.extend_from_slice(&one_symbol);
    out.push(one_symbol[0]);
    out
});

/// Reference frequency-domain LTS (for channel estimation).
pub static LTS_REFERENCE_SPECTRUM: Lazy<[Complex64; NFFT]> = Lazy::new(|| {
    std::array::from_fn(|bin| Complex64::new(LTS_PATTERN[bin] as f64, 0.0))
});

/// Generates the time-domain short training sequence: `STS_SAMPLES`
/// (160) nominal samples plus one trailing wrap sample consumed by
/// `overlap_add_concat`'s blend with the segment that follows.
pub fn generate_sts() -> Vec<Complex64> {
    STS_TIME.clone()
}

/// Generates the time-domain long training sequence (long CP + two
/// repeats): `LTS_SAMPLES` (160) nominal samples plus one trailing wrap
/// sample, for the same reason as [`generate_sts`].
pub fn generate_lts() -> Vec<Complex64> {
    LTS_TIME.clone()
}

/// Concatenates time-domain subsequences with a one-sample raised-cosine
/// overlap: the boundary sample is the average of the outgoing and
/// incoming edge samples, eliminating discontinuities between STS, LTS and
/// data symbols. Every segment passed in is expected to carry one extra
/// trailing "wrap" sample beyond its nominal length (as `generate_sts`,
/// `generate_lts` and `modulate_symbol` all do); that sample is exactly
/// the one this blend consumes at each join, so each segment after the
/// first contributes precisely its nominal length to the output and the
/// fixed-stride assumptions the receiver's training and per-symbol FFT
/// windows rely on hold exactly.
pub fn overlap_add_concat(segments: &[Vec<Complex64>]) -> Vec<Complex64> {
    assert!(!segments.is_empty());
    let mut out = segments[0].clone();
    for seg in &segments[1..] {
        if seg.is_empty() {
            continue;
        }
        let last = *out.last().expect("segment not empty");
        let first = seg[0];
        let boundary = 0.5 * last + 0.5 * first;
        *out.last_mut().unwrap() = boundary;
        out.extend_from_slice(&seg[1..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sts_has_expected_length() {
        // One sample longer than nominal: the trailing wrap sample
        // `overlap_add_concat` consumes when blending into the LTS.
        assert_eq!(generate_sts().len(), STS_SAMPLES + 1);
    }

    #[test]
    fn lts_has_expected_length() {
        assert_eq!(generate_lts().len(), LTS_SAMPLES + 1);
    }

    #[test]
    fn modulate_symbol_has_expected_length() {
        let spectrum = [Complex64::new(0.0, 0.0); NFFT];
        assert_eq!(modulate_symbol(&spectrum).len(), SYMBOL_LEN + 1);
    }

    #[test]
    fn blended_frame_preserves_fixed_stride() {
        // STS, LTS and two data symbols overlap-added together must land
        // each segment boundary exactly STS_SAMPLES/LTS_SAMPLES/SYMBOL_LEN
        // apart, matching the receiver's fixed-stride window assumptions,
        // despite every producer emitting one extra wrap sample.
        let spectrum = [Complex64::new(0.0, 0.0); NFFT];
        let segments = vec![
            generate_sts(),
            generate_lts(),
            modulate_symbol(&spectrum),
            modulate_symbol(&spectrum),
        ];
        let joined = overlap_add_concat(&segments);
        assert_eq!(joined.len(), STS_SAMPLES + LTS_SAMPLES + 2 * SYMBOL_LEN + 1);
    }

    #[test]
    fn data_and_pilot_carriers_partition_48_plus_4() {
        assert_eq!(DATA_CARRIERS.len(), 48);
        assert_eq!(PILOT_CARRIERS.len(), 4);
    }

    #[test]
    fn ifft_fft_round_trip() {
        let mut spectrum = [Complex64::new(0.0, 0.0); NFFT];
        spectrum[bin_of(5)] = Complex64::new(1.0, -0.5);
        spectrum[bin_of(-10)] = Complex64::new(-0.3, 0.7);
        let time = ifft64(&spectrum);
        let back = fft64(&time);
        for (bin, &orig) in spectrum.iter().enumerate() {
            assert!((back[bin] - orig).norm() < 1e-9, "bin {bin}");
        }
    }

    #[test]
    fn overlap_add_blends_boundary() {
        let a = vec![Complex64::new(1.0, 0.0); 4];
        let b = vec![Complex64::new(3.0, 0.0); 4];
        let joined = overlap_add_concat(&[a, b]);
        assert_eq!(joined.len(), 7);
        assert!((joined[3] - Complex64::new(2.0, 0.0)).norm() < 1e-9);
    }
}
