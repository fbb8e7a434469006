//! Per-frame decoder: everything downstream of a confirmed preamble peak.
//!
//! One [`FrameDecoder`] is instantiated per candidate frame and fed
//! baseband samples until it either yields a payload, discards itself on
//! a bad SIGNAL/CRC, or starves waiting for samples that never arrive.
//! Multiple decoders run concurrently in the streaming receiver so a
//! slow-to-confirm frame never blocks a frame behind it.

use num_complex::Complex64;
use tracing::{trace, warn};

use crate::bits::{bits_to_bytes_lsb_first, convcode, crc, qam, scrambler};
use crate::ekf::{PilotTracker, PilotTrackerConfig};
use crate::errors::FrameError;
use crate::ofdm::{
    bin_of, fft64, DATA_CARRIERS, LTS_PREFIX_LEN, LTS_REFERENCE_SPECTRUM, LTS_SAMPLES, NCP, NFFT,
    PILOT_CARRIERS, STS_SAMPLES,
};
use crate::protocol::{rate_by_code, Rate, SignalWord, SERVICE_BITS, TAIL_BITS};

/// Search window, in samples, for the LTS repeat boundary around its
/// nominal offset; absorbs residual timing error left by coarse peak
/// detection.
const LTS_SEARCH_RADIUS: i32 = 8;

/// What a frame decoder produced once it has consumed every sample it
/// needs.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Payload { bytes: Vec<u8>, snr_db: f64 },
    Discarded(FrameError),
}

enum State {
    /// Accumulating the STS + LTS training region.
    Training,
    /// Training succeeded; waiting for the one-symbol SIGNAL field.
    AwaitingSignal {
        channel_est: [Complex64; NFFT],
        cfo_per_sample: f64,
        noise_var: f64,
        uncertainty: f64,
    },
    /// SIGNAL decoded; accumulating DATA OFDM symbols. `dispersion` is the
    /// SIGNAL constellation's residual variance, the noise estimate used
    /// for demapping and reporting DATA symbols (distinct from the LTS
    /// training `noise_var` baked into the EKF's fixed configuration).
    AwaitingData {
        channel_est: [Complex64; NFFT],
        cfo_per_sample: f64,
        dispersion: f64,
        rate: Rate,
        length_octets: u16,
        symbols_needed: usize,
        symbols_seen: usize,
        tracker: PilotTracker,
        llrs: Vec<i32>,
    },
    Done,
}

/// Decodes one candidate 802.11a-style frame from baseband samples
/// aligned so that sample 0 is the first STS sample.
pub struct FrameDecoder {
    samples: Vec<Complex64>,
    consumed: usize,
    state: State,
    mtu_octets: usize,
}

impl FrameDecoder {
    pub fn new(mtu_octets: usize) -> Self {
        Self { samples: Vec::new(), consumed: 0, state: State::Training, mtu_octets }
    }

    /// Appends newly arrived baseband samples (already downconverted and
    /// decimated by the front end) to this frame's buffer.
    pub fn feed(&mut self, samples: &[Complex64]) {
        self.samples.extend_from_slice(samples);
    }

    /// Drives the state machine as far as the currently buffered samples
    /// allow, returning `Some` once a terminal outcome is reached.
    ///
    /// Each step takes ownership of `self.state` (leaving a `Done`
    /// placeholder behind) so the transition logic can move out of the
    /// old state freely instead of juggling borrows of an enum it is
    /// about to overwrite.
    pub fn poll(&mut self) -> Option<FrameOutcome> {
        loop {
            let state = std::mem::replace(&mut self.state, State::Done);
            match state {
                State::Training => {
                    let needed = STS_SAMPLES + LTS_SAMPLES;
                    if self.samples.len() < needed {
                        self.state = State::Training;
                        return None;
                    }
                    match train(&self.samples[..needed]) {
                        Some((channel_est, cfo_per_sample, noise_var, uncertainty)) => {
                            self.consumed = needed;
                            self.state = State::AwaitingSignal {
                                channel_est,
                                cfo_per_sample,
                                noise_var,
                                uncertainty,
                            };
                        }
                        None => return Some(FrameOutcome::Discarded(FrameError::NoPreamble)),
                    }
                }
                State::AwaitingSignal { channel_est, cfo_per_sample, noise_var, uncertainty } => {
                    let symbol_len = NCP + NFFT;
                    if self.samples.len() < self.consumed + symbol_len {
                        self.state =
                            State::AwaitingSignal { channel_est, cfo_per_sample, noise_var, uncertainty };
                        return None;
                    }
                    let symbol = &self.samples[self.consumed..self.consumed + symbol_len];
                    let llrs =
                        demod_symbol(symbol, &channel_est, cfo_per_sample, self.consumed, 1, noise_var);
                    let info_bits = convcode::decode(&llrs);
                    let equalized = equalize_symbol(symbol, &channel_est, cfo_per_sample, self.consumed);
                    self.consumed += symbol_len;

                    let signal = match SignalWord::from_bits(&info_bits[..24]) {
                        Some(s) => s,
                        None => return Some(FrameOutcome::Discarded(FrameError::BadSignal)),
                    };
                    let rate = rate_by_code(signal.rate_code).expect("validated by from_bits");
                    if signal.length_octets as usize > self.mtu_octets {
                        return Some(FrameOutcome::Discarded(FrameError::LengthExceedsMtu(
                            signal.length_octets,
                        )));
                    }
                    let symbols_needed = rate.total_data_symbols(signal.length_octets);
                    let signal_bits: [u8; 24] =
                        info_bits[..24].try_into().expect("sliced to exactly 24 bits");
                    let dispersion = signal_dispersion(&equalized, &signal_bits);
                    trace!(
                        rate_code = signal.rate_code,
                        length = signal.length_octets,
                        symbols_needed,
                        dispersion,
                        "SIGNAL decoded"
                    );

                    let tracker_cfg = PilotTrackerConfig {
                        num_pilots: PILOT_CARRIERS.len() as f64,
                        var_ni: noise_var,
                        uncertainty,
                    };
                    self.state = State::AwaitingData {
                        channel_est,
                        cfo_per_sample,
                        dispersion,
                        rate,
                        length_octets: signal.length_octets,
                        symbols_needed,
                        symbols_seen: 0,
                        tracker: PilotTracker::new(tracker_cfg),
                        llrs: Vec::with_capacity(symbols_needed * rate.ncbps()),
                    };
                }
                State::AwaitingData {
                    channel_est,
                    cfo_per_sample,
                    dispersion,
                    rate,
                    length_octets,
                    symbols_needed,
                    symbols_seen,
                    mut tracker,
                    mut llrs,
                } => {
                    if symbols_seen == symbols_needed {
                        return Some(finish_data(rate, length_octets, &llrs, dispersion));
                    }
                    let symbol_len = NCP + NFFT;
                    if self.samples.len() < self.consumed + symbol_len {
                        self.state = State::AwaitingData {
                            channel_est,
                            cfo_per_sample,
                            dispersion,
                            rate,
                            length_octets,
                            symbols_needed,
                            symbols_seen,
                            tracker,
                            llrs,
                        };
                        return None;
                    }

                    let start = self.consumed;
                    let symbol = &self.samples[start..start + symbol_len];
                    let ordinal = symbols_seen + 1; // symbol 0 was SIGNAL.
                    let equalized = equalize_symbol(symbol, &channel_est, cfo_per_sample, start);

                    // Pilots carry a known template sign times a known
                    // scrambler-driven polarity; both are predictable from
                    // `ordinal` alone, so strip them before handing the
                    // aggregate to the EKF, which tracks only the
                    // unpredictable residual phase/amplitude drift.
                    let polarity =
                        if scrambler::bit(scrambler::PILOT_SEED, ordinal) == 1 { -1.0 } else { 1.0 };
                    let pilot_sum: Complex64 = PILOT_CARRIERS
                        .iter()
                        .zip(crate::ofdm::PILOT_TEMPLATE)
                        .map(|(&c, template)| equalized[bin_of(c)] * (template * polarity))
                        .sum();
                    let derotation = tracker.update(pilot_sum);

                    for &carrier in DATA_CARRIERS.iter() {
                        let y = equalized[bin_of(carrier)] * derotation;
                        llrs.extend(qam::soft_demap(y, rate.nbpsc, dispersion));
                    }

                    self.consumed += symbol_len;
                    self.state = State::AwaitingData {
                        channel_est,
                        cfo_per_sample,
                        dispersion,
                        rate,
                        length_octets,
                        symbols_needed,
                        symbols_seen: ordinal,
                        tracker,
                        llrs,
                    };
                }
                State::Done => return None,
            }
        }
    }
}

/// Trains on the STS+LTS region: coarse CFO from the STS's 16-sample
/// periodicity, fine timing/CFO and a per-bin channel estimate from the
/// LTS's two repeated 64-sample symbols, searched over a small window to
/// absorb residual timing error. Returns `None` if no training metric
/// clears a sane correlation threshold (no usable preamble). The third and
/// fourth elements of the returned tuple are the per-subcarrier noise
/// variance and the EKF's initial phase-noise uncertainty, both derived
/// from the LTS residual.
fn train(window: &[Complex64]) -> Option<([Complex64; NFFT], f64, f64, f64)> {
    let sts = &window[..STS_SAMPLES];
    let sts_period = crate::frontend::STS_PERIOD;
    let mut coarse_acc = Complex64::new(0.0, 0.0);
    let reps = STS_SAMPLES / sts_period - 1;
    for r in 0..reps {
        let a = &sts[r * sts_period..(r + 1) * sts_period];
        let b = &sts[(r + 1) * sts_period..(r + 2) * sts_period];
        for (x, y) in a.iter().zip(b) {
            coarse_acc += x.conj() * y;
        }
    }
    if coarse_acc.norm() < 1e-9 {
        return None;
    }
    let coarse_cfo = coarse_acc.arg() / sts_period as f64;

    let lts_region = &window[STS_SAMPLES..STS_SAMPLES + LTS_SAMPLES];
    let derotated: Vec<Complex64> = lts_region
        .iter()
        .enumerate()
        .map(|(n, &s)| s * Complex64::from_polar(1.0, -coarse_cfo * n as f64))
        .collect();

    let mut best_metric = f64::MIN;
    let mut best_channel = [Complex64::new(0.0, 0.0); NFFT];
    let mut best_fine_cfo = 0.0;
    let mut found = false;

    for offset in -LTS_SEARCH_RADIUS..=LTS_SEARCH_RADIUS {
        let start = LTS_PREFIX_LEN as i32 + offset;
        if start < 0 || (start as usize) + 2 * NFFT > derotated.len() {
            continue;
        }
        let start = start as usize;
        let sym1 = fft64(&derotated[start..start + NFFT]);
        let sym2 = fft64(&derotated[start + NFFT..start + 2 * NFFT]);

        let mut metric = 0.0;
        for bin in 0..NFFT {
            let reference = LTS_REFERENCE_SPECTRUM[bin];
            if reference.norm() > 0.0 {
                metric += (sym1[bin] * reference.conj()).re + (sym2[bin] * reference.conj()).re;
            }
        }
        if metric > best_metric {
            found = true;
            best_metric = metric;
            for bin in 0..NFFT {
                let reference = LTS_REFERENCE_SPECTRUM[bin];
                best_channel[bin] = if reference.norm() > 0.0 {
                    0.5 * (sym1[bin] + sym2[bin]) / reference
                } else {
                    Complex64::new(0.0, 0.0)
                };
            }
            let mut phase_acc = Complex64::new(0.0, 0.0);
            for bin in 0..NFFT {
                if LTS_REFERENCE_SPECTRUM[bin].norm() > 0.0 {
                    phase_acc += sym1[bin].conj() * sym2[bin];
                }
            }
            best_fine_cfo = phase_acc.arg() / NFFT as f64;
        }
    }
    if !found {
        return None;
    }

    let mut noise_acc = 0.0;
    let mut used_bins = 0usize;
    for offset in -LTS_SEARCH_RADIUS..=LTS_SEARCH_RADIUS {
        let start = (LTS_PREFIX_LEN as i32 + offset).max(0) as usize;
        if start + 2 * NFFT > derotated.len() {
            continue;
        }
        let sym1 = fft64(&derotated[start..start + NFFT]);
        let sym2 = fft64(&derotated[start + NFFT..start + 2 * NFFT]);
        for bin in 0..NFFT {
            if LTS_REFERENCE_SPECTRUM[bin].norm() > 0.0 {
                noise_acc += (sym1[bin] - sym2[bin]).norm_sqr();
                used_bins += 1;
            }
        }
        break; // only the best-fit offset's residual is representative.
    }
    let noise_var = (noise_acc / (2.0 * used_bins.max(1) as f64)).max(1e-6);

    // `var_x` is the reference LTS's own average power per active
    // subcarrier: its pattern is unit-magnitude, so this is 1.0, computed
    // from the table rather than assumed in case that ever changes.
    let var_x: f64 = {
        let (sum, count) = LTS_REFERENCE_SPECTRUM
            .iter()
            .filter(|r| r.norm() > 0.0)
            .fold((0.0, 0usize), |(sum, count), r| (sum + r.norm_sqr(), count + 1));
        sum / count.max(1) as f64
    };
    let uncertainty =
        (((2.0 * noise_var * var_x + noise_var * noise_var).sqrt()) / var_x).atan() / (NFFT as f64).sqrt();

    Some((best_channel, coarse_cfo + best_fine_cfo, noise_var, uncertainty))
}

/// FFTs one CP-stripped OFDM symbol, derotating for residual CFO and
/// equalizing by the per-bin channel estimate.
fn equalize_symbol(
    symbol_with_cp: &[Complex64],
    channel_est: &[Complex64; NFFT],
    cfo_per_sample: f64,
    sample_offset: usize,
) -> [Complex64; NFFT] {
    let time = &symbol_with_cp[NCP..];
    let derotated: Vec<Complex64> = time
        .iter()
        .enumerate()
        .map(|(n, &s)| {
            let global_n = (sample_offset + NCP + n) as f64;
            s * Complex64::from_polar(1.0, -cfo_per_sample * global_n)
        })
        .collect();
    let spectrum = fft64(&derotated);
    std::array::from_fn(|bin| {
        let h = channel_est[bin];
        if h.norm() > 1e-9 {
            spectrum[bin] / h
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

/// Measures the SIGNAL symbol's residual against the BPSK constellation
/// its decoded bits re-encode to: `Var(received - expected)` over the 48
/// DATA subcarriers, the noise-variance estimate carried into DATA-symbol
/// demapping and the frame's reported SNR.
fn signal_dispersion(equalized: &[Complex64; NFFT], signal_bits: &[u8; 24]) -> f64 {
    let coded = convcode::encode(signal_bits);
    let sq_err: f64 = DATA_CARRIERS
        .iter()
        .zip(coded.iter())
        .map(|(&carrier, &bit)| {
            let expected = qam::map_symbol(1, std::slice::from_ref(&bit));
            (equalized[bin_of(carrier)] - expected).norm_sqr()
        })
        .sum();
    (sq_err / DATA_CARRIERS.len() as f64).max(1e-9)
}

/// Demodulates a single BPSK-rate-1/2 OFDM symbol (used only for the
/// SIGNAL field, which is never interleaved or punctured).
fn demod_symbol(
    symbol_with_cp: &[Complex64],
    channel_est: &[Complex64; NFFT],
    cfo_per_sample: f64,
    sample_offset: usize,
    nbpsc: usize,
    noise_var: f64,
) -> Vec<i32> {
    let equalized = equalize_symbol(symbol_with_cp, channel_est, cfo_per_sample, sample_offset);
    let mut llrs = Vec::with_capacity(DATA_CARRIERS.len() * nbpsc);
    for &carrier in DATA_CARRIERS.iter() {
        llrs.extend(qam::soft_demap(equalized[bin_of(carrier)], nbpsc, noise_var));
    }
    llrs
}

/// Depunctures, Viterbi-decodes, descrambles and CRC-checks the
/// accumulated DATA-symbol LLRs, producing the final payload or the
/// reason the frame was discarded.
fn finish_data(rate: Rate, length_octets: u16, llrs: &[i32], dispersion: f64) -> FrameOutcome {
    const FCS_BITS: usize = 32;
    let info_len = SERVICE_BITS + 8 * length_octets as usize + FCS_BITS;
    let mother_bits_needed = 2 * (info_len + TAIL_BITS);
    let probe = vec![0u8; mother_bits_needed];
    let kept_count = rate.puncture_mask().puncture(&probe).len();
    let punctured = &llrs[..kept_count.min(llrs.len())];
    let depunctured = rate.puncture_mask().depuncture(punctured, mother_bits_needed);

    let decoded = convcode::decode(&depunctured);
    let descrambled = scrambler::scramble(&decoded[..info_len], scrambler::DATA_SEED);

    let payload_bits = &descrambled[SERVICE_BITS..SERVICE_BITS + 8 * length_octets as usize];
    let tail = &descrambled[SERVICE_BITS..];

    if !crc::validate(tail) {
        warn!(length_octets, "CRC mismatch, discarding frame");
        return FrameOutcome::Discarded(FrameError::BadCrc);
    }

    let bytes = bits_to_bytes_lsb_first(payload_bits);
    let snr_db = 10.0 * (1.0 / dispersion.max(1e-12)).log10();
    FrameOutcome::Payload { bytes, snr_db }
}
