//! Receiver front end: carrier downconversion, decimation, STS
//! autocorrelation and coarse preamble peak detection.

use crate::ofdm::NFFT;
use num_complex::Complex64;
use std::f64::consts::TAU;

/// Phase-continuous downconverter: multiplies real passband samples by
/// `exp(-j*2*pi*Fc/Fs*n)`, carrying the mixing phase across calls.
pub struct Downconverter {
    fc_over_fs: f64,
    phase: f64,
}

impl Downconverter {
    pub fn new(fc_hz: f64, fs_hz: f64) -> Self {
        Self { fc_over_fs: fc_hz / fs_hz, phase: 0.0 }
    }

    pub fn process(&mut self, samples: &[f32]) -> Vec<Complex64> {
        let out = samples
            .iter()
            .map(|&s| {
                let rotor = Complex64::from_polar(1.0, -self.phase);
                self.phase = (self.phase - TAU * self.fc_over_fs).rem_euclid(TAU);
                Complex64::new(s as f64, 0.0) * rotor
            })
            .collect();
        out
    }
}

/// A minimal two-pole IIR lowpass, standing in for the externally provided
/// filter-design primitive assumed available by this subsystem's I/O
/// contract.
#[derive(Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Designs a simple one-pole-pair lowpass at `cutoff` (normalized to
    /// Nyquist = 1.0).
    pub fn lowpass(cutoff: f64) -> Self {
        let wc = std::f64::consts::PI * cutoff.clamp(1e-4, 0.999);
        let k = wc.tan();
        let norm = 1.0 / (1.0 + std::f64::consts::SQRT_2 * k + k * k);
        Self {
            b0: k * k * norm,
            b1: 2.0 * k * k * norm,
            b2: k * k * norm,
            a1: 2.0 * (k * k - 1.0) * norm,
            a2: (1.0 - std::f64::consts::SQRT_2 * k + k * k) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn step(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x + self.z2 - self.a1 * y;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// Two independent `Biquad`s, one per rail, for filtering complex
/// baseband.
pub struct ComplexBiquad {
    re: Biquad,
    im: Biquad,
}

impl ComplexBiquad {
    pub fn lowpass(cutoff: f64) -> Self {
        Self { re: Biquad::lowpass(cutoff), im: Biquad::lowpass(cutoff) }
    }

    pub fn process(&mut self, samples: &[Complex64]) -> Vec<Complex64> {
        samples
            .iter()
            .map(|&s| Complex64::new(self.re.step(s.re), self.im.step(s.im)))
            .collect()
    }
}

/// Zero-insertion-free decimator that keeps its phase continuous across
/// buffer boundaries.
pub struct Decimator {
    factor: usize,
    phase: usize,
}

impl Decimator {
    pub fn new(factor: usize) -> Self {
        Self { factor: factor.max(1), phase: 0 }
    }

    pub fn process(&mut self, samples: &[Complex64]) -> Vec<Complex64> {
        let mut out = Vec::with_capacity(samples.len() / self.factor + 1);
        let mut i = self.phase;
        while i < samples.len() {
            out.push(samples[i]);
            i += self.factor;
        }
        self.phase = i - samples.len();
        out
    }
}

/// STS-period autocorrelation: one scalar per 16-sample block, formed from
/// the moving sum of `N_sts_reps` adjacent lag-16 correlations.
pub struct Autocorrelator {
    reps: usize,
    tail: Vec<Complex64>,
    lag_products: std::collections::VecDeque<Complex64>,
}

pub const STS_PERIOD: usize = NFFT / 4; // 16

impl Autocorrelator {
    pub fn new(reps: usize) -> Self {
        Self { reps, tail: Vec::new(), lag_products: std::collections::VecDeque::new() }
    }

    /// Feeds a new contiguous block of baseband samples; returns one
    /// energy scalar per completed 16-sample stride.
    pub fn process(&mut self, samples: &[Complex64]) -> Vec<f64> {
        let mut buf = std::mem::take(&mut self.tail);
        buf.extend_from_slice(samples);

        let mut out = Vec::new();
        let mut start = 0usize;
        while start + STS_PERIOD * 2 <= buf.len() {
            let window = &buf[start..start + STS_PERIOD * 2];
            let mut sum = Complex64::new(0.0, 0.0);
            for k in 0..STS_PERIOD {
                sum += window[k].conj() * window[k + STS_PERIOD];
            }
            self.lag_products.push_back(sum);
            if self.lag_products.len() > self.reps {
                self.lag_products.pop_front();
            }
            let energy: Complex64 = self.lag_products.iter().sum();
            out.push(energy.norm());
            start += STS_PERIOD;
        }

        self.tail = buf[start..].to_vec();
        out
    }
}

/// Windowed local-maximum peak detector, half-width `l`.
pub struct PeakDetector {
    half_width: usize,
    history: Vec<f64>,
    emitted_up_to: usize,
}

impl PeakDetector {
    pub fn new(half_width: usize) -> Self {
        Self { half_width, history: Vec::new(), emitted_up_to: 0 }
    }

    /// Feeds new autocorrelation-energy scalars and returns the indices
    /// (absolute, into the whole history) of any newly confirmed peaks.
    pub fn process(&mut self, values: &[f64]) -> Vec<usize> {
        self.history.extend_from_slice(values);
        let l = self.half_width;
        let mut peaks = Vec::new();
        // A candidate at index k needs l samples on both sides to confirm.
        let confirmable_end = self.history.len().saturating_sub(l);
        let mut k = self.emitted_up_to.max(l);
        while k < confirmable_end {
            let lo = k - l;
            let hi = (k + l).min(self.history.len() - 1);
            let window_max = self.history[lo..=hi].iter().cloned().fold(f64::MIN, f64::max);
            if self.history[k] == window_max {
                peaks.push(k);
            }
            k += 1;
        }
        self.emitted_up_to = confirmable_end.max(self.emitted_up_to);
        peaks
    }
}

/// Ties the downconverter, lowpass, decimator, autocorrelator and peak
/// detector into the full receiver front end.
pub struct ReceiverFrontEnd {
    downconvert: Downconverter,
    lowpass: ComplexBiquad,
    decimate: Decimator,
    autocorr: Autocorrelator,
    peaks: PeakDetector,
}

impl ReceiverFrontEnd {
    pub fn new(fc_hz: f64, fs_passband_hz: f64, upsample_factor: usize, sts_reps: usize) -> Self {
        Self {
            downconvert: Downconverter::new(fc_hz, fs_passband_hz),
            lowpass: ComplexBiquad::lowpass(0.45 / upsample_factor as f64),
            decimate: Decimator::new(upsample_factor),
            autocorr: Autocorrelator::new(sts_reps),
            peaks: PeakDetector::new(25),
        }
    }

    /// Processes one buffer of real passband samples, returning the
    /// decimated baseband and the candidate preamble block indices
    /// (in units of `STS_PERIOD` baseband samples) newly confirmed.
    pub fn process(&mut self, passband: &[f32]) -> (Vec<Complex64>, Vec<usize>) {
        let mixed = self.downconvert.process(passband);
        let filtered = self.lowpass.process(&mixed);
        let baseband = self.decimate.process(&filtered);
        let energy = self.autocorr.process(&baseband);
        let peaks = self.peaks.process(&energy);
        (baseband, peaks)
    }
}
