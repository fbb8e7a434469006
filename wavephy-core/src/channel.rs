//! Channel descriptor and acoustic-channel impairment helpers.
//!
//! `ChannelDescriptor` is the (Fs, Fc, upsample_factor) triple threaded
//! through the transmitter and receiver front end. The noise helpers below
//! are not part of the PHY itself; they exist so tests (and the CLI's
//! loopback mode) can exercise the pipeline over a noisy channel the way
//! `§8`'s end-to-end scenarios require.

use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Baseband sample rate, carrier frequency and passband/baseband rate ratio
/// shared by the transmitter and receiver front end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Baseband sample rate (Hz), after decimation on receive / before
    /// upsampling on transmit.
    pub fs_hz: f64,
    /// Carrier (passband center) frequency, Hz.
    pub fc_hz: f64,
    /// Ratio of passband sample rate to baseband sample rate.
    pub upsample_factor: usize,
}

impl ChannelDescriptor {
    pub fn new(fs_hz: f64, fc_hz: f64, upsample_factor: usize) -> Self {
        Self { fs_hz, fc_hz, upsample_factor }
    }

    /// The passband (audio device) sample rate.
    pub fn passband_hz(&self) -> f64 {
        self.fs_hz * self.upsample_factor as f64
    }
}

impl Default for ChannelDescriptor {
    /// 32 kHz baseband, 3x upsample to a 96 kHz passband, 12 kHz carrier:
    /// the rates used by every end-to-end scenario in the specification.
    fn default() -> Self {
        Self { fs_hz: 32_000.0, fc_hz: 12_000.0, upsample_factor: 3 }
    }
}

/// Adds zero-mean Gaussian noise to real passband samples, in place of an
/// acoustic channel, at the standard deviation needed to reach
/// `snr_db` given the input's own average power.
pub fn awgn_for_snr_db<R: Rng>(samples: &[f32], snr_db: f64, rng: &mut R) -> Vec<f32> {
    let signal_power = samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>()
        / samples.len().max(1) as f64;
    let noise_power = signal_power / 10f64.powf(snr_db / 10.0);
    let noise_std = noise_power.sqrt();
    apply_audio_noise(samples, noise_std, rng)
}

/// Adds zero-mean Gaussian noise with standard deviation `noise_std` to
/// real passband samples.
pub fn apply_audio_noise<R: Rng>(audio: &[f32], noise_std: f64, rng: &mut R) -> Vec<f32> {
    audio
        .iter()
        .map(|&s| {
            let noise: f64 = rng.sample::<f64, _>(StandardNormal) * noise_std;
            s + noise as f32
        })
        .collect()
}

/// Adds independent complex Gaussian noise to baseband symbols, used by
/// unit tests that exercise the demapper/EKF directly without a full
/// transmit/receive round trip.
pub fn apply_symbol_noise<R: Rng>(
    symbols: &[Complex64],
    noise_std: f64,
    rng: &mut R,
) -> Vec<Complex64> {
    symbols
        .iter()
        .map(|&s| {
            let ni: f64 = rng.sample::<f64, _>(StandardNormal) * noise_std;
            let nq: f64 = rng.sample::<f64, _>(StandardNormal) * noise_std;
            s + Complex64::new(ni, nq)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn noise_is_deterministic_with_seed() {
        let audio = vec![0.1, 0.2, 0.3];
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        assert_eq!(
            apply_audio_noise(&audio, 0.01, &mut rng1),
            apply_audio_noise(&audio, 0.01, &mut rng2)
        );
    }

    #[test]
    fn higher_target_snr_yields_smaller_perturbation() {
        let tone: Vec<f32> = (0..1000).map(|n| (n as f32 * 0.1).sin()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let high_snr = awgn_for_snr_db(&tone, 40.0, &mut rng);
        let mut rng2 = StdRng::seed_from_u64(7);
        let low_snr = awgn_for_snr_db(&tone, 5.0, &mut rng2);

        let err = |noisy: &[f32]| -> f64 {
            tone.iter().zip(noisy).map(|(&a, &b)| ((a - b) as f64).powi(2)).sum()
        };
        assert!(err(&high_snr) < err(&low_snr));
    }

    #[test]
    fn passband_hz_scales_by_upsample_factor() {
        let ch = ChannelDescriptor::new(32_000.0, 12_000.0, 3);
        assert_eq!(ch.passband_hz(), 96_000.0);
    }
}
