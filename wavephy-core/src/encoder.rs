//! Transmitter: turns payload octets into passband audio samples.
//!
//! The pipeline mirrors clause 17.3.5 end to end: SERVICE bits, FCS,
//! scrambling, convolutional coding, puncturing, interleaving, Gray
//! mapping, OFDM framing with STS/LTS preamble, then upsampling and
//! carrier modulation onto the acoustic channel.

use num_complex::Complex64;
use tracing::{debug, instrument};

use crate::bits::{
    bytes_to_bits_lsb_first, convcode, crc, interleave, qam,
    scrambler::{self, DATA_SEED},
};
use crate::channel::ChannelDescriptor;
use crate::errors::{PhyError, Result as PhyResult, TransmitError};
use crate::ofdm::{self, modulate_symbol, pilot_symbols, place_subcarriers, NFFT, PILOT_CARRIERS};
use crate::protocol::{rate_by_code, Rate, SignalWord, NDATA, SERVICE_BITS, TAIL_BITS};

/// Silence between frames, matching the receiver's inter-frame gap
/// assumption.
const INTER_FRAME_GAP_SECS: f64 = 0.05;
/// Stereo channel stagger: one rail leads the other by this much so a
/// two-microphone capture can disambiguate left/right arrival order.
const STEREO_DELAY_SECS: f64 = 0.005;

/// Builds passband audio frames for an acoustic 802.11a-style PHY.
pub struct Transmitter {
    channel: ChannelDescriptor,
    carrier_phase: f64,
}

impl Transmitter {
    pub fn new(channel: ChannelDescriptor) -> Self {
        Self { channel, carrier_phase: 0.0 }
    }

    /// Encodes `payload` at `rate_code` into one complete PLCP frame
    /// (preamble + SIGNAL + DATA) of baseband complex samples, without any
    /// upsampling or carrier modulation. Exposed for tests and for callers
    /// that want to compose their own passband pipeline.
    #[instrument(skip(self, payload))]
    pub fn baseband_frame(&self, payload: &[u8], rate_code: u8) -> PhyResult<Vec<Complex64>> {
        let rate = rate_by_code(rate_code)
            .ok_or(PhyError::Transmit(TransmitError::InvalidRateCode(rate_code)))?;
        if payload.len() > u16::MAX as usize {
            return Err(PhyError::Transmit(TransmitError::PayloadTooLong {
                length: payload.len(),
                max: u16::MAX as usize,
            }));
        }

        let signal = SignalWord { rate_code, length_octets: payload.len() as u16 };
        let signal_symbol = self.modulate_signal_symbol(&signal);

        let data_symbols = self.modulate_data_symbols(payload, &rate);

        let sts = ofdm::generate_sts();
        let lts = ofdm::generate_lts();
        let mut segments = vec![sts, lts, signal_symbol];
        segments.extend(data_symbols);

        debug!(octets = payload.len(), rate_code, symbols = segments.len() - 2, "built frame");
        Ok(ofdm::overlap_add_concat(&segments))
    }

    fn modulate_signal_symbol(&self, signal: &SignalWord) -> Vec<Complex64> {
        let bits = signal.to_bits();
        let coded = convcode::encode(&bits);
        let pilots = pilot_symbols(0);
        let data: Vec<Complex64> = coded
            .chunks(1)
            .map(|chunk| qam::map_symbol(1, chunk))
            .collect();
        // The SIGNAL field is always BPSK rate-1/2: 24 info bits code to 48
        // bits, exactly filling the 48 data subcarriers of one symbol.
        let spectrum = place_subcarriers(&data, pilots);
        modulate_symbol(&spectrum)
    }

    /// Assembles SERVICE + payload + FCS + tail, scrambles, encodes,
    /// punctures, interleaves and Gray-maps into one OFDM symbol per
    /// `rate.ncbps()` coded bits, tracking the pilot-polarity ordinal
    /// across symbols the same way the receiver's EKF expects.
    fn modulate_data_symbols(&self, payload: &[u8], rate: &Rate) -> Vec<Vec<Complex64>> {
        let mut info_bits = vec![0u8; SERVICE_BITS];
        info_bits.extend(bytes_to_bits_lsb_first(payload));
        info_bits.extend(crc_bits_for(payload));

        let scrambled_info = scrambler::scramble(&info_bits, DATA_SEED);
        let mut bits_to_encode = scrambled_info;
        bits_to_encode.extend(std::iter::repeat(0u8).take(TAIL_BITS));

        let coded = convcode::encode(&bits_to_encode);
        let punctured = rate.puncture_mask().puncture(&coded);

        let ncbps = rate.ncbps();
        let perm = interleave::forward_permutation(ncbps, rate.nbpsc);

        let mut symbols = Vec::new();
        let mut symbol_ordinal = 1usize; // symbol 0 was the SIGNAL field.
        for chunk in pad_to_multiple(&punctured, ncbps).chunks(ncbps) {
            let interleaved = interleave::apply(chunk, &perm);
            let data: Vec<Complex64> = interleaved
                .chunks(rate.nbpsc)
                .map(|bits| qam::map_symbol(rate.nbpsc, bits))
                .collect();
            let pilots = pilot_symbols(symbol_ordinal);
            let spectrum = place_subcarriers(&data, pilots);
            symbols.push(modulate_symbol(&spectrum));
            symbol_ordinal += 1;
        }
        symbols
    }

    /// Upsamples a baseband frame to the passband rate and mixes it onto
    /// the carrier, returning real passband samples at
    /// `channel.passband_hz()`.
    pub fn to_passband(&mut self, baseband: &[Complex64]) -> Vec<f32> {
        let upsampled = upsample_zero_stuff(baseband, self.channel.upsample_factor);

        // Cutoff just past the occupied band's edge (data + pilot
        // subcarriers), normalized to the upsampled Nyquist rate, applied
        // as two identical cascaded stages.
        let nsc_used = (NDATA + PILOT_CARRIERS.len()) as f64;
        let cutoff = (nsc_used / 2.0 + 0.5) / NFFT as f64 / self.channel.upsample_factor as f64;
        let mut stage1 = crate::frontend::ComplexBiquad::lowpass(cutoff);
        let mut stage2 = crate::frontend::ComplexBiquad::lowpass(cutoff);
        let filtered = stage2.process(&stage1.process(&upsampled));

        let fc_over_fs = self.channel.fc_hz / self.channel.passband_hz();
        let upsample_factor = self.channel.upsample_factor as f64;
        let mut out = Vec::with_capacity(filtered.len());
        for sample in filtered {
            let rotor = Complex64::from_polar(1.0, self.carrier_phase);
            self.carrier_phase = (self.carrier_phase
                + std::f64::consts::TAU * fc_over_fs)
                .rem_euclid(std::f64::consts::TAU);
            out.push(((sample * rotor).re * upsample_factor.sqrt()) as f32);
        }
        out
    }

    /// Encodes `payload` into a complete stereo passband clip: a mono frame
    /// is built and staggered across two rails by [`STEREO_DELAY_SECS`],
    /// followed by [`INTER_FRAME_GAP_SECS`] of silence on both rails.
    /// Returns interleaved `(left, right)` sample pairs.
    pub fn encode_stereo_clip(&mut self, payload: &[u8], rate_code: u8) -> PhyResult<Vec<(f32, f32)>> {
        let baseband = self.baseband_frame(payload, rate_code)?;
        let mono = self.to_passband(&baseband);

        let delay_samples = (STEREO_DELAY_SECS * self.channel.passband_hz()).round() as usize;
        let gap_samples = (INTER_FRAME_GAP_SECS * self.channel.passband_hz()).round() as usize;

        let total_len = delay_samples + mono.len() + gap_samples;
        let mut left = vec![0f32; total_len];
        let mut right = vec![0f32; total_len];

        left[delay_samples..delay_samples + mono.len()].copy_from_slice(&mono);
        right[..mono.len()].copy_from_slice(&mono);

        Ok(left.into_iter().zip(right).collect())
    }
}

fn crc_bits_for(payload: &[u8]) -> [u8; 32] {
    let bits = bytes_to_bits_lsb_first(payload);
    let fcs = crc::crc32_bits(&bits);
    crc::crc_to_bits_msb_first(fcs)
}

fn pad_to_multiple(bits: &[u8], multiple: usize) -> Vec<u8> {
    let mut out = bits.to_vec();
    let remainder = out.len() % multiple;
    if remainder != 0 {
        out.extend(std::iter::repeat(0u8).take(multiple - remainder));
    }
    out
}

/// Inserts `factor - 1` zeros between samples; the subsequent lowpass
/// reconstructs the interpolated waveform.
fn upsample_zero_stuff(samples: &[Complex64], factor: usize) -> Vec<Complex64> {
    let mut out = Vec::with_capacity(samples.len() * factor);
    for &s in samples {
        out.push(s);
        out.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(factor - 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseband_frame_has_preamble_plus_data() {
        let tx = Transmitter::new(ChannelDescriptor::default());
        let frame = tx.baseband_frame(b"hello", 0xb).unwrap();
        // STS (160) + LTS (160) + SIGNAL (80) + at least one DATA symbol (80),
        // joined with one-sample overlaps.
        assert!(frame.len() >= 160 + 160 + 80 + 80 - 3);
    }

    #[test]
    fn rejects_unknown_rate() {
        let tx = Transmitter::new(ChannelDescriptor::default());
        assert!(tx.baseband_frame(b"x", 0x3).is_err());
    }

    #[test]
    fn stereo_clip_staggers_channels() {
        let mut tx = Transmitter::new(ChannelDescriptor::default());
        let stereo = tx.encode_stereo_clip(b"hi", 0xb).unwrap();
        assert!(!stereo.is_empty());
        // The very first samples are silence on the right channel while the
        // left channel is still in its delay pad.
        assert_eq!(stereo[0].1, 0.0);
    }
}
