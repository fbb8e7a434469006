//! Bit-level utilities: scrambler, convolutional code, puncturing,
//! interleaver, CRC-32/FCS and the QAM mapper/demapper.
//!
//! Every table in this module (scrambler sequences, trellis transitions,
//! interleaver permutations, constellations) is pure and stateless; the
//! only mutable state in the whole FEC chain lives in the per-frame
//! decoder's EKF pilot tracker.

pub mod convcode;
pub mod crc;
pub mod interleave;
pub mod puncture;
pub mod qam;
pub mod scrambler;

/// Packs LSB-first bits into octets, LSB-first within each octet, as used
/// for both the SERVICE/payload assembly on transmit and payload recovery
/// on receive.
pub fn bits_to_bytes_lsb_first(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &b)| acc | ((b & 1) << i))
        })
        .collect()
}

/// Unpacks octets into LSB-first bits.
pub fn bytes_to_bits_lsb_first(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).map(move |i| (byte >> i) & 1))
        .collect()
}
