//! Property-based coverage of the algebraic laws named for the bit-level
//! building blocks: involutions, round-trips and bijections that must hold
//! for every input, not just a handful of fixed vectors.

use proptest::prelude::*;

use wavephy_core::bits::{convcode, interleave, puncture::HALF, qam, scrambler};

proptest! {
    /// `scramble(scramble(x, s), s) = x` for every seed in 1..=127.
    #[test]
    fn scrambler_is_an_involution(
        bits in prop::collection::vec(0u8..=1, 1..200),
        seed in 1u8..=127,
    ) {
        let once = scrambler::scramble(&bits, seed);
        let twice = scrambler::scramble(&once, seed);
        prop_assert_eq!(twice, bits);
    }

    /// `reverse(forward(x)) = x` for the 802.11a two-step interleaver, for
    /// every (Ncbps, Nbpsc) combination this PHY actually uses.
    #[test]
    fn interleaver_round_trips(
        nbpsc_idx in 0usize..4,
        seed in any::<u64>(),
    ) {
        let nbpsc = [1usize, 2, 4, 6][nbpsc_idx];
        let ncbps = 48 * nbpsc;
        let perm = interleave::forward_permutation(ncbps, nbpsc);
        let rev = interleave::reverse_permutation(ncbps, nbpsc);

        let mut bits = vec![0u8; ncbps];
        let mut state = seed;
        for b in bits.iter_mut() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *b = ((state >> 33) & 1) as u8;
        }

        let interleaved = interleave::apply(&bits, &perm);
        let back = interleave::apply(&interleaved, &rev);
        prop_assert_eq!(back, bits);
    }

    /// The half-rate puncture mask is the identity: every coded bit
    /// survives, so puncturing then depuncturing returns the input as-is.
    #[test]
    fn half_rate_puncture_round_trips(bits in prop::collection::vec(0u8..=1, 2..400)) {
        let kept = HALF.puncture(&bits);
        let restored = HALF.depuncture(&kept, bits.len());
        prop_assert_eq!(restored, bits);
    }

    /// The Viterbi decoder recovers any bit sequence from the hard-decision
    /// LLRs of its own rate-1/2 encoding.
    #[test]
    fn convolutional_code_round_trips_under_hard_decisions(
        bits in prop::collection::vec(0u8..=1, 1..64),
    ) {
        let mut padded = bits.clone();
        padded.extend(std::iter::repeat(0u8).take(6));
        let coded = convcode::encode(&padded);
        let llrs: Vec<i32> = coded.iter().map(|&b| if b == 1 { 1000 } else { -1000 }).collect();
        let decoded = convcode::decode(&llrs);
        prop_assert_eq!(&decoded[..bits.len()], &bits[..]);
    }

    /// At vanishing noise, the soft demapper assigns the highest-magnitude
    /// positive LLR to every bit of the symbol actually transmitted.
    #[test]
    fn demapper_favors_the_transmitted_symbol_for_every_constellation(
        nbpsc_idx in 0usize..4,
        symbol_idx in 0u32..64,
    ) {
        let nbpsc = [1usize, 2, 4, 6][nbpsc_idx];
        let k = symbol_idx % (1u32 << nbpsc);
        let bits: Vec<u8> = (0..nbpsc).rev().map(|i| ((k >> i) & 1) as u8).collect();

        let point = qam::map_symbol(nbpsc, &bits);
        let llrs = qam::soft_demap(point, nbpsc, 1e-6);
        for (i, &bit) in bits.iter().enumerate() {
            if bit == 1 {
                prop_assert!(llrs[i] > 0, "bit {i} of symbol {k} expected positive LLR, got {}", llrs[i]);
            } else {
                prop_assert!(llrs[i] < 0, "bit {i} of symbol {k} expected negative LLR, got {}", llrs[i]);
            }
        }
    }
}
