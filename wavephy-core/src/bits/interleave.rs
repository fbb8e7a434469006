//! IEEE 802.11a clause 17.3.5.6 two-step block interleaver.

/// Forward permutation for `Ncbps` coded bits per symbol and `Nbpsc` bits
/// per subcarrier: `perm[j]` is the source index feeding interleaved
/// position `j`.
pub fn forward_permutation(ncbps: usize, nbpsc: usize) -> Vec<usize> {
    let s = (nbpsc / 2).max(1);
    (0..ncbps)
        .map(|j| {
            let i = s * (j / s) + (j + (16 * j) / ncbps) % s;
            (16 * i) - (ncbps - 1) * ((16 * i) / ncbps)
        })
        .collect()
}

/// Inverse of [`forward_permutation`]: `perm[j]` is the destination index
/// that interleaved position `j` in the input maps to after deinterleaving.
pub fn reverse_permutation(ncbps: usize, nbpsc: usize) -> Vec<usize> {
    let fwd = forward_permutation(ncbps, nbpsc);
    let mut inv = vec![0usize; ncbps];
    for (j, &p) in fwd.iter().enumerate() {
        inv[p] = j;
    }
    inv
}

/// Applies `perm` so that `out[j] = data[perm[j]]`.
pub fn apply<T: Copy>(data: &[T], perm: &[usize]) -> Vec<T> {
    perm.iter().map(|&p| data[p]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_then_reverse_is_identity() {
        for nbpsc in [1usize, 2, 4, 6] {
            let ncbps = nbpsc * 48;
            let fwd = forward_permutation(ncbps, nbpsc);
            let rev = reverse_permutation(ncbps, nbpsc);

            let data: Vec<u32> = (0..ncbps as u32).collect();
            let interleaved = apply(&data, &fwd);
            let restored = apply(&interleaved, &rev);
            assert_eq!(restored, data, "nbpsc={nbpsc} round trip failed");
        }
    }

    #[test]
    fn permutation_is_a_bijection() {
        for nbpsc in [1usize, 2, 4, 6] {
            let ncbps = nbpsc * 48;
            let mut seen = vec![false; ncbps];
            for &p in &forward_permutation(ncbps, nbpsc) {
                assert!(!seen[p], "index {p} repeated for nbpsc={nbpsc}");
                seen[p] = true;
            }
        }
    }
}
