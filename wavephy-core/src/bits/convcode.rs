//! Rate-1/2, constraint-length-7 convolutional code (generators 133/171 octal)
//! and its soft-decision Viterbi decoder.

const G1: u8 = 0o133;
const G2: u8 = 0o171;
const NUM_STATES: usize = 64;

fn parity(x: u8) -> u8 {
    x.count_ones() as u8 & 1
}

/// Encodes `bits` into `2 * bits.len()` coded bits. The encoder starts in the
/// all-zero state; callers are responsible for appending tail bits so the
/// trellis terminates back at state 0.
pub fn encode(bits: &[u8]) -> Vec<u8> {
    let mut shreg: u8 = 0;
    let mut out = Vec::with_capacity(bits.len() * 2);
    for &b in bits {
        let b = b & 1;
        let reg = (b << 6) | shreg;
        out.push(parity(reg & G1));
        out.push(parity(reg & G2));
        shreg = (shreg >> 1) | (b << 5);
    }
    out
}

struct Transition {
    next_state: u8,
    out_a: u8,
    out_b: u8,
}

/// `TRELLIS[state][input_bit]` gives the transition taken from `state`.
fn trellis() -> [[Transition; 2]; NUM_STATES] {
    std::array::from_fn(|state| {
        std::array::from_fn(|input| {
            let b = input as u8;
            let reg = (b << 6) | (state as u8);
            Transition {
                next_state: (state as u8 >> 1) | (b << 5),
                out_a: parity(reg & G1),
                out_b: parity(reg & G2),
            }
        })
    })
}

/// Soft-decision Viterbi decoder. `llrs` holds `2 * n` scaled, saturating
/// log-likelihood ratios (see `bits::qam`); positive means the coded bit is
/// more likely a 1. Returns the `n` most likely information bits, assuming
/// the trellis was terminated to state 0 (tail-biting by zero tail bits).
pub fn decode(llrs: &[i32]) -> Vec<u8> {
    assert!(llrs.len() % 2 == 0, "LLR stream must have even length");
    let n = llrs.len() / 2;
    if n == 0 {
        return Vec::new();
    }
    let trellis = trellis();

    const INF: i64 = i64::MAX / 4;
    let mut metrics = [INF; NUM_STATES];
    metrics[0] = 0;
    // predecessor[step][state] = (prev_state, input_bit)
    let mut predecessor: Vec<[(u8, u8); NUM_STATES]> = Vec::with_capacity(n);

    for step in 0..n {
        let la = llrs[2 * step] as i64;
        let lb = llrs[2 * step + 1] as i64;
        let mut next_metrics = [INF; NUM_STATES];
        let mut back = [(0u8, 0u8); NUM_STATES];

        for state in 0..NUM_STATES {
            if metrics[state] >= INF {
                continue;
            }
            for input in 0..2u8 {
                let t = &trellis[state][input as usize];
                let branch = branch_metric(la, t.out_a) + branch_metric(lb, t.out_b);
                let candidate = metrics[state] + branch;
                let ns = t.next_state as usize;
                if candidate < next_metrics[ns]
                    || (candidate == next_metrics[ns] && (state as u8) < back[ns].0)
                {
                    next_metrics[ns] = candidate;
                    back[ns] = (state as u8, input);
                }
            }
        }

        let min = next_metrics.iter().copied().filter(|&m| m < INF).min().unwrap_or(0);
        for m in next_metrics.iter_mut() {
            if *m < INF {
                *m -= min;
            }
        }

        metrics = next_metrics;
        predecessor.push(back);
    }

    // Tail bits force termination to state 0; trace back from there.
    let mut state = 0u8;
    let mut bits = vec![0u8; n];
    for step in (0..n).rev() {
        let (prev, input) = predecessor[step][state as usize];
        bits[step] = input;
        state = prev;
    }
    bits
}

/// Distance between a scaled LLR and a hypothesized hard bit: smaller is a
/// better match. `llr > 0` favors bit = 1.
fn branch_metric(llr: i64, bit: u8) -> i64 {
    if bit == 1 {
        -llr
    } else {
        llr
    }
}
