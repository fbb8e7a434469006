//! Puncturing matrices for the four coding rates derived from the rate-1/2
//! mother code.

/// A puncturing pattern tiled over the coded bit stream. `true` marks a bit
/// that survives puncturing.
#[derive(Debug, Clone, Copy)]
pub struct PunctureMask {
    pattern: &'static [bool],
}

impl PunctureMask {
    pub const fn new(pattern: &'static [bool]) -> Self {
        Self { pattern }
    }

    /// Keeps bits from `coded` where the tiled mask is `true`.
    pub fn puncture(&self, coded: &[u8]) -> Vec<u8> {
        coded
            .iter()
            .enumerate()
            .filter(|(i, _)| self.pattern[i % self.pattern.len()])
            .map(|(_, &b)| b)
            .collect()
    }

    /// Expands a punctured LLR stream back to mother-code length, inserting
    /// zero-LLR erasures at punctured positions.
    pub fn depuncture(&self, punctured: &[i32], mother_len: usize) -> Vec<i32> {
        let mut out = Vec::with_capacity(mother_len);
        let mut src = punctured.iter();
        for i in 0..mother_len {
            if self.pattern[i % self.pattern.len()] {
                out.push(*src.next().unwrap_or(&0));
            } else {
                out.push(0);
            }
        }
        out
    }
}

/// Rate 1/2: no puncturing.
pub static HALF: PunctureMask = PunctureMask::new(&[true, true]);
/// Rate 2/3: drop every fourth mother-code bit.
pub static TWO_THIRDS: PunctureMask = PunctureMask::new(&[true, true, true, false]);
/// Rate 3/4: keep 4 of every 6 mother-code bits.
pub static THREE_QUARTERS: PunctureMask =
    PunctureMask::new(&[true, true, true, false, false, true]);
/// Rate 5/6: keep 6 of every 10 mother-code bits.
pub static FIVE_SIXTHS: PunctureMask = PunctureMask::new(&[
    true, true, true, false, false, true, true, false, false, true,
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puncture_depuncture_preserves_survivors() {
        for mask in [&HALF, &TWO_THIRDS, &THREE_QUARTERS, &FIVE_SIXTHS] {
            let coded: Vec<u8> = (0..120).map(|i| (i % 3 == 0) as u8).collect();
            let punctured = mask.puncture(&coded);
            let llrs: Vec<i32> = punctured
                .iter()
                .map(|&b| if b == 1 { 5000 } else { -5000 })
                .collect();
            let depunctured = mask.depuncture(&llrs, coded.len());
            for (i, &kept) in coded.iter().enumerate() {
                if mask.pattern[i % mask.pattern.len()] {
                    let expect = if kept == 1 { 5000 } else { -5000 };
                    assert_eq!(depunctured[i], expect);
                } else {
                    assert_eq!(depunctured[i], 0);
                }
            }
        }
    }
}
