//! Extended Kalman filter tracking the pilot aggregate's amplitude and
//! phase across DATA symbols.
//!
//! State `x = [Re, Im, theta]` tracks the complex sum of the four pilot
//! subcarriers after derotation, plus a residual carrier-phase drift
//! `theta` accumulated per symbol. The 3x3/2x2 linear algebra is small
//! enough to hand-roll; a general matrix crate would only add allocation
//! overhead on the per-symbol hot path.

use num_complex::Complex64;

#[derive(Debug, Clone, Copy)]
pub struct PilotTrackerConfig {
    /// Number of pilot subcarriers summed into the observation (always 4
    /// for 802.11a "L" mode).
    pub num_pilots: f64,
    /// Per-subcarrier noise variance estimated during training.
    pub var_ni: f64,
    /// Residual phase-noise uncertainty (radians), estimated during
    /// training.
    pub uncertainty: f64,
}

/// A 3x3 symmetric-by-construction covariance, stored densely for clarity.
#[derive(Debug, Clone, Copy)]
struct Mat3(pub [[f64; 3]; 3]);

impl Mat3 {
    fn diag(d0: f64, d1: f64, d2: f64) -> Self {
        Mat3([[d0, 0.0, 0.0], [0.0, d1, 0.0], [0.0, 0.0, d2]])
    }

    fn scale(&self, k: f64) -> Self {
        let mut m = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                m[r][c] = self.0[r][c] * k;
            }
        }
        Mat3(m)
    }

    fn mul(&self, rhs: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                let mut acc = 0.0;
                for k in 0..3 {
                    acc += self.0[r][k] * rhs.0[k][c];
                }
                out[r][c] = acc;
            }
        }
        Mat3(out)
    }

    fn transpose(&self) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                out[r][c] = self.0[c][r];
            }
        }
        Mat3(out)
    }

    fn add(&self, rhs: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                out[r][c] = self.0[r][c] + rhs.0[r][c];
            }
        }
        Mat3(out)
    }
}

/// EKF state tracking the derotated pilot-aggregate amplitude and a
/// residual carrier-phase term.
pub struct PilotTracker {
    x: [f64; 3], // [Re, Im, theta]
    p: Mat3,
    q: Mat3,
    r_diag: f64, // R = diag(r_diag, r_diag)
}

impl PilotTracker {
    pub fn new(cfg: PilotTrackerConfig) -> Self {
        let sigma = cfg.num_pilots * cfg.var_ni / 2.0
            + cfg.num_pilots * cfg.uncertainty.sin().powi(2);
        let p0 = Mat3::diag(sigma, sigma, cfg.uncertainty * cfg.uncertainty);
        Self {
            x: [cfg.num_pilots, 0.0, 0.0],
            p: p0,
            q: p0.scale(0.1),
            r_diag: cfg.num_pilots * cfg.var_ni / 2.0,
        }
    }

    /// Advances the filter by one OFDM symbol given the raw (un-derotated)
    /// sum of the four signed pilot subcarriers `z`, and returns the unit
    /// derotation vector `u/|u|` (as `Re - j*Im`) to apply to that
    /// symbol's data subcarriers.
    pub fn update(&mut self, z: Complex64) -> Complex64 {
        let (re, im, theta) = (self.x[0], self.x[1], self.x[2]);
        let (c, s) = (theta.cos(), theta.sin());

        // Predict: rotate (Re, Im) by theta; theta itself is a random walk.
        let pred = [c * re - s * im, c * im + s * re, theta];

        // Jacobian of the transition around the current state.
        let f = Mat3([
            [c, -s, -s * re - c * im],
            [s, c, c * re - s * im],
            [0.0, 0.0, 1.0],
        ]);

        let p_pred = f.mul(&self.p).mul(&f.transpose()).add(&self.q);

        // Measurement: H = [[1,0,0],[0,1,0]], R = diag(r_diag, r_diag).
        let innovation = [z.re - pred[0], z.im - pred[1]];

        let s00 = p_pred.0[0][0] + self.r_diag;
        let s01 = p_pred.0[0][1];
        let s10 = p_pred.0[1][0];
        let s11 = p_pred.0[1][1] + self.r_diag;
        let det = s00 * s11 - s01 * s10;
        let det = if det.abs() < 1e-18 { 1e-18 } else { det };
        let inv = [[s11 / det, -s01 / det], [-s10 / det, s00 / det]];

        // Kalman gain K = P_pred * H^T * S^-1, restricted to H's two rows.
        let mut k = [[0.0; 2]; 3];
        for r in 0..3 {
            for c_ in 0..2 {
                k[r][c_] = p_pred.0[r][0] * inv[0][c_] + p_pred.0[r][1] * inv[1][c_];
            }
        }

        let mut updated = pred;
        for r in 0..3 {
            updated[r] += k[r][0] * innovation[0] + k[r][1] * innovation[1];
        }

        // P = (I - K H) P_pred, with H = [[1,0,0],[0,1,0]].
        let ikh = Mat3([
            [1.0 - k[0][0], -k[0][1], 0.0],
            [-k[1][0], 1.0 - k[1][1], 0.0],
            [-k[2][0], -k[2][1], 1.0],
        ]);
        let p_new = ikh.mul(&p_pred);

        self.x = updated;
        self.p = p_new;

        let u = Complex64::new(updated[0], updated[1]);
        let norm = u.norm().max(1e-12);
        Complex64::new(u.re / norm, -u.im / norm)
    }

    /// Current covariance's diagonal, exposed for invariant testing
    /// (positive semi-definiteness).
    pub fn covariance_diag(&self) -> [f64; 3] {
        [self.p.0[0][0], self.p.0[1][1], self.p.0[2][2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tracks_a_steady_pilot_aggregate() {
        let cfg = PilotTrackerConfig { num_pilots: 4.0, var_ni: 0.01, uncertainty: 0.05 };
        let mut tracker = PilotTracker::new(cfg);
        for _ in 0..20 {
            let u = tracker.update(Complex64::new(4.0, 0.0));
            assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-6);
        }
        let diag = tracker.covariance_diag();
        assert!(diag.iter().all(|&d| d >= -1e-9));
    }

    #[test]
    fn covariance_remains_psd_under_rotating_pilot() {
        let cfg = PilotTrackerConfig { num_pilots: 4.0, var_ni: 0.02, uncertainty: 0.1 };
        let mut tracker = PilotTracker::new(cfg);
        for n in 0..50 {
            let phase = 0.01 * n as f64;
            let z = Complex64::from_polar(4.0, phase);
            tracker.update(z);
            let diag = tracker.covariance_diag();
            assert!(diag.iter().all(|&d| d >= -1e-6), "negative variance at step {n}: {diag:?}");
        }
    }
}
