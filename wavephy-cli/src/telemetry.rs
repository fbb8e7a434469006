//! Aggregates per-frame outcomes across a decode session into a summary
//! printed once the input is exhausted.

use wavephy_core::FrameOutcome;

#[derive(Debug, Default)]
pub struct TelemetryAggregator {
    payloads: usize,
    discarded_no_preamble: usize,
    discarded_bad_signal: usize,
    discarded_bad_crc: usize,
    discarded_length: usize,
    snr_db_samples: Vec<f64>,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Payload { snr_db, .. } => {
                self.payloads += 1;
                self.snr_db_samples.push(*snr_db);
            }
            FrameOutcome::Discarded(err) => match err {
                wavephy_core::errors::FrameError::NoPreamble => self.discarded_no_preamble += 1,
                wavephy_core::errors::FrameError::BadSignal => self.discarded_bad_signal += 1,
                wavephy_core::errors::FrameError::BadCrc => self.discarded_bad_crc += 1,
                wavephy_core::errors::FrameError::LengthExceedsMtu(_) => {
                    self.discarded_length += 1
                }
            },
        }
    }

    pub fn total_frames(&self) -> usize {
        self.payloads
            + self.discarded_no_preamble
            + self.discarded_bad_signal
            + self.discarded_bad_crc
            + self.discarded_length
    }

    pub fn mean_snr_db(&self) -> Option<f64> {
        if self.snr_db_samples.is_empty() {
            return None;
        }
        Some(self.snr_db_samples.iter().sum::<f64>() / self.snr_db_samples.len() as f64)
    }

    pub fn summary(&self) -> String {
        let mean_snr = self
            .mean_snr_db()
            .map(|s| format!("{s:.1} dB"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{} payload(s) decoded, {} discarded (signal: {}, crc: {}, length: {}), mean SNR {mean_snr}",
            self.payloads,
            self.discarded_no_preamble
                + self.discarded_bad_signal
                + self.discarded_bad_crc
                + self.discarded_length,
            self.discarded_bad_signal,
            self.discarded_bad_crc,
            self.discarded_length,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavephy_core::errors::FrameError;

    #[test]
    fn aggregates_payloads_and_discards() {
        let mut agg = TelemetryAggregator::new();
        agg.record(&FrameOutcome::Payload { bytes: vec![1, 2, 3], snr_db: 20.0 });
        agg.record(&FrameOutcome::Payload { bytes: vec![4], snr_db: 30.0 });
        agg.record(&FrameOutcome::Discarded(FrameError::BadCrc));

        assert_eq!(agg.total_frames(), 3);
        assert_eq!(agg.mean_snr_db(), Some(25.0));
    }
}
