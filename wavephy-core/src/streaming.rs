//! Streaming receiver: the front end plus a pool of concurrent per-frame
//! decoders, driven chunk by chunk as audio arrives.
//!
//! A confirmed preamble peak spawns a new [`FrameDecoder`]; it is fed
//! every baseband sample from its own start forward, independent of
//! whatever other frames are in flight, so a slow-converging frame never
//! blocks one behind it. Samples older than the oldest in-flight
//! decoder's start are dropped from the lookback buffer.

use num_complex::Complex64;
use tracing::{debug, info};

use crate::config::PhyConfig;
use crate::frame_decoder::{FrameDecoder, FrameOutcome};
use crate::frontend::ReceiverFrontEnd;

/// Samples of baseband retained behind the current write position so a
/// freshly confirmed peak can be backfilled with the preamble samples
/// the peak detector's confirmation window consumed before reporting it.
const LOOKBACK_SAMPLES: usize = 1024;

struct InFlightFrame {
    /// Baseband-sample index (since stream start) this frame's STS began
    /// at.
    start_index: usize,
    decoder: FrameDecoder,
}

/// Consumes passband audio chunk by chunk and emits decoded payloads (or
/// discarded-frame diagnostics) as they complete.
pub struct StreamingReceiver {
    config: PhyConfig,
    front_end: ReceiverFrontEnd,
    lookback: std::collections::VecDeque<Complex64>,
    /// Baseband-sample index of `lookback`'s first entry.
    lookback_origin: usize,
    /// Total baseband samples produced so far.
    samples_seen: usize,
    in_flight: Vec<InFlightFrame>,
}

/// One terminal event surfaced by [`StreamingReceiver::process`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    pub start_index: usize,
    pub outcome: FrameOutcome,
}

impl StreamingReceiver {
    pub fn new(config: PhyConfig) -> Self {
        let front_end = ReceiverFrontEnd::new(
            config.channel.fc_hz,
            config.channel.passband_hz(),
            config.channel.upsample_factor,
            config.sts_reps,
        );
        Self {
            config,
            front_end,
            lookback: std::collections::VecDeque::new(),
            lookback_origin: 0,
            samples_seen: 0,
            in_flight: Vec::new(),
        }
    }

    /// Feeds one buffer of real passband samples. Returns every frame
    /// that reached a terminal outcome (payload or discard) during this
    /// call.
    pub fn process(&mut self, passband: &[f32]) -> Vec<ReceivedFrame> {
        let (baseband, peak_offsets) = self.front_end.process(passband);

        // `peak_offsets` are absolute indices into the autocorrelator's
        // running energy history, one entry per `STS_PERIOD` baseband
        // samples since the stream began, so they convert to an absolute
        // baseband-sample start index without reference to this call's
        // own position in the stream. Backfill from the lookback buffer
        // as it stood *before* this call's baseband is appended below, so
        // the unconditional feed of `baseband` that follows never
        // duplicates a sample already delivered here.
        for &offset in &peak_offsets {
            // The confirmed block is one `STS_PERIOD` into the first STS
            // repeat, not its start; the extra 16 samples land the frame
            // at the STS's actual first sample.
            let start_index = offset * crate::frontend::STS_PERIOD + 16;
            if self.in_flight.iter().any(|f| f.start_index == start_index) {
                continue;
            }
            debug!(start_index, "new candidate frame");
            let mut decoder = FrameDecoder::new(self.config.mtu_octets);
            if let Some(backfill) = self.backfill_from(start_index) {
                decoder.feed(&backfill);
            }
            self.in_flight.push(InFlightFrame { start_index, decoder });
        }

        for &sample in &baseband {
            self.lookback.push_back(sample);
        }
        self.samples_seen += baseband.len();
        while self.lookback.len() > LOOKBACK_SAMPLES {
            self.lookback.pop_front();
            self.lookback_origin += 1;
        }

        // Feed every in-flight decoder the newly arrived baseband samples
        // it hasn't seen yet, then poll for completion.
        let mut results = Vec::new();
        let mut finished = Vec::new();
        for (idx, frame) in self.in_flight.iter_mut().enumerate() {
            frame.decoder.feed(&baseband);
            if let Some(outcome) = frame.decoder.poll() {
                info!(start_index = frame.start_index, ?outcome, "frame complete");
                results.push(ReceivedFrame { start_index: frame.start_index, outcome });
                finished.push(idx);
            }
        }
        for idx in finished.into_iter().rev() {
            self.in_flight.remove(idx);
        }

        results
    }

    /// Pulls the samples still held in the lookback buffer from
    /// `start_index` forward, for backfilling a decoder spawned on a
    /// peak whose preamble samples already scrolled out of the live
    /// buffer passed to `process`.
    fn backfill_from(&self, start_index: usize) -> Option<Vec<Complex64>> {
        if start_index < self.lookback_origin {
            return None;
        }
        let offset = start_index - self.lookback_origin;
        if offset >= self.lookback.len() {
            return None;
        }
        Some(self.lookback.iter().skip(offset).copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Transmitter;

    #[test]
    fn decodes_a_frame_fed_as_passband_chunks() {
        let config = PhyConfig::default();
        let mut tx = Transmitter::new(config.channel);
        let payload = b"stream me";
        let stereo = tx.encode_stereo_clip(payload, config.rate_code).unwrap();
        let mono: Vec<f32> = stereo.iter().map(|&(l, _r)| l).collect();

        let mut rx = StreamingReceiver::new(config);
        let mut outcomes = Vec::new();
        for chunk in mono.chunks(512) {
            outcomes.extend(rx.process(chunk));
        }
        assert!(
            outcomes.iter().any(|f| matches!(&f.outcome, FrameOutcome::Payload { bytes, .. } if bytes == payload)),
            "expected a decoded payload among {outcomes:?}"
        );
    }

    #[test]
    fn silence_produces_no_frames() {
        let mut rx = StreamingReceiver::new(PhyConfig::default());
        let silence = vec![0f32; 4096];
        assert!(rx.process(&silence).is_empty());
    }
}
