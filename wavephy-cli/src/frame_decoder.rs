//! Formats [`wavephy_core::ReceivedFrame`] events for terminal output: one
//! line per frame, with a hex/ASCII preview of decoded payloads.

use wavephy_core::errors::FrameError;
use wavephy_core::frame_decoder::FrameOutcome;
use wavephy_core::ReceivedFrame;

/// Longest payload prefix shown in the hex/ASCII preview before truncating.
const PREVIEW_OCTETS: usize = 32;

/// Renders one decoded or discarded frame as a single report line.
pub fn report_line(frame: &ReceivedFrame) -> String {
    match &frame.outcome {
        FrameOutcome::Payload { bytes, snr_db } => format!(
            "[{:>8}] PAYLOAD  {} octets  snr={:.1}dB  {}",
            frame.start_index,
            bytes.len(),
            snr_db,
            preview(bytes)
        ),
        FrameOutcome::Discarded(err) => {
            format!("[{:>8}] DISCARD  {}", frame.start_index, discard_reason(err))
        }
    }
}

fn discard_reason(err: &FrameError) -> &'static str {
    match err {
        FrameError::NoPreamble => "no preamble",
        FrameError::BadSignal => "bad SIGNAL field",
        FrameError::BadCrc => "CRC mismatch",
        FrameError::LengthExceedsMtu(_) => "length exceeds MTU",
    }
}

/// A `hexdump -C`-style single-line preview: hex octets followed by an
/// ASCII rendering with non-printable bytes shown as `.`.
fn preview(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(PREVIEW_OCTETS)];
    let hex: Vec<String> = shown.iter().map(|b| format!("{b:02x}")).collect();
    let ascii: String = shown
        .iter()
        .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
        .collect();
    let ellipsis = if bytes.len() > PREVIEW_OCTETS { "..." } else { "" };
    format!("{}{ellipsis}  |{ascii}{ellipsis}|", hex.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_a_payload_line_with_preview() {
        let frame = ReceivedFrame {
            start_index: 42,
            outcome: FrameOutcome::Payload { bytes: b"hello".to_vec(), snr_db: 18.2 },
        };
        let line = report_line(&frame);
        assert!(line.contains("PAYLOAD"));
        assert!(line.contains("hello"));
        assert!(line.contains("18.2dB"));
    }

    #[test]
    fn reports_a_discard_reason() {
        let frame =
            ReceivedFrame { start_index: 7, outcome: FrameOutcome::Discarded(FrameError::BadCrc) };
        let line = report_line(&frame);
        assert!(line.contains("CRC mismatch"));
    }
}
