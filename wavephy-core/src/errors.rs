//! PHY error types with granular categories for the transmit and receive
//! paths, per the frame-level error taxonomy: most receive-path conditions
//! are non-fatal (the offending frame is discarded, the stream keeps
//! running), while buffer-management violations are treated as fatal
//! programming errors against the stream's own contract.

use thiserror::Error;

/// Top-level error type for all PHY operations.
#[derive(Debug, Error)]
pub enum PhyError {
    #[error("transmit error: {0}")]
    Transmit(#[from] TransmitError),

    #[error("frame discarded: {0}")]
    FrameDiscarded(#[from] FrameError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Transmit-side errors: always fatal to the call that produced them,
/// since they indicate a caller contract violation rather than a channel
/// impairment.
#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("rate code {0:#x} is not one of the eight supported PLCP rates")]
    InvalidRateCode(u8),

    #[error("payload length {length} octets exceeds the {max} octet PSDU limit for this configuration")]
    PayloadTooLong { length: usize, max: usize },

    #[error("resources exhausted: {reason}")]
    ResourcesExhausted { reason: String },
}

/// Conditions under which a single candidate frame is discarded without
/// affecting any other in-flight frame. None of these stop the receiver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("no preamble found at the expected offset")]
    NoPreamble,

    #[error("SIGNAL field failed its parity check or named an unsupported rate")]
    BadSignal,

    #[error("frame check sequence did not validate")]
    BadCrc,

    #[error("SIGNAL claimed a PSDU length of {0} octets, above the configured MTU")]
    LengthExceedsMtu(u16),
}

/// Errors in the streaming receiver's buffer bookkeeping. `Underrun` is
/// recoverable (the caller simply has nothing new to offer yet);
/// `ShapeMismatch` indicates the lookback/ring-buffer invariant was
/// violated and is not recoverable within the current stream state.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("buffer underrun: requested {requested} samples, {available} available")]
    Underrun { requested: usize, available: usize },

    #[error("buffer overflow: capacity {capacity}, attempted write of {size}")]
    Overflow { capacity: usize, size: usize },

    #[error("shape mismatch: expected {expected} samples per channel, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Configuration validation errors, surfaced before any signal processing
/// begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid sample rate: {rate_hz} Hz (must be positive and finite)")]
    InvalidSampleRate { rate_hz: f64 },

    #[error("carrier {carrier_hz} Hz violates Nyquist for baseband rate {fs_hz} Hz")]
    NyquistViolation { carrier_hz: f64, fs_hz: f64 },

    #[error("upsample factor must be at least 1, got {0}")]
    InvalidUpsampleFactor(usize),

    #[error("MTU of {0} octets exceeds the 12-bit PLCP length field's range")]
    MtuTooLarge(usize),
}

/// Result type alias for PHY operations.
pub type Result<T> = std::result::Result<T, PhyError>;
