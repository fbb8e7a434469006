//! Configuration types for the PHY: the channel descriptor, default rate
//! selection and the maximum transmissible PSDU size. Serializable with
//! `serde` so the CLI can load a profile from TOML the same way the
//! rest of this stack's configuration is handled.

use serde::{Deserialize, Serialize};

use crate::channel::ChannelDescriptor;
use crate::errors::{ConfigError, Result as PhyResult};
use crate::errors::PhyError;
use crate::protocol::{rate_by_code, DEFAULT_RATE_CODE};

/// Largest PSDU length the 12-bit PLCP LENGTH field can express.
pub const MAX_PSDU_OCTETS: usize = 4095;

/// The transmitter/receiver configuration shared across a session: which
/// channel the baseband signal rides on, which rate to transmit at by
/// default, and the MTU enforced against incoming payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhyConfig {
    pub channel: ChannelDescriptor,
    /// 4-bit PLCP rate code (see [`crate::protocol::RATES`]).
    pub rate_code: u8,
    /// Largest payload, in octets, this configuration will transmit or
    /// accept on receive.
    pub mtu_octets: usize,
    /// STS repeat count fed to the autocorrelator during preamble search.
    pub sts_reps: usize,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            channel: ChannelDescriptor::default(),
            rate_code: DEFAULT_RATE_CODE,
            mtu_octets: 1500,
            sts_reps: 8,
        }
    }
}

impl PhyConfig {
    /// Validates internal consistency: a known rate, a sane sample rate,
    /// Nyquist headroom for the carrier, and an MTU within both the
    /// PLCP length field's range and the caller's own ceiling.
    pub fn validate(&self) -> PhyResult<()> {
        if !(self.channel.fs_hz.is_finite() && self.channel.fs_hz > 0.0) {
            return Err(PhyError::Config(ConfigError::InvalidSampleRate {
                rate_hz: self.channel.fs_hz,
            }));
        }
        if self.channel.upsample_factor == 0 {
            return Err(PhyError::Config(ConfigError::InvalidUpsampleFactor(
                self.channel.upsample_factor,
            )));
        }
        if self.channel.fc_hz * 2.0 >= self.channel.passband_hz() {
            return Err(PhyError::Config(ConfigError::NyquistViolation {
                carrier_hz: self.channel.fc_hz,
                fs_hz: self.channel.passband_hz(),
            }));
        }
        if self.mtu_octets > MAX_PSDU_OCTETS {
            return Err(PhyError::Config(ConfigError::MtuTooLarge(self.mtu_octets)));
        }
        if rate_by_code(self.rate_code).is_none() {
            return Err(PhyError::Transmit(crate::errors::TransmitError::InvalidRateCode(
                self.rate_code,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        PhyConfig::default().validate().unwrap();
    }

    #[test]
    fn unknown_rate_is_rejected() {
        let mut cfg = PhyConfig::default();
        cfg.rate_code = 0x0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_mtu_is_rejected() {
        let mut cfg = PhyConfig::default();
        cfg.mtu_octets = MAX_PSDU_OCTETS + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = PhyConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: PhyConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.rate_code, cfg.rate_code);
    }
}
