//! Rayleigh Sub-Channel Generation
//!
//! Draws the parallel sub-channels a water-filling run allocates over. Each
//! sub-channel has a flat Rayleigh fading coefficient `h ~ CN(0, 1)`, so the
//! power gain `|h|^2` is exponentially distributed with unit mean. Dividing by
//! the noise power gives the sub-channel SNR `gamma` and its floor `1/gamma`.
//!
//! ## Usage
//!
//! ```rust
//! use wlab_sim::channel::{ChannelConfig, ChannelGenerator};
//!
//! let config = ChannelConfig {
//!     num_channels: 4,
//!     noise_power: 0.5,
//!     seed: Some(1),
//! };
//!
//! let mut generator = ChannelGenerator::new(config).unwrap();
//! let channels = generator.generate();
//! assert_eq!(channels.len(), 4);
//! assert!(channels.iter().all(|ch| ch.inv_snr > 0.0 && ch.inv_snr.is_finite()));
//! ```

use crate::error::{SimError, SimResult};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use wlab_core::config::ChannelSettings;

/// Channel draw configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Number of parallel sub-channels
    pub num_channels: usize,
    /// Noise power per sub-channel
    pub noise_power: f64,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            num_channels: 6,
            noise_power: 1.0,
            seed: None,
        }
    }
}

impl ChannelConfig {
    /// Seeded configuration with unit noise power.
    pub fn seeded(num_channels: usize, seed: u64) -> Self {
        Self {
            num_channels,
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.num_channels == 0 {
            return Err(SimError::InvalidChannelCount(self.num_channels));
        }
        if !(self.noise_power.is_finite() && self.noise_power > 0.0) {
            return Err(SimError::InvalidNoisePower(self.noise_power));
        }
        Ok(())
    }
}

impl From<&ChannelSettings> for ChannelConfig {
    fn from(settings: &ChannelSettings) -> Self {
        Self {
            num_channels: settings.num_channels,
            noise_power: settings.noise_power,
            seed: settings.seed,
        }
    }
}

/// One parallel sub-channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubChannel {
    /// 1-based position in the draw
    pub index: usize,
    /// Fading coefficient `h`
    pub coefficient: Complex64,
    /// Power gain `|h|^2`
    pub gain: f64,
    /// SNR `gain / noise_power`
    pub snr: f64,
    /// Channel floor `1/snr`
    pub inv_snr: f64,
}

impl SubChannel {
    /// Build a sub-channel from its fading coefficient.
    pub fn from_coefficient(index: usize, coefficient: Complex64, noise_power: f64) -> Self {
        let gain = coefficient.norm_sqr();
        let snr = gain / noise_power;
        Self {
            index,
            coefficient,
            gain,
            snr,
            inv_snr: 1.0 / snr,
        }
    }

    /// Build a sub-channel from a power gain with a real coefficient.
    pub fn from_gain(index: usize, gain: f64, noise_power: f64) -> Self {
        Self::from_coefficient(index, Complex64::new(gain.sqrt(), 0.0), noise_power)
    }

    /// SNR in dB.
    pub fn snr_db(&self) -> f64 {
        10.0 * self.snr.log10()
    }
}

/// Floors of a channel set, in order.
pub fn inv_snrs(channels: &[SubChannel]) -> Vec<f64> {
    channels.iter().map(|ch| ch.inv_snr).collect()
}

/// SNRs of a channel set, in order.
pub fn snrs(channels: &[SubChannel]) -> Vec<f64> {
    channels.iter().map(|ch| ch.snr).collect()
}

/// Rayleigh sub-channel generator
#[derive(Debug)]
pub struct ChannelGenerator {
    config: ChannelConfig,
    rng: StdRng,
}

impl ChannelGenerator {
    pub fn new(config: ChannelConfig) -> SimResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Draw a fresh set of sub-channels.
    pub fn generate(&mut self) -> Vec<SubChannel> {
        let noise_power = self.config.noise_power;
        let channels: Vec<SubChannel> = (1..=self.config.num_channels)
            .map(|index| SubChannel::from_coefficient(index, self.draw_coefficient(), noise_power))
            .collect();

        tracing::info!(
            channels = channels.len(),
            noise_power,
            "generated Rayleigh sub-channels"
        );
        channels
    }

    /// Complex Gaussian coefficient with unit mean power.
    fn draw_coefficient(&mut self) -> Complex64 {
        loop {
            let re: f64 = self.rng.sample(StandardNormal);
            let im: f64 = self.rng.sample(StandardNormal);
            let h = Complex64::new(re, im) * FRAC_1_SQRT_2;
            // A zero gain would give an infinite floor
            if h.norm_sqr() > 0.0 {
                return h;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_gain() {
        let ch = SubChannel::from_gain(1, 2.0, 0.5);
        assert_relative_eq!(ch.gain, 2.0, epsilon = 1e-12);
        assert_relative_eq!(ch.snr, 4.0, epsilon = 1e-12);
        assert_relative_eq!(ch.inv_snr, 0.25, epsilon = 1e-12);
        assert_relative_eq!(ch.snr_db(), 10.0 * 4.0_f64.log10(), epsilon = 1e-12);
    }

    #[test]
    fn test_generate_count_and_indices() {
        let mut gen = ChannelGenerator::new(ChannelConfig::seeded(6, 11)).unwrap();
        let channels = gen.generate();
        assert_eq!(channels.len(), 6);
        for (i, ch) in channels.iter().enumerate() {
            assert_eq!(ch.index, i + 1);
            assert!(ch.gain > 0.0);
            assert_relative_eq!(ch.snr * ch.inv_snr, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_seed_reproducible() {
        let a = ChannelGenerator::new(ChannelConfig::seeded(8, 5)).unwrap().generate();
        let b = ChannelGenerator::new(ChannelConfig::seeded(8, 5)).unwrap().generate();
        assert_eq!(a, b);

        let c = ChannelGenerator::new(ChannelConfig::seeded(8, 6)).unwrap().generate();
        assert_ne!(a, c);
    }

    #[test]
    fn test_successive_draws_differ() {
        let mut gen = ChannelGenerator::new(ChannelConfig::seeded(4, 2)).unwrap();
        let first = gen.generate();
        let second = gen.generate();
        assert_ne!(first, second);
    }

    #[test]
    fn test_mean_gain_is_unity() {
        let mut gen = ChannelGenerator::new(ChannelConfig::seeded(20_000, 9)).unwrap();
        let channels = gen.generate();
        let mean = channels.iter().map(|ch| ch.gain).sum::<f64>() / channels.len() as f64;
        assert!((mean - 1.0).abs() < 0.05, "mean gain {mean}");
    }

    #[test]
    fn test_noise_power_scales_snr() {
        let config = ChannelConfig {
            num_channels: 3,
            noise_power: 2.0,
            seed: Some(4),
        };
        let channels = ChannelGenerator::new(config).unwrap().generate();
        for ch in &channels {
            assert_relative_eq!(ch.snr, ch.gain / 2.0, epsilon = 1e-12);
        }
        assert_eq!(inv_snrs(&channels).len(), 3);
        assert_eq!(snrs(&channels)[0], channels[0].snr);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            ChannelGenerator::new(ChannelConfig::seeded(0, 1)).unwrap_err(),
            SimError::InvalidChannelCount(0)
        );
        let config = ChannelConfig {
            noise_power: 0.0,
            ..Default::default()
        };
        assert_eq!(
            ChannelGenerator::new(config).unwrap_err(),
            SimError::InvalidNoisePower(0.0)
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = ChannelSettings {
            num_channels: 3,
            noise_power: 0.2,
            seed: Some(8),
        };
        let config = ChannelConfig::from(&settings);
        assert_eq!(config.num_channels, 3);
        assert_eq!(config.seed, Some(8));
    }
}
