//! Core types for the SIGPRINT pipeline
//!
//! This module provides the fixed structural constants of the pipeline,
//! the EEG channel montage, and the five-band frequency table. All values
//! here are compile-time constants: the wire format and the DSP chain are
//! not runtime-configurable.

use serde::{Deserialize, Serialize};

// ============================================================================
// Pipeline Constants
// ============================================================================

/// Number of EEG channels in the frontend.
pub const CHANNEL_COUNT: usize = 8;

/// Number of frequency bands per channel.
pub const BAND_COUNT: usize = 5;

/// ADC sample rate in Hz.
pub const SAMPLE_RATE_HZ: u32 = 250;

/// Packet emission rate in Hz.
pub const PACKET_RATE_HZ: u32 = 25;

/// Interval between packets in milliseconds.
pub const PACKET_INTERVAL_MS: u32 = 1000 / PACKET_RATE_HZ;

/// Interval between fingerprint refreshes in milliseconds.
pub const FINGERPRINT_INTERVAL_MS: u32 = 1000;

/// ADC reference voltage in volts.
pub const ADC_REFERENCE_V: f32 = 4.5;

/// ADC programmable gain.
pub const ADC_GAIN: f32 = 24.0;

/// Conversion scale from signed 24-bit ADC counts to microvolts.
///
/// `4.5 V · 10⁶ / (gain · (2²³ − 1))`
pub const ADC_SCALE_UV: f32 = (ADC_REFERENCE_V * 1_000_000.0) / (ADC_GAIN * 8_388_607.0);

/// Amplitude and phase estimates for all channels and bands.
///
/// Channel-major, band-minor: `matrix[channel][band]`.
pub type BandMatrix = [[f32; BAND_COUNT]; CHANNEL_COUNT];

/// Convert a signed 24-bit ADC count (sign-extended to `i32`) to microvolts.
#[inline]
#[must_use]
pub fn counts_to_uv(raw: i32) -> f32 {
    raw as f32 * ADC_SCALE_UV
}

// ============================================================================
// EEG Channel Montage
// ============================================================================

/// EEG channel identifier following the 10-20 system.
///
/// The 8-channel montage covers frontal, central, parietal, and occipital
/// regions, with even indices on the left hemisphere and odd indices on
/// the right.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EegChannel {
    /// Frontal-polar left
    Fp1 = 0,
    /// Frontal-polar right
    Fp2 = 1,
    /// Central left
    C3 = 2,
    /// Central right
    C4 = 3,
    /// Parietal left
    P3 = 4,
    /// Parietal right
    P4 = 5,
    /// Occipital left
    O1 = 6,
    /// Occipital right
    O2 = 7,
}

impl EegChannel {
    /// All channels in frame order.
    pub const ALL: [Self; CHANNEL_COUNT] = [
        Self::Fp1, Self::Fp2, Self::C3, Self::C4,
        Self::P3, Self::P4, Self::O1, Self::O2,
    ];

    /// Left-hemisphere channels used for lateral asymmetry metrics.
    pub const LEFT: [Self; 4] = [Self::Fp1, Self::C3, Self::P3, Self::O1];

    /// Right-hemisphere channels used for lateral asymmetry metrics.
    pub const RIGHT: [Self; 4] = [Self::Fp2, Self::C4, Self::P4, Self::O2];

    /// Frontal group used for regional amplitude distribution.
    pub const FRONTAL: [Self; 4] = [Self::Fp1, Self::Fp2, Self::C3, Self::C4];

    /// Occipital group used for regional amplitude distribution.
    pub const OCCIPITAL: [Self; 2] = [Self::O1, Self::O2];

    /// Get the frame index for this channel.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Get channel from frame index (returns None if out of range).
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Fp1),
            1 => Some(Self::Fp2),
            2 => Some(Self::C3),
            3 => Some(Self::C4),
            4 => Some(Self::P3),
            5 => Some(Self::P4),
            6 => Some(Self::O1),
            7 => Some(Self::O2),
            _ => None,
        }
    }

    /// Get the 10-20 system name for this channel.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fp1 => "Fp1",
            Self::Fp2 => "Fp2",
            Self::C3 => "C3",
            Self::C4 => "C4",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::O1 => "O1",
            Self::O2 => "O2",
        }
    }

    /// Check if this channel is on the left hemisphere.
    #[inline]
    #[must_use]
    pub const fn is_left(self) -> bool {
        matches!(self, Self::Fp1 | Self::C3 | Self::P3 | Self::O1)
    }

    /// Check if this channel is on the right hemisphere.
    #[inline]
    #[must_use]
    pub const fn is_right(self) -> bool {
        !self.is_left()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EegChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

// ============================================================================
// Frequency Bands
// ============================================================================

/// The five demodulation bands, delta through gamma.
///
/// Each band carries a fixed center frequency, lock-in bandwidth, and the
/// weight it contributes to the global coherence metric. The band count
/// and ordering are structural constants of the fingerprint format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrequencyBand {
    /// Delta: centered at 2.5 Hz
    Delta = 0,
    /// Theta: centered at 6 Hz
    Theta = 1,
    /// Alpha: centered at 10 Hz
    Alpha = 2,
    /// Beta: centered at 20 Hz
    Beta = 3,
    /// Gamma: centered at 40 Hz
    Gamma = 4,
}

impl FrequencyBand {
    /// All bands in fingerprint order.
    pub const ALL: [Self; BAND_COUNT] = [
        Self::Delta, Self::Theta, Self::Alpha, Self::Beta, Self::Gamma,
    ];

    /// Get the band index in fingerprint order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Get the band name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Theta => "theta",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Gamma => "gamma",
        }
    }

    /// Get the demodulation center frequency in Hz.
    #[inline]
    #[must_use]
    pub const fn center_hz(self) -> f32 {
        match self {
            Self::Delta => 2.5,
            Self::Theta => 6.0,
            Self::Alpha => 10.0,
            Self::Beta => 20.0,
            Self::Gamma => 40.0,
        }
    }

    /// Get the lock-in bandwidth in Hz.
    #[inline]
    #[must_use]
    pub const fn bandwidth_hz(self) -> f32 {
        match self {
            Self::Delta | Self::Theta | Self::Alpha => 3.0,
            Self::Beta => 10.0,
            Self::Gamma => 20.0,
        }
    }

    /// Get the weight this band contributes to global coherence.
    #[inline]
    #[must_use]
    pub const fn weight(self) -> f32 {
        match self {
            Self::Delta | Self::Gamma => 0.15,
            Self::Theta | Self::Beta => 0.20,
            Self::Alpha => 0.30,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FrequencyBand {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_index_roundtrip() {
        for ch in EegChannel::ALL {
            assert_eq!(EegChannel::from_index(ch.index()), Some(ch));
        }
        assert_eq!(EegChannel::from_index(8), None);
    }

    #[test]
    fn test_channel_hemispheres() {
        for ch in EegChannel::LEFT {
            assert!(ch.is_left());
            assert_eq!(ch.index() % 2, 0);
        }
        for ch in EegChannel::RIGHT {
            assert!(ch.is_right());
            assert_eq!(ch.index() % 2, 1);
        }
    }

    #[test]
    fn test_band_weights_sum_to_one() {
        let sum: f32 = FrequencyBand::ALL.iter().map(|b| b.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_band_order() {
        let mut prev = 0.0;
        for band in FrequencyBand::ALL {
            assert!(band.center_hz() > prev);
            prev = band.center_hz();
        }
    }

    #[test]
    fn test_adc_scale() {
        // Full-scale positive count maps to VREF/gain in µV.
        let full_scale = counts_to_uv(8_388_607);
        assert!((full_scale - 187_500.0).abs() < 1.0);
    }
}
