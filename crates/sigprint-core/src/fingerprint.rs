//! SIGPRINT fingerprint composition
//!
//! The composer condenses one snapshot of the 8×5 amplitude and phase
//! matrices into a [`FingerprintResult`]: a 20-digit decimal code plus
//! derived metrics. Digit positions:
//!
//! | Positions | Meaning                                   |
//! |-----------|-------------------------------------------|
//! | 0–1       | L/R alpha phase offset (0–99, 3.6°/step)  |
//! | 2–3       | Alpha L/(L+R) amplitude ratio (0–99)      |
//! | 4–5       | Frontal share of total amplitude (0–99)   |
//! | 6–7       | Occipital share of total amplitude (0–99) |
//! | 8–11      | Global coherence × 9999                   |
//! | 12–16     | Compressed weighted band power, one per band |
//! | 17        | Stage hint mod 10                         |
//! | 18–19     | Mod-97 checksum over positions 0–17       |
//!
//! The composer is stateful across ticks: gate events flag a ≥35% step in
//! a band's mean amplitude against the previous tick, and loop events flag
//! a return to within ±5% of the band's value 20 ticks earlier.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{BandMatrix, EegChannel, FrequencyBand, BAND_COUNT, CHANNEL_COUNT};

/// Ring-buffer length for per-band amplitude history.
const HISTORY_WINDOW: usize = 64;

/// Loop detection look-back in composer ticks (~0.8 s at packet rate).
const LOOP_LOOKBACK: usize = 20;

/// Fractional amplitude step that registers as a gate event.
const GATE_THRESHOLD: f32 = 0.35;

/// Fractional deviation tolerated by loop detection.
const LOOP_TOLERANCE: f32 = 0.05;

/// Denominator guard for fractional comparisons.
const POWER_FLOOR: f32 = 1e-3;

/// Guard against division by zero in share ratios.
const RATIO_EPSILON: f32 = 1e-6;

/// Mean amplitude below which a band carries no phase information and
/// contributes zero coherence.
const COHERENCE_AMP_FLOOR: f32 = 1e-6;

/// Knee of the per-band power compression curve (µV, weighted).
const POWER_COMPRESSION_KNEE: f32 = 25.0;

// ============================================================================
// Fingerprint Result
// ============================================================================

/// One composed fingerprint: 20 decimal digits plus derived metrics.
///
/// Value object; the composer retains no reference to it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintResult {
    /// The 20-digit code, each entry in `0..=9`.
    pub digits: [u8; 20],
    /// Weighted global phase coherence in `[0, 1]`.
    pub coherence: f32,
    /// Gate events, bit `b` = band `b` stepped ≥35% since the last tick.
    pub gate_flags: u8,
    /// Loop events, bit `b` = band `b` returned to its level ~0.8 s ago.
    pub loop_flags: u8,
    /// Shannon entropy of the digit distribution, in `[0, log₂ 10]` bits.
    pub entropy: f32,
}

impl FingerprintResult {
    /// Check positions 18–19 against the mod-97 sum of positions 0–17.
    #[must_use]
    pub fn checksum_valid(&self) -> bool {
        let sum: u32 = self.digits[..18].iter().map(|&d| u32::from(d)).sum();
        let cs = (sum % 97) as u8;
        self.digits[18] == cs / 10 && self.digits[19] == cs % 10
    }

    /// Check whether a gate event fired for the given band.
    #[inline]
    #[must_use]
    pub const fn gate(&self, band: FrequencyBand) -> bool {
        self.gate_flags & (1u8 << band.index()) != 0
    }

    /// Check whether a loop event fired for the given band.
    #[inline]
    #[must_use]
    pub const fn looped(&self, band: FrequencyBand) -> bool {
        self.loop_flags & (1u8 << band.index()) != 0
    }
}

impl fmt::Display for FingerprintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in self.digits {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FingerprintResult {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "coh={} gates={:02X} loops={:02X}",
            self.coherence,
            self.gate_flags,
            self.loop_flags
        );
    }
}

// ============================================================================
// Composer
// ============================================================================

/// Stateful fingerprint composer.
///
/// Owns the per-band history used for gate and loop detection. The first
/// call establishes the baseline: gate and loop detection are suppressed
/// until a previous tick exists to compare against.
#[derive(Clone, Debug)]
pub struct FingerprintComposer {
    initialized: bool,
    previous_power: [f32; BAND_COUNT],
    history: [[f32; HISTORY_WINDOW]; BAND_COUNT],
    history_index: [usize; BAND_COUNT],
    history_fill: [u16; BAND_COUNT],
}

impl FingerprintComposer {
    /// Create an uninitialized composer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initialized: false,
            previous_power: [0.0; BAND_COUNT],
            history: [[0.0; HISTORY_WINDOW]; BAND_COUNT],
            history_index: [0; BAND_COUNT],
            history_fill: [0; BAND_COUNT],
        }
    }

    /// Compose a fingerprint from one amplitude/phase snapshot.
    ///
    /// `stage_hint` lands in digit position 17 as its units digit. The
    /// operation is total: any finite-valued snapshot yields a result.
    pub fn compose(
        &mut self,
        amplitude: &BandMatrix,
        phases: &BandMatrix,
        stage_hint: u8,
    ) -> FingerprintResult {
        let mut result = FingerprintResult::default();
        let mut avg_power = [0.0f32; BAND_COUNT];
        let mut band_coherence = [0.0f32; BAND_COUNT];

        for band in 0..BAND_COUNT {
            let mut power_sum = 0.0f32;
            let mut sin_sum = 0.0f32;
            let mut cos_sum = 0.0f32;
            for ch in 0..CHANNEL_COUNT {
                power_sum += amplitude[ch][band];
                sin_sum += libm::sinf(phases[ch][band]);
                cos_sum += libm::cosf(phases[ch][band]);
            }
            avg_power[band] = power_sum / CHANNEL_COUNT as f32;
            // A silent band carries no phase information.
            if avg_power[band] > COHERENCE_AMP_FLOOR {
                let magnitude = libm::sqrtf(sin_sum * sin_sum + cos_sum * cos_sum);
                band_coherence[band] = (magnitude / CHANNEL_COUNT as f32).clamp(0.0, 1.0);
            }
        }

        // Weighted global coherence (0..1)
        let coherence_sum: f32 = FrequencyBand::ALL
            .iter()
            .map(|b| band_coherence[b.index()] * b.weight())
            .sum();
        result.coherence = coherence_sum.clamp(0.0, 1.0);

        // Phase asymmetry between hemispheres (alpha band)
        let alpha = FrequencyBand::Alpha.index();
        let left_phase = circular_mean(phases, &EegChannel::LEFT, alpha);
        let right_phase = circular_mean(phases, &EegChannel::RIGHT, alpha);
        let offset_deg = ((left_phase - right_phase).to_degrees()).rem_euclid(360.0);
        let phase_metric = round_clamped(offset_deg / 3.6, 99);
        result.digits[0] = (phase_metric / 10) as u8;
        result.digits[1] = (phase_metric % 10) as u8;

        // Amplitude asymmetry between hemispheres (alpha band)
        let left_power: f32 = EegChannel::LEFT
            .iter()
            .map(|ch| amplitude[ch.index()][alpha])
            .sum();
        let right_power: f32 = EegChannel::RIGHT
            .iter()
            .map(|ch| amplitude[ch.index()][alpha])
            .sum();
        let lr_total = left_power + right_power + RATIO_EPSILON;
        let lr_ratio = round_clamped(left_power / lr_total * 99.0, 99);
        result.digits[2] = (lr_ratio / 10) as u8;
        result.digits[3] = (lr_ratio % 10) as u8;

        // Regional amplitude distribution (frontal vs occipital, all bands)
        let frontal_sum: f32 = EegChannel::FRONTAL
            .iter()
            .flat_map(|ch| amplitude[ch.index()].iter())
            .sum();
        let occipital_sum: f32 = EegChannel::OCCIPITAL
            .iter()
            .flat_map(|ch| amplitude[ch.index()].iter())
            .sum();
        let regional_total = frontal_sum + occipital_sum + RATIO_EPSILON;
        let frontal_pct = round_clamped(frontal_sum / regional_total * 99.0, 99);
        let occipital_pct = round_clamped(occipital_sum / regional_total * 99.0, 99);
        result.digits[4] = (frontal_pct / 10) as u8;
        result.digits[5] = (frontal_pct % 10) as u8;
        result.digits[6] = (occipital_pct / 10) as u8;
        result.digits[7] = (occipital_pct % 10) as u8;

        // Coherence digits (0-9999 mapped to 4 digits)
        let coherence_value = round_clamped(result.coherence * 9999.0, 9999);
        result.digits[8] = ((coherence_value / 1000) % 10) as u8;
        result.digits[9] = ((coherence_value / 100) % 10) as u8;
        result.digits[10] = ((coherence_value / 10) % 10) as u8;
        result.digits[11] = (coherence_value % 10) as u8;

        // Compressed weighted band power (positions 12-16)
        for band in FrequencyBand::ALL {
            let weighted = avg_power[band.index()] * band.weight();
            let normalized = weighted / (weighted + POWER_COMPRESSION_KNEE);
            result.digits[12 + band.index()] = round_clamped(normalized * 9.0, 9) as u8;
        }

        // Stage units digit in the final reserved slot
        result.digits[17] = stage_hint % 10;

        // Gate detection and history update. The comparisons against the
        // previous tick must run before their slots are overwritten.
        for band in 0..BAND_COUNT {
            let prev = self.previous_power[band];
            if self.initialized {
                let delta = (avg_power[band] - prev).abs() / prev.max(POWER_FLOOR);
                if delta >= GATE_THRESHOLD {
                    result.gate_flags |= 1u8 << band;
                }
            }
            self.previous_power[band] = avg_power[band];

            // Loop detection via look-back similarity
            let head = self.history_index[band];
            self.history[band][head] = avg_power[band];
            self.history_index[band] = (head + 1) % HISTORY_WINDOW;
            if self.history_fill[band] < HISTORY_WINDOW as u16 {
                self.history_fill[band] += 1;
            }
            if self.initialized && self.history_fill[band] > LOOP_LOOKBACK as u16 {
                let idx = (head + HISTORY_WINDOW - LOOP_LOOKBACK) % HISTORY_WINDOW;
                let reference = self.history[band][idx];
                let deviation = (avg_power[band] - reference).abs() / reference.max(POWER_FLOOR);
                if deviation <= LOOP_TOLERANCE {
                    result.loop_flags |= 1u8 << band;
                }
            }
        }

        self.initialized = true;

        // Checksum over the first 18 digits
        let checksum_seed: u32 = result.digits[..18].iter().map(|&d| u32::from(d)).sum();
        let checksum = (checksum_seed % 97) as u8;
        result.digits[18] = checksum / 10;
        result.digits[19] = checksum % 10;

        // Shannon entropy of the digit distribution (base 2)
        let mut digit_counts = [0u16; 10];
        for digit in result.digits {
            digit_counts[usize::from(digit)] += 1;
        }
        let total = result.digits.len() as f32;
        let mut entropy = 0.0f32;
        for count in digit_counts {
            if count > 0 {
                let p = f32::from(count) / total;
                entropy -= p * libm::log2f(p);
            }
        }
        result.entropy = entropy;

        result
    }
}

impl Default for FingerprintComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Circular mean of one band's phase across a channel group, in radians.
fn circular_mean(phases: &BandMatrix, channels: &[EegChannel], band: usize) -> f32 {
    let mut sin_sum = 0.0f32;
    let mut cos_sum = 0.0f32;
    for ch in channels {
        sin_sum += libm::sinf(phases[ch.index()][band]);
        cos_sum += libm::cosf(phases[ch.index()][band]);
    }
    let count = channels.len() as f32;
    libm::atan2f(sin_sum / count, cos_sum / count)
}

/// Round to the nearest integer and clamp into `0..=max`.
fn round_clamped(value: f32, max: u16) -> u16 {
    let rounded = libm::roundf(value) as i32;
    rounded.clamp(0, i32::from(max)) as u16
}

// ============================================================================
// Tests
// ============================================================================
