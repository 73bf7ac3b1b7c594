//! Multi-band lock-in demodulation
//!
//! Each EEG channel owns a [`LockInBank`]: five software lock-in
//! amplifiers sharing one reference cursor. A bank multiplies the incoming
//! sample against precomputed sine/cosine references at each band center
//! and smooths the resulting I/Q pair with a single-pole IIR whose cutoff
//! matches the band's lock-in bandwidth.
//!
//! The reference tables span exactly one second of samples, so integer
//! band centers cycle seamlessly at the table boundary. All state is
//! fixed-size and allocated at construction; `process` performs no
//! allocation and cannot fail.

use core::f32::consts::PI;

use crate::types::{FrequencyBand, BAND_COUNT, SAMPLE_RATE_HZ};

const TWO_PI: f32 = 2.0 * PI;

/// Reference table length: one second of samples.
pub const WINDOW: usize = SAMPLE_RATE_HZ as usize;

/// Upper bound on the IIR smoothing coefficient.
const MAX_FILTER_ALPHA: f32 = 0.9995;

// ============================================================================
// Per-Band Demodulator State
// ============================================================================

/// Demodulator state for a single band.
#[derive(Clone, Debug)]
struct BandState {
    /// One second of sine reference at the band center.
    ref_sin: [f32; WINDOW],
    /// One second of cosine reference at the band center.
    ref_cos: [f32; WINDOW],
    /// IIR smoothing coefficient, derived from the band's bandwidth.
    filter_alpha: f32,
    /// Smoothed in-phase estimate.
    i: f32,
    /// Smoothed quadrature estimate.
    q: f32,
    /// Current amplitude estimate in µV.
    amplitude: f32,
    /// Current phase estimate in radians.
    phase: f32,
}

impl BandState {
    fn new(band: FrequencyBand) -> Self {
        let bandwidth = band.bandwidth_hz().max(0.1);
        let alpha = libm::expf(-TWO_PI * bandwidth / SAMPLE_RATE_HZ as f32);

        let mut ref_sin = [0.0; WINDOW];
        let mut ref_cos = [0.0; WINDOW];
        for (i, (s, c)) in ref_sin.iter_mut().zip(ref_cos.iter_mut()).enumerate() {
            let t = i as f32 / SAMPLE_RATE_HZ as f32;
            *s = libm::sinf(TWO_PI * band.center_hz() * t);
            *c = libm::cosf(TWO_PI * band.center_hz() * t);
        }

        Self {
            ref_sin,
            ref_cos,
            filter_alpha: alpha.clamp(0.0, MAX_FILTER_ALPHA),
            i: 0.0,
            q: 0.0,
            amplitude: 0.0,
            phase: 0.0,
        }
    }

    fn clear(&mut self) {
        self.i = 0.0;
        self.q = 0.0;
        self.amplitude = 0.0;
        self.phase = 0.0;
    }
}

// ============================================================================
// Lock-In Bank
// ============================================================================

/// Five-band lock-in demodulator for one EEG channel.
///
/// Feed samples in microvolts at the fixed sample rate via [`process`];
/// read the current band estimates at any cadence via [`snapshot`].
///
/// [`process`]: LockInBank::process
/// [`snapshot`]: LockInBank::snapshot
#[derive(Clone, Debug)]
pub struct LockInBank {
    bands: [BandState; BAND_COUNT],
    index: usize,
}

impl LockInBank {
    /// Create a bank with freshly computed reference tables and zeroed
    /// demodulator state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bands: FrequencyBand::ALL.map(BandState::new),
            index: 0,
        }
    }

    /// Reset demodulator state and the reference cursor.
    ///
    /// The reference tables are immutable and survive a reset.
    pub fn reset(&mut self) {
        self.index = 0;
        for band in &mut self.bands {
            band.clear();
        }
    }

    /// Demodulate one sample (µV) into all five bands.
    #[inline]
    pub fn process(&mut self, sample_uv: f32) {
        let idx = self.index;
        for state in &mut self.bands {
            let i_raw = sample_uv * state.ref_cos[idx];
            let q_raw = sample_uv * state.ref_sin[idx];
            let beta = 1.0 - state.filter_alpha;
            state.i = state.filter_alpha * state.i + beta * i_raw;
            state.q = state.filter_alpha * state.q + beta * q_raw;
            state.amplitude = 2.0 * libm::sqrtf(state.i * state.i + state.q * state.q);
            state.phase = libm::atan2f(state.q, state.i);
        }
        self.index = (self.index + 1) % WINDOW;
    }

    /// Read the current amplitude (µV) and phase (radians) per band.
    ///
    /// Pure read: callers need not align snapshots with `process` calls.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> ([f32; BAND_COUNT], [f32; BAND_COUNT]) {
        let mut amplitude = [0.0; BAND_COUNT];
        let mut phase = [0.0; BAND_COUNT];
        for (band, state) in self.bands.iter().enumerate() {
            amplitude[band] = state.amplitude;
            phase[band] = state.phase;
        }
        (amplitude, phase)
    }
}

impl Default for LockInBank {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_tone(bank: &mut LockInBank, freq_hz: f32, amplitude_uv: f32, samples: usize) {
        for n in 0..samples {
            let t = n as f32 / SAMPLE_RATE_HZ as f32;
            bank.process(amplitude_uv * libm::sinf(TWO_PI * freq_hz * t));
        }
    }

    /// Per-band mean amplitude over the next full reference window.
    fn mean_amplitudes(
        bank: &mut LockInBank,
        freq_hz: f32,
        amplitude_uv: f32,
    ) -> [f32; BAND_COUNT] {
        let mut sums = [0.0; BAND_COUNT];
        for n in 0..WINDOW {
            let t = (n + 4 * WINDOW) as f32 / SAMPLE_RATE_HZ as f32;
            bank.process(amplitude_uv * libm::sinf(TWO_PI * freq_hz * t));
            let (amplitude, _) = bank.snapshot();
            for (sum, amp) in sums.iter_mut().zip(amplitude) {
                *sum += amp;
            }
        }
        sums.map(|s| s / WINDOW as f32)
    }

    #[test]
    fn test_filter_alpha_in_range() {
        let bank = LockInBank::new();
        for state in &bank.bands {
            assert!(state.filter_alpha > 0.0);
            assert!(state.filter_alpha <= MAX_FILTER_ALPHA);
        }
    }

    #[test]
    fn test_reference_tables_cycle() {
        // Integer center frequencies restart cleanly at the table boundary.
        let bank = LockInBank::new();
        let alpha = &bank.bands[FrequencyBand::Alpha.index()];
        assert!((alpha.ref_sin[0]).abs() < 1e-6);
        assert!((alpha.ref_cos[0] - 1.0).abs() < 1e-6);
        // One sample past the end equals one sample past the start.
        let step = TWO_PI * 10.0 / SAMPLE_RATE_HZ as f32;
        assert!((alpha.ref_sin[WINDOW - 1] - libm::sinf(-step)).abs() < 1e-3);
    }

    #[test]
    fn test_silence_stays_at_zero() {
        let mut bank = LockInBank::new();
        for _ in 0..500 {
            bank.process(0.0);
        }
        let (amplitude, _) = bank.snapshot();
        for amp in amplitude {
            assert!(amp < 1e-6);
        }
    }

    #[test]
    fn test_alpha_tone_convergence() {
        let mut bank = LockInBank::new();
        feed_tone(&mut bank, 10.0, 10.0, 4 * WINDOW);

        // Averaged over a full window the driven-band estimate settles on
        // the tone amplitude; the other bands see only beat leakage.
        let means = mean_amplitudes(&mut bank, 10.0, 10.0);

        let alpha = means[FrequencyBand::Alpha.index()];
        assert!((alpha - 10.0).abs() < 0.5, "alpha mean {alpha}");
        for band in FrequencyBand::ALL {
            if band != FrequencyBand::Alpha {
                assert!(
                    means[band.index()] < 0.9 * alpha,
                    "{} mean {} vs alpha {}",
                    band.name(),
                    means[band.index()],
                    alpha
                );
            }
        }
    }

    #[test]
    fn test_tone_phase_quadrature() {
        // A sine at the band center demodulates into the quadrature arm.
        let mut bank = LockInBank::new();
        feed_tone(&mut bank, 10.0, 10.0, 4 * WINDOW);
        let (_, phase) = bank.snapshot();
        let alpha_phase = phase[FrequencyBand::Alpha.index()];
        assert!((alpha_phase - PI / 2.0).abs() < 0.3, "phase {alpha_phase}");
    }

    #[test]
    fn test_reset_clears_state() {
        let mut bank = LockInBank::new();
        feed_tone(&mut bank, 10.0, 10.0, 100);
        bank.reset();
        assert_eq!(bank.index, 0);
        let (amplitude, phase) = bank.snapshot();
        for band in 0..BAND_COUNT {
            assert_eq!(amplitude[band], 0.0);
            assert_eq!(phase[band], 0.0);
        }
    }

    #[test]
    fn test_snapshot_is_pure() {
        let mut bank = LockInBank::new();
        feed_tone(&mut bank, 10.0, 5.0, 50);
        let first = bank.snapshot();
        let second = bank.snapshot();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }
}
