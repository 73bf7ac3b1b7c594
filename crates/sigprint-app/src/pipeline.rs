//! Cooperative processing pipeline
//!
//! One [`Pipeline`] owns the whole signal path: eight lock-in banks, the
//! fingerprint composer, and the packet codec with its reused frame
//! buffer. A single scheduler drives it: `ingest` for every raw frame at
//! the sample rate, `tick` at the packet rate. The fingerprint refreshes
//! once per second inside `tick`; packets between refreshes reuse the
//! most recent result.

use sigprint_core::fingerprint::{FingerprintComposer, FingerprintResult};
use sigprint_core::lockin::LockInBank;
use sigprint_core::protocol::{stage_frequency, PacketCodec, PACKET_SIZE};
use sigprint_core::types::{
    counts_to_uv, BandMatrix, CHANNEL_COUNT, FINGERPRINT_INTERVAL_MS,
};

/// The full processing chain from raw frames to encoded packets.
#[derive(Clone, Debug)]
pub struct Pipeline {
    banks: [LockInBank; CHANNEL_COUNT],
    composer: FingerprintComposer,
    codec: PacketCodec,
    amplitude: BandMatrix,
    phases: BandMatrix,
    last_raw: [i32; CHANNEL_COUNT],
    fingerprint: FingerprintResult,
    last_compose_ms: Option<u32>,
}

impl Pipeline {
    /// Create a pipeline with freshly reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banks: core::array::from_fn(|_| LockInBank::new()),
            composer: FingerprintComposer::new(),
            codec: PacketCodec::new(),
            amplitude: BandMatrix::default(),
            phases: BandMatrix::default(),
            last_raw: [0; CHANNEL_COUNT],
            fingerprint: FingerprintResult::default(),
            last_compose_ms: None,
        }
    }

    /// Feed one raw ADC frame through all lock-in banks.
    pub fn ingest(&mut self, frame: &[i32; CHANNEL_COUNT]) {
        self.last_raw = *frame;
        for (bank, &raw) in self.banks.iter_mut().zip(frame) {
            bank.process(counts_to_uv(raw));
        }
    }

    /// Run one packet tick: snapshot the banks, refresh the fingerprint
    /// when due, and encode a frame.
    ///
    /// The snapshot happens strictly after all `ingest` calls for the
    /// interval; the returned borrow stays valid until the next tick.
    pub fn tick(&mut self, now_ms: u32, stage: u8) -> &[u8; PACKET_SIZE] {
        for (ch, bank) in self.banks.iter().enumerate() {
            let (amp, phase) = bank.snapshot();
            self.amplitude[ch] = amp;
            self.phases[ch] = phase;
        }

        let due = match self.last_compose_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= FINGERPRINT_INTERVAL_MS,
        };
        if due {
            self.last_compose_ms = Some(now_ms);
            self.fingerprint = self.composer.compose(&self.amplitude, &self.phases, stage);
        }

        self.codec.encode(
            &self.last_raw,
            &self.amplitude,
            &self.phases,
            &self.fingerprint,
            stage,
            stage_frequency(stage),
            now_ms,
        )
    }

    /// The most recently composed fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &FingerprintResult {
        &self.fingerprint
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigprint_core::protocol::decode_data_packet;

    fn tone_frame(tick: u32) -> [i32; CHANNEL_COUNT] {
        let t = tick as f32 / 250.0;
        let value = (10_000.0 * (core::f32::consts::TAU * 10.0 * t).sin()) as i32;
        [value; CHANNEL_COUNT]
    }

    #[test]
    fn packet_carries_latest_raw_frame() {
        let mut pipeline = Pipeline::new();
        for tick in 0..10 {
            pipeline.ingest(&tone_frame(tick));
        }
        let last = tone_frame(9);
        let decoded = decode_data_packet(pipeline.tick(0, 1)).unwrap();
        assert_eq!(decoded.raw_samples, last);
        assert_eq!(decoded.stage, 1);
        assert_eq!(decoded.stage_frequency_hz, 222);
    }

    #[test]
    fn fingerprint_refreshes_at_one_hertz() {
        let mut pipeline = Pipeline::new();
        let mut tick = 0;

        // First tick composes; the next packet 40 ms later must not.
        for _ in 0..10 {
            pipeline.ingest(&tone_frame(tick));
            tick += 1;
        }
        let first = decode_data_packet(pipeline.tick(0, 1)).unwrap();
        assert_eq!(first.digits[17], 1);

        for _ in 0..10 {
            pipeline.ingest(&tone_frame(tick));
            tick += 1;
        }
        let second = decode_data_packet(pipeline.tick(40, 2)).unwrap();
        // Stage byte tracks the tick, the fingerprint digit does not yet.
        assert_eq!(second.stage, 2);
        assert_eq!(second.digits[17], 1);

        let third = decode_data_packet(pipeline.tick(1000, 2)).unwrap();
        assert_eq!(third.digits[17], 2);
    }

    #[test]
    fn missed_source_reads_reuse_previous_snapshot() {
        let mut pipeline = Pipeline::new();
        for tick in 0..250 {
            pipeline.ingest(&tone_frame(tick));
        }
        let first = decode_data_packet(pipeline.tick(0, 1)).unwrap();
        // No ingest between ticks: the snapshot is unchanged.
        let second = decode_data_packet(pipeline.tick(40, 1)).unwrap();
        assert_eq!(first.amplitude, second.amplitude);
        assert_eq!(first.raw_samples, second.raw_samples);
    }
}
