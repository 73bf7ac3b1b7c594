//! End-to-end pipeline scenarios: lock-in bank → composer → codec.

use std::f32::consts::PI;

use sigprint_core::fingerprint::FingerprintComposer;
use sigprint_core::lockin::LockInBank;
use sigprint_core::protocol::{
    self, decode_data_packet, PacketCodec, HEADER_SIZE, PACKET_SIZE, PAYLOAD_SIZE,
};
use sigprint_core::types::{BandMatrix, FrequencyBand, BAND_COUNT, CHANNEL_COUNT, SAMPLE_RATE_HZ};

/// Drive all eight banks with a per-channel signal and snapshot them.
fn run_banks(samples: usize, signal: impl Fn(usize, f32) -> f32) -> (BandMatrix, BandMatrix) {
    let mut banks: Vec<LockInBank> = (0..CHANNEL_COUNT).map(|_| LockInBank::new()).collect();
    for n in 0..samples {
        let t = n as f32 / SAMPLE_RATE_HZ as f32;
        for (ch, bank) in banks.iter_mut().enumerate() {
            bank.process(signal(ch, t));
        }
    }

    let mut amplitude = BandMatrix::default();
    let mut phases = BandMatrix::default();
    for (ch, bank) in banks.iter().enumerate() {
        let (amp, phase) = bank.snapshot();
        amplitude[ch] = amp;
        phases[ch] = phase;
    }
    (amplitude, phases)
}

fn coherence_digits_value(digits: &[u8; 20]) -> u32 {
    digits[8..12].iter().fold(0u32, |acc, &d| acc * 10 + u32::from(d))
}

#[test]
fn silence_produces_empty_fingerprint() {
    let (amplitude, phases) = run_banks(500, |_, _| 0.0);

    for row in &amplitude {
        for &amp in row {
            assert!(amp < 1e-6);
        }
    }

    let mut composer = FingerprintComposer::new();
    let result = composer.compose(&amplitude, &phases, 0);

    assert!(result.coherence <= 1e-3);
    assert_eq!(coherence_digits_value(&result.digits), 0);
    assert_eq!(result.gate_flags, 0);
    assert!(result.checksum_valid());
}

#[test]
fn in_phase_alpha_drives_coherence_and_gate() {
    let mut composer = FingerprintComposer::new();

    // Baseline tick on silence, then a shared 10 Hz tone on every channel.
    let (quiet_amp, quiet_phase) = run_banks(500, |_, _| 0.0);
    composer.compose(&quiet_amp, &quiet_phase, 1);

    let (amplitude, phases) = run_banks(500, |_, t| 10.0 * (2.0 * PI * 10.0 * t).sin());
    let result = composer.compose(&amplitude, &phases, 1);

    assert!(result.coherence > 0.99);
    assert!(coherence_digits_value(&result.digits) >= 2900);
    assert!(result.gate(FrequencyBand::Alpha));
    assert!(result.checksum_valid());
}

#[test]
fn antiphase_hemispheres_read_as_180_degrees() {
    let (amplitude, phases) = run_banks(500, |ch, t| {
        let phase = if ch % 2 == 0 { 0.0 } else { PI };
        10.0 * (2.0 * PI * 10.0 * t + phase).sin()
    });

    let mut composer = FingerprintComposer::new();
    let result = composer.compose(&amplitude, &phases, 0);

    // 180° / 3.6°-per-step = 50
    assert_eq!(result.digits[0], 5);
    assert_eq!(result.digits[1], 0);
}

#[test]
fn steady_signal_settles_into_loop() {
    let (amplitude, phases) = run_banks(500, |_, t| 10.0 * (2.0 * PI * 10.0 * t).sin());

    let mut composer = FingerprintComposer::new();
    for _ in 0..21 {
        composer.compose(&amplitude, &phases, 0);
    }
    for tick in 22..=25 {
        let result = composer.compose(&amplitude, &phases, 0);
        assert!(result.looped(FrequencyBand::Alpha), "tick {tick}");
    }
}

#[test]
fn amplitude_step_gates_and_breaks_loop() {
    let (amplitude, phases) = run_banks(500, |_, t| 10.0 * (2.0 * PI * 10.0 * t).sin());

    let mut doubled = amplitude;
    for row in &mut doubled {
        for value in row.iter_mut() {
            *value *= 2.0;
        }
    }

    let mut composer = FingerprintComposer::new();
    for _ in 0..10 {
        composer.compose(&amplitude, &phases, 0);
    }
    let result = composer.compose(&doubled, &phases, 0);

    assert!(result.gate(FrequencyBand::Alpha));
    assert!(!result.looped(FrequencyBand::Alpha));
}

#[test]
fn full_pipeline_packet_roundtrip() {
    let (amplitude, phases) = run_banks(500, |ch, t| {
        (8.0 + ch as f32) * (2.0 * PI * 10.0 * t + ch as f32 * 0.3).sin()
    });

    let mut composer = FingerprintComposer::new();
    let fingerprint = composer.compose(&amplitude, &phases, 2);

    let raw = [1_000, -1_000, 500_000, -500_000, 0, 1, -1, 8_388_607];
    let mut codec = PacketCodec::new();
    let frame = codec.encode(
        &raw,
        &amplitude,
        &phases,
        &fingerprint,
        2,
        protocol::stage_frequency(2),
        40_000,
    );

    assert_eq!(frame.len(), PACKET_SIZE);
    assert_eq!(u16::from_le_bytes([frame[0], frame[1]]), 0x5347);
    assert_eq!(
        u16::from_le_bytes([frame[8], frame[9]]),
        PAYLOAD_SIZE as u16
    );
    let crc = protocol::crc16_ccitt(&frame[HEADER_SIZE..]);
    assert_eq!(u16::from_le_bytes([frame[10], frame[11]]), crc);

    let decoded = decode_data_packet(frame).unwrap();
    assert_eq!(decoded.raw_samples, raw);
    assert_eq!(decoded.digits, fingerprint.digits);
    assert_eq!(decoded.stage, 2);
    assert_eq!(decoded.stage_frequency_hz, 333);
    for ch in 0..CHANNEL_COUNT {
        for band in 0..BAND_COUNT {
            assert_eq!(
                decoded.amplitude[ch][band].to_bits(),
                amplitude[ch][band].to_bits()
            );
            assert_eq!(
                decoded.phases[ch][band].to_bits(),
                phases[ch][band].to_bits()
            );
        }
    }
}
