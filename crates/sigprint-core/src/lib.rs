//! SIGPRINT Core - multi-band neural signal analysis and stream protocol
//!
//! This crate implements the signal-processing and packetization pipeline
//! for an 8-channel biopotential frontend: per-channel lock-in demodulation
//! into five frequency bands, the 20-digit SIGPRINT fingerprint with gate
//! and loop event detection, and the fixed 383-byte binary packet format.
//! It is designed to work in `no_std` environments (embedded devices) as
//! well as `std` environments.
//!
//! # Modules
//!
//! - [`types`]: Channels, frequency bands, and pipeline constants
//! - [`error`]: Protocol error types
//! - [`lockin`]: Per-channel multi-band lock-in demodulator
//! - [`fingerprint`]: Fingerprint composer (digits, coherence, gates, loops)
//! - [`protocol`]: Binary wire format with CRC-16 framing
//!
//! # Features
//!
//! - `std`: Enable standard library support (default)
//! - `defmt`: Enable `defmt` formatting for embedded logging
//!
//! # Example
//!
//! ```rust
//! use sigprint_core::lockin::LockInBank;
//! use sigprint_core::types::{BandMatrix, CHANNEL_COUNT};
//! use sigprint_core::fingerprint::FingerprintComposer;
//!
//! let mut banks: [LockInBank; CHANNEL_COUNT] = core::array::from_fn(|_| LockInBank::new());
//! let mut amplitude = BandMatrix::default();
//! let mut phases = BandMatrix::default();
//!
//! // Feed one tick of samples (µV) and read back the band estimates.
//! for (ch, bank) in banks.iter_mut().enumerate() {
//!     bank.process(10.0);
//!     let (amp, phase) = bank.snapshot();
//!     amplitude[ch] = amp;
//!     phases[ch] = phase;
//! }
//!
//! let mut composer = FingerprintComposer::new();
//! let result = composer.compose(&amplitude, &phases, 1);
//! assert!(result.checksum_valid());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod error;
pub mod fingerprint;
pub mod lockin;
pub mod protocol;
pub mod types;

// Re-export commonly used types at crate root
pub use error::ProtocolError;
pub use fingerprint::{FingerprintComposer, FingerprintResult};
pub use lockin::LockInBank;
pub use protocol::{decode_data_packet, stage_frequency, DecodedPacket, PacketCodec, PacketHeader};
pub use types::{BandMatrix, EegChannel, FrequencyBand};
