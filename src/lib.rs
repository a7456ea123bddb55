//! This crate provides two platform agnostic radio-link primitives for microcontroller based
//! wireless experiments, built on the [`embedded-hal`] and [`embedded-io`] traits:
//!
//! * a direct-sequence spread-spectrum (DSSS) transmitter, which spreads a baseband signal
//!   against a fixed pseudo-noise chip sequence and delivers it over a serial link using a
//!   sync-delimited frame and an acknowledgment/retry handshake, see [`DsssTransmitter`];
//! * a frequency hopper, which derives a reproducible pseudo-random sequence of RF frequencies
//!   from a Park–Miller generator, programs a timer for each one and blinks a status line for
//!   the dwell time, see [`FrequencyHopper`].
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//! [`embedded-io`]: https://docs.rs/embedded-io
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! spread-hop = "0.1"
//! ```
//!
//! # Examples
//!
//! ```ignore
//! // Board specific bring-up first, nothing else can run before the clocks are up.
//! let clocks = spread_hop::bring_up(&mut board, &BoardConfig::default())?;
//!
//! let link = core::cell::RefCell::new(SerialTransport::new(uart, delay));
//!
//! let mut tx = DsssTransmitter::new(SharedTransport::new(&link), LinkConfig::default());
//! let report = tx.transmit(&signal)?;
//!
//! let config = HopperConfig::default().timer_clock_hz(clocks.apb1_timer_hz());
//! let mut hopper = FrequencyHopper::new(timer, led, delay, config)?;
//! let mut report_link = SharedTransport::new(&link);
//! loop {
//!     hopper.hop(&mut report_link)?;
//! }
//! ```
//!
//! # Feature-flags
//!
//! - **defmt:** log through [defmt](https://docs.rs/defmt) and derive `defmt::Format` for all
//!   public structs and enums.
//! - **log:** log through the [log](https://docs.rs/log) facade.
#![warn(
    missing_docs,
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts
)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
mod error;
pub mod frame;
mod hopper;
pub mod lcg;
pub mod platform;
pub mod pn;
pub mod status;
pub mod timer;
mod transmitter;
pub mod transport;

pub use crate::error::{BringUpError, ConfigError, HopError, TimerError, TransferError};
pub use crate::hopper::FrequencyHopper;
pub use crate::platform::bring_up;
pub use crate::transmitter::DsssTransmitter;

/// Byte that opens every DSSS frame.
pub const SYNC_BYTE: u8 = 0xAA;
/// Byte the receiver answers with once a frame arrived.
pub const ACK_BYTE: u8 = 0x55;
/// Number of baseband samples in one frame.
pub const SIGNAL_LENGTH: usize = 100;
/// Number of chips in the spreading code.
pub const PN_SEQUENCE_LENGTH: usize = 11;
/// Size in bytes of one serialized sample.
pub const SAMPLE_SIZE: usize = core::mem::size_of::<f32>();
/// Size in bytes of a complete frame, sync byte included.
pub const FRAME_SIZE: usize = 1 + SIGNAL_LENGTH * SAMPLE_SIZE;

/// A baseband signal as handed to [`DsssTransmitter::transmit()`].
pub type Signal = [f32; SIGNAL_LENGTH];
