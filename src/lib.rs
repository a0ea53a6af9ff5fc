#![cfg_attr(not(test), no_std)]

//! Incremental NMEA-0183 decoding for serial GPS receivers.
//!
//! Bytes go in one at a time through [`gps::Gps::update`]; sentences are
//! checksummed before anything they carry is committed to the
//! [`navigation::Navigation`] snapshot. No allocation, no I/O.

#[macro_use]
mod logging;

pub mod clock;
pub mod gps;
pub mod navigation;
pub mod nmea;

pub use clock::{Clock, MockClock};
pub use gps::{Gps, GpsConfig, Stats};
pub use nmea::{NmeaError, NmeaParser, SentenceId};

/// Decimal degrees, south and west negative.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    pub lat: f32,
    pub lon: f32,
}
