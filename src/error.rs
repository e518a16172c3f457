// src/error.rs

//! # Error Types
//!
//! A single copyable error enum shared by every fallible operation in the
//! crate. Variants carry only static context so they can be logged from
//! interrupt-adjacent code and passed through channels without allocation.

use core::fmt;

/// Errors reported by the flight-control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A configuration value violates an invariant. The payload names the field.
    InvalidConfig(&'static str),
    /// An input contained NaN or infinity. The payload names the input.
    NonFiniteInput(&'static str),
    /// An input was finite but physically implausible.
    ImplausibleMagnitude(&'static str),
    /// A vector was too short, or two vectors were anti-parallel, so no
    /// rotation can be derived from it.
    DegenerateVector,
    /// A raw event code did not name any sensor event.
    UnknownSensorEvent(u8),
    /// A sensor driver failed to deliver a sample.
    SensorRead,
    /// A sensor driver failed to calibrate.
    SensorCalibration,
    /// A diagnostic buffer was too small for the requested dump.
    BufferOverflow,
    /// A diagnostic sampling session is already active.
    SamplingActive,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(field) => write!(f, "invalid configuration: {}", field),
            Error::NonFiniteInput(input) => write!(f, "non-finite input: {}", input),
            Error::ImplausibleMagnitude(input) => write!(f, "implausible magnitude: {}", input),
            Error::DegenerateVector => write!(f, "degenerate vector"),
            Error::UnknownSensorEvent(code) => write!(f, "unknown sensor event 0x{:02X}", code),
            Error::SensorRead => write!(f, "sensor read failed"),
            Error::SensorCalibration => write!(f, "sensor calibration failed"),
            Error::BufferOverflow => write!(f, "diagnostic buffer overflow"),
            Error::SamplingActive => write!(f, "sampling session already active"),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
