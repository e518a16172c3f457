// src/sensor.rs

//! # Sensor Event Dispatcher
//!
//! Interrupt handlers post one `SensorEvent` per hardware event into a
//! bounded, lossy channel. A single consumer task drains it, reads the
//! drivers, validates the samples and leaves the results in a shared
//! mailbox for the control task. Absolute angle corrections are derived from
//! accelerometer/magnetometer samples by a pluggable `CorrectionSource`.

pub mod consumer;
pub use consumer::*;
pub mod correction;
pub use correction::*;
pub mod event;
pub use event::*;
