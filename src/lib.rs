// src/lib.rs

//! # Free Flight Core
//!
//! This crate provides the `no_std`, no-alloc flight-control core of a
//! quadrotor: a per-axis Kalman filter attitude estimator fusing gyro rates
//! with accelerometer/magnetometer angles, a bank of anti-windup PID
//! controllers, and the fixed-period control loop and lossy sensor event
//! pipeline that connect them.
//!
//! ## Overview
//!
//! Interrupt handlers post `SensorEvent`s into a `SensorEventChannel`. A
//! consumer task reads the drivers, validates the samples and leaves gyro
//! rates and absolute angle corrections in a shared `SensorMailbox`. The
//! control task runs once per control period: it predicts with the latest
//! gyro rates, applies a pending correction, rebuilds the orientation matrix
//! and runs the PID bank to produce an `ActuationCommand`.
//!
//! All numeric code is generic over the scalar type, so the same code runs
//! on `f32` flight targets and `f64` hosts.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod estimator;
mod logging;
pub mod number;
pub mod pid;
pub mod rotation;
pub mod scheduler;
pub mod sensor;
pub mod shared;

#[doc(inline)]
pub use config::FlightCoreConfig;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use estimator::{AngleMeasurement, AttitudeEstimator, AttitudeVector};
#[doc(inline)]
pub use number::{Number, Real};
#[doc(inline)]
pub use pid::{ActuationCommand, ControlReferences, PidBank};
#[doc(inline)]
pub use scheduler::{ControlLoop, ControlTask};
#[doc(inline)]
pub use sensor::{SensorEvent, SensorEventChannel};

#[cfg(test)]
mod test_utils;
