// src/estimator.rs

//! # Attitude Estimation Module
//!
//! This module provides a per-axis two-state Kalman filter, with state
//! `[angle, rate bias]`, and the three-axis estimator built from it. Gyro
//! rates drive the prediction every control period; absolute angles from the
//! accelerometer/magnetometer geometry drive the correction whenever one is
//! available.

pub mod attitude;
pub use attitude::*;
pub mod kalman;
pub use kalman::*;
