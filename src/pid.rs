// src/pid.rs

//! # PID Control Module
//!
//! This module provides the compute callback, the per-axis controller with
//! filtered derivative, saturation and back-calculation anti-windup, and the
//! bank of roll, pitch, yaw and altitude controllers driven by the control
//! loop.

pub mod axis;
pub use axis::*;
pub mod bank;
pub use bank::*;
pub mod compute;
pub use compute::*;
