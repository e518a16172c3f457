// src/rotation.rs

//! # Rotation Transformation Module
//!
//! This module keeps track of coordinate system representations and the
//! transformations between the inertial (north, east, down) frame and the
//! body frame. The transformations are based on Z-Y-X (yaw, pitch, roll)
//! Euler angle rotations and direction cosine matrices.

pub mod matrix;
pub use matrix::*;
pub mod transformation;
pub use transformation::*;
