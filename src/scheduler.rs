// src/scheduler.rs

//! # Control Loop Scheduler
//!
//! Fixed-period control: a pure deadline tracker, the per-tick control step
//! (predict, correct, rotation update, PID) and the task that binds them to
//! the sensor mailbox, the reference source and the actuation sink.

pub mod control_loop;
pub use control_loop::*;
pub mod task;
pub use task::*;
pub mod tick;
pub use tick::*;
