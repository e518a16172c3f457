// src/shared.rs

//! # Shared State
//!
//! The sensor consumer task and the control task exchange samples through
//! one value guarded by a critical section. Both sides only ever touch it in
//! short read-modify-write closures, so interrupts are masked for a bounded,
//! small number of instructions.

use core::cell::RefCell;
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// Synchronized access to a value shared between tasks.
///
/// # Example
///
/// ```
/// use free_flight_core::shared::{CriticalSectionState, SharedState};
///
/// let counter = CriticalSectionState::new(0u32);
/// counter.with_mut(|count| *count += 1);
/// assert_eq!(1, counter.with(|count| *count));
/// ```
pub trait SharedState<T> {
    /// Access the value immutably.
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R;

    /// Access the value mutably.
    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R;
}

/// State guarded by a critical-section mutex. Usable from a `static`.
pub struct CriticalSectionState<T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<T>>,
}

impl<T> CriticalSectionState<T> {
    /// Wraps `value`.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }
}

impl<T> SharedState<T> for CriticalSectionState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.lock(|cell| f(&cell.borrow()))
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}
