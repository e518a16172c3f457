// src/scheduler/tick.rs

//! # Tick Scheduler
//!
//! Deadline bookkeeping in microseconds, independent of any timer. Missed
//! ticks are never caught up: a late poll executes one tick for the latest
//! due deadline and reports how many were skipped.

use crate::error::{Error, Result};

/// One executed control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// Index of the tick, counting skipped ones.
    pub index: u64,
    /// Deadline the tick was scheduled for, µs.
    pub deadline_us: u64,
    /// Number of ticks skipped before this one.
    pub skipped: u32,
}

impl Tick {
    /// Number of control periods this tick stands for.
    pub fn periods(&self) -> u32 {
        self.skipped.saturating_add(1)
    }
}

/// Fixed-period deadline tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickScheduler {
    period_us: u64,
    next_deadline_us: u64,
    next_index: u64,
}

impl TickScheduler {
    /// Creates a scheduler whose first deadline is one period after
    /// `start_us`.
    pub fn new(period_us: u32, start_us: u64) -> Result<Self> {
        if period_us == 0 {
            return Err(Error::InvalidConfig("control_period_us"));
        }
        Ok(Self {
            period_us: u64::from(period_us),
            next_deadline_us: start_us.saturating_add(u64::from(period_us)),
            next_index: 0,
        })
    }

    /// Returns the tick due at `now_us`, if any, and advances the deadline to
    /// the first one strictly after `now_us`.
    pub fn poll(&mut self, now_us: u64) -> Option<Tick> {
        if now_us < self.next_deadline_us {
            return None;
        }
        let late_periods = (now_us - self.next_deadline_us) / self.period_us;
        let tick = Tick {
            index: self.next_index + late_periods,
            deadline_us: self.next_deadline_us + late_periods * self.period_us,
            skipped: u32::try_from(late_periods).unwrap_or(u32::MAX),
        };
        self.next_index = tick.index + 1;
        self.next_deadline_us = tick.deadline_us + self.period_us;
        Some(tick)
    }

    /// Next deadline, µs.
    pub fn next_deadline_us(&self) -> u64 {
        self.next_deadline_us
    }

    /// Control period, µs.
    pub fn period_us(&self) -> u64 {
        self.period_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_waits_for_deadline() {
        let mut scheduler = TickScheduler::new(4_000, 1_000).unwrap();
        assert_eq!(None, scheduler.poll(4_999));
        let tick = scheduler.poll(5_000).unwrap();
        assert_eq!(
            Tick {
                index: 0,
                deadline_us: 5_000,
                skipped: 0
            },
            tick
        );
        assert_eq!(9_000, scheduler.next_deadline_us());
    }

    /// A late poll runs once for the latest due tick and never replays the
    /// backlog.
    #[test]
    fn test_tick_skips_missed_deadlines() {
        let mut scheduler = TickScheduler::new(4_000, 0).unwrap();
        let _ = scheduler.poll(4_000).unwrap();

        // Deadlines 8, 12, 16 and 20 ms have passed at 22 ms.
        let tick = scheduler.poll(22_000).unwrap();
        assert_eq!(4, tick.index);
        assert_eq!(20_000, tick.deadline_us);
        assert_eq!(3, tick.skipped);
        assert_eq!(4, tick.periods());

        assert_eq!(None, scheduler.poll(22_000));
        assert_eq!(None, scheduler.poll(23_999));
        assert_eq!(24_000, scheduler.next_deadline_us());
        assert_eq!(5, scheduler.poll(24_000).unwrap().index);
    }

    #[test]
    fn test_tick_rejects_zero_period() {
        assert_eq!(
            Err(Error::InvalidConfig("control_period_us")),
            TickScheduler::new(0, 0)
        );
    }
}
