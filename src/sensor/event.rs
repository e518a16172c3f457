// src/sensor/event.rs

//! # Sensor Events
//!
//! Event tags and the bounded channel that carries them from interrupt
//! context to the consumer task.

use crate::error::Error;
use crate::logging::log_warn;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicU32, Ordering};

/// Capacity of the sensor event channel.
pub const SENSOR_QUEUE_CAPACITY: usize = 3;

/// Hardware event classified by an interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SensorEvent {
    /// A new gyro sample is ready.
    GyroDataReady = 0x0A,
    /// The gyro should be calibrated.
    GyroCalibrate = 0x0B,
    /// A new accelerometer/magnetometer sample is ready.
    AccelMagDataReady = 0x1A,
    /// The accelerometer/magnetometer should be calibrated.
    AccelMagCalibrate = 0x1B,
}

impl SensorEvent {
    /// One-byte wire code of the event.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SensorEvent {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x0A => Ok(SensorEvent::GyroDataReady),
            0x0B => Ok(SensorEvent::GyroCalibrate),
            0x1A => Ok(SensorEvent::AccelMagDataReady),
            0x1B => Ok(SensorEvent::AccelMagCalibrate),
            other => Err(Error::UnknownSensorEvent(other)),
        }
    }
}

/// Bounded, lossy, at-most-once channel of sensor events.
///
/// Posting never blocks: a full channel drops the newest event. Events that
/// were accepted are received exactly once, in FIFO order.
pub struct SensorEventChannel {
    channel: Channel<CriticalSectionRawMutex, SensorEvent, SENSOR_QUEUE_CAPACITY>,
    dropped: AtomicU32,
}

impl SensorEventChannel {
    /// Creates an empty channel. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueues `event` without blocking. Returns `false` if the channel was
    /// full and the event was dropped.
    pub fn post_from_isr(&self, event: SensorEvent) -> bool {
        if self.channel.try_send(event).is_ok() {
            return true;
        }
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        log_warn!("sensor event dropped, {} total", dropped);
        false
    }

    /// Waits for the next event.
    pub async fn receive(&self) -> SensorEvent {
        self.channel.receive().await
    }

    /// Takes the next event if one is queued.
    pub fn try_receive(&self) -> Option<SensorEvent> {
        self.channel.try_receive().ok()
    }

    /// Number of events dropped because the channel was full.
    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for SensorEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    /// Four posts into a channel of three: the fourth is dropped and the
    /// first three come out in order.
    #[test]
    fn test_channel_drops_newest_when_full() {
        let channel = SensorEventChannel::new();
        let events = [
            SensorEvent::GyroDataReady,
            SensorEvent::AccelMagDataReady,
            SensorEvent::GyroCalibrate,
            SensorEvent::AccelMagCalibrate,
        ];
        let accepted: [bool; 4] = events.map(|event| channel.post_from_isr(event));
        assert_eq!([true, true, true, false], accepted);
        assert_eq!(1, channel.dropped_count());

        for expected in &events[..3] {
            assert_eq!(*expected, block_on(channel.receive()));
        }
        assert_eq!(None, channel.try_receive());
    }

    /// Once drained, the channel accepts events again.
    #[test]
    fn test_channel_recovers_after_drain() {
        let channel = SensorEventChannel::new();
        for _ in 0..5 {
            channel.post_from_isr(SensorEvent::GyroDataReady);
        }
        assert_eq!(2, channel.dropped_count());
        while channel.try_receive().is_some() {}

        assert!(channel.post_from_isr(SensorEvent::AccelMagDataReady));
        assert_eq!(Some(SensorEvent::AccelMagDataReady), channel.try_receive());
    }

    #[test]
    fn test_event_wire_codes() {
        for event in [
            SensorEvent::GyroDataReady,
            SensorEvent::GyroCalibrate,
            SensorEvent::AccelMagDataReady,
            SensorEvent::AccelMagCalibrate,
        ] {
            assert_eq!(Ok(event), SensorEvent::try_from(event.code()));
        }
        assert_eq!(0x1A, SensorEvent::AccelMagDataReady.code());
        assert_eq!(
            Err(Error::UnknownSensorEvent(0x2A)),
            SensorEvent::try_from(0x2A)
        );
    }
}
