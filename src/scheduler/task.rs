// src/scheduler/task.rs

//! # Control Task
//!
//! Binds the tick scheduler and the control step to the outside world: the
//! sensor mailbox filled by the consumer task, a reference source and an
//! actuation sink. `poll` is timer agnostic; with the `embassy` feature,
//! `run` drives it from `embassy_time`.

use crate::config::FlightCoreConfig;
use crate::error::Result;
use crate::logging::log_warn;
use crate::number::Real;
use crate::pid::{ActuationCommand, ControlReferences};
use crate::scheduler::control_loop::ControlLoop;
use crate::scheduler::tick::TickScheduler;
use crate::sensor::SensorMailbox;
use crate::shared::SharedState;

/// Supplies the references for each control step, e.g. from the receiver.
pub trait ReferenceSource<T> {
    /// References for the current step.
    fn references(&mut self) -> ControlReferences<T>;
}

/// Consumes the actuation command of each control step, e.g. the motor
/// mixer.
pub trait ActuationSink<T> {
    /// Applies `command`.
    fn emit(&mut self, command: ActuationCommand<T>);
}

/// Periodic control task.
pub struct ControlTask<T: Real, R, A> {
    scheduler: TickScheduler,
    control: ControlLoop<T>,
    reference: R,
    sink: A,
    executed_ticks: u64,
    skipped_ticks: u64,
}

impl<T, R, A> ControlTask<T, R, A>
where
    T: Real,
    R: ReferenceSource<T>,
    A: ActuationSink<T>,
{
    /// Creates the task with its first deadline one period after `start_us`.
    pub fn new(config: FlightCoreConfig<T>, start_us: u64, reference: R, sink: A) -> Result<Self> {
        Ok(Self {
            scheduler: TickScheduler::new(config.control_period_us, start_us)?,
            control: ControlLoop::with_config(config)?,
            reference,
            sink,
            executed_ticks: 0,
            skipped_ticks: 0,
        })
    }

    /// Runs the control step if a tick is due at `now_us` and emits its
    /// command. Exactly one command is emitted per executed tick; when the
    /// controllers reject the step, the previous command is repeated.
    pub fn poll<S>(&mut self, now_us: u64, mailbox: &S) -> Option<ActuationCommand<T>>
    where
        S: SharedState<SensorMailbox<T>>,
    {
        let tick = self.scheduler.poll(now_us)?;
        if tick.skipped > 0 {
            log_warn!("control overrun: {} ticks skipped", tick.skipped);
            self.skipped_ticks += u64::from(tick.skipped);
        }

        let (rates, correction) =
            mailbox.with_mut(|mailbox| (mailbox.gyro_rates, mailbox.take_correction()));
        let references = self.reference.references();
        let command = match self.control.step(&tick, rates, correction, &references) {
            Ok(command) => command,
            Err(error) => {
                log_warn!("tick {}: holding last command: {:?}", tick.index, error);
                self.control.last_command()
            }
        };
        self.sink.emit(command);
        self.executed_ticks += 1;
        Some(command)
    }

    /// Drives the task from the embassy timer for the lifetime of the flight
    /// session.
    #[cfg(feature = "embassy")]
    pub async fn run<S>(&mut self, mailbox: &S) -> !
    where
        S: SharedState<SensorMailbox<T>>,
    {
        use embassy_time::{Instant, Timer};

        loop {
            Timer::at(Instant::from_micros(self.scheduler.next_deadline_us())).await;
            let _ = self.poll(Instant::now().as_micros(), mailbox);
        }
    }

    /// Next deadline, µs.
    pub fn next_deadline_us(&self) -> u64 {
        self.scheduler.next_deadline_us()
    }

    /// Number of ticks executed.
    pub fn executed_ticks(&self) -> u64 {
        self.executed_ticks
    }

    /// Number of ticks skipped because of overruns.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    /// Control state.
    pub fn control(&self) -> &ControlLoop<T> {
        &self.control
    }

    /// Mutable control state, for re-arm and failsafe handling.
    pub fn control_mut(&mut self) -> &mut ControlLoop<T> {
        &mut self.control
    }

    /// Actuation sink.
    pub fn sink(&self) -> &A {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::AngleMeasurement;
    use crate::shared::CriticalSectionState;
    use crate::test_utils::*;

    struct Hover {
        thrust: f32,
    }

    impl ReferenceSource<f32> for Hover {
        fn references(&mut self) -> ControlReferences<f32> {
            ControlReferences {
                thrust: self.thrust,
                ..Default::default()
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        commands: heapless::Vec<ActuationCommand<f32>, 16>,
    }

    impl ActuationSink<f32> for Recorder {
        fn emit(&mut self, command: ActuationCommand<f32>) {
            let _ = self.commands.push(command);
        }
    }

    fn task() -> ControlTask<f32, Hover, Recorder> {
        ControlTask::new(
            FlightCoreConfig::new(),
            0,
            Hover { thrust: 12.0 },
            Recorder::default(),
        )
        .unwrap()
    }

    /// One command per executed tick, none between deadlines.
    #[test]
    fn test_task_emits_once_per_tick() {
        let mut task = task();
        let mailbox = CriticalSectionState::new(SensorMailbox::default());

        assert_eq!(None, task.poll(3_999, &mailbox));
        assert!(task.poll(4_000, &mailbox).is_some());
        assert_eq!(None, task.poll(4_500, &mailbox));
        assert!(task.poll(8_000, &mailbox).is_some());

        assert_eq!(2, task.sink().commands.len());
        assert!(task.sink().commands.iter().all(|command| command.thrust == 12.0));
    }

    /// After an overrun the task runs once, reports the skip and integrates
    /// the full elapsed span.
    #[test]
    fn test_task_skips_backlog() {
        let mut task = task();
        let mailbox = CriticalSectionState::new(SensorMailbox::new((0.1, 0.0, 0.0)));

        assert!(task.poll(4_000, &mailbox).is_some());
        assert!(task.poll(20_000, &mailbox).is_some());
        assert_eq!(None, task.poll(20_000, &mailbox));

        assert_eq!(2, task.executed_ticks());
        assert_eq!(3, task.skipped_ticks());
        assert_eq!(2, task.sink().commands.len());
        // 5 periods of 4 ms at 0.1 rad/s.
        assert!(value_close(0.002, task.control().estimator().roll_angle()));
    }

    /// The pending correction is consumed exactly once.
    #[test]
    fn test_task_consumes_correction() {
        let mut task = task();
        let mailbox = CriticalSectionState::new(SensorMailbox::default());
        mailbox.with_mut(|mailbox| {
            mailbox.pending_correction = Some(AngleMeasurement::full(0.1, 0.0, 0.0))
        });

        let _ = task.poll(4_000, &mailbox).unwrap();
        assert_eq!(None, mailbox.with(|mailbox| mailbox.pending_correction));
        assert!(task.control().estimator().roll_angle() > 0.0);
    }

    /// Invalid references repeat the previous command.
    #[test]
    fn test_task_holds_command_on_invalid_references() {
        let mut task = task();
        let mailbox = CriticalSectionState::new(SensorMailbox::default());
        let first = task.poll(4_000, &mailbox).unwrap();

        task.reference.thrust = f32::NAN;
        let second = task.poll(8_000, &mailbox).unwrap();
        assert_eq!(first, second);
        assert_eq!(2, task.sink().commands.len());
    }
}
