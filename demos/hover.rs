// demos/hover.rs

//! Closed-loop hover simulation. A rigid body starts tilted with a biased
//! gyro; the sensor pipeline, estimator and PID bank bring it back to level.

use core::cell::RefCell;
use free_flight_core::config::{FlightCoreConfig, G_ACC, IXX, IYY, IZZ, MASS};
use free_flight_core::diagnostics::{DiagnosticSampler, EstimatorDiagnostics};
use free_flight_core::rotation::Matrix3;
use free_flight_core::scheduler::{ActuationSink, ControlTask, ReferenceSource};
use free_flight_core::sensor::{
    AccelMagSensor, GyroSensor, SensorEvent, SensorEventChannel, SensorEventConsumer,
    SensorMailbox, TiltCompensatedCompass,
};
use free_flight_core::shared::CriticalSectionState;
use free_flight_core::{ActuationCommand, ControlReferences, Result};

/// True state of the simulated vehicle.
struct Body {
    attitude: (f32, f32, f32),
    rates: (f32, f32, f32),
}

struct SimGyro<'a> {
    body: &'a RefCell<Body>,
    bias: (f32, f32, f32),
}

impl GyroSensor<f32> for SimGyro<'_> {
    fn read_rates(&mut self) -> Result<(f32, f32, f32)> {
        let (p, q, r) = self.body.borrow().rates;
        Ok((p + self.bias.0, q + self.bias.1, r + self.bias.2))
    }

    fn calibrate(&mut self) -> Result<()> {
        Ok(())
    }
}

struct SimAccelMag<'a> {
    body: &'a RefCell<Body>,
    field: (f32, f32, f32),
}

impl SimAccelMag<'_> {
    fn dcm(&self) -> Matrix3<f32> {
        let (roll, pitch, yaw) = self.body.borrow().attitude;
        Matrix3::from_euler(roll, pitch, yaw)
    }
}

impl AccelMagSensor<f32> for SimAccelMag<'_> {
    fn read_acceleration(&mut self) -> Result<(f32, f32, f32)> {
        Ok(self.dcm().mul_vector((0.0, 0.0, -G_ACC)))
    }

    fn read_magnetic_field(&mut self) -> Result<(f32, f32, f32)> {
        Ok(self.dcm().mul_vector(self.field))
    }

    fn calibrate(&mut self) -> Result<()> {
        Ok(())
    }
}

struct Hover;

impl ReferenceSource<f32> for Hover {
    fn references(&mut self) -> ControlReferences<f32> {
        ControlReferences {
            thrust: MASS * G_ACC,
            ..Default::default()
        }
    }
}

struct Motors<'a> {
    command: &'a RefCell<ActuationCommand<f32>>,
}

impl ActuationSink<f32> for Motors<'_> {
    fn emit(&mut self, command: ActuationCommand<f32>) {
        *self.command.borrow_mut() = command;
    }
}

fn main() -> Result<()> {
    let config = FlightCoreConfig::<f32>::new();
    let period_us = u64::from(config.control_period_us);
    let dt = config.control_period();

    let body = RefCell::new(Body {
        attitude: (0.2, -0.1, 0.5),
        rates: (0.0, 0.0, 0.0),
    });
    let command = RefCell::new(ActuationCommand::default());

    let channel = SensorEventChannel::new();
    let mailbox = CriticalSectionState::new(SensorMailbox::default());
    let mut consumer = SensorEventConsumer::new(
        SimGyro {
            body: &body,
            bias: (0.02, -0.01, 0.005),
        },
        SimAccelMag {
            body: &body,
            field: config.sensor.inertial_magnetic_field,
        },
        TiltCompensatedCompass {
            inertial_field: config.sensor.inertial_magnetic_field,
        },
        config.sensor,
    )?;
    let mut task = ControlTask::new(config, 0, Hover, Motors { command: &command })?;

    let mut sampler = DiagnosticSampler::new();
    sampler.start(0, 250_000, 3_000_000)?;

    for step in 1..=750_u64 {
        let now_us = step * period_us;

        // Interrupts: gyro at the control rate, accel/mag at a fifth of it.
        channel.post_from_isr(SensorEvent::GyroDataReady);
        if step % 5 == 0 {
            channel.post_from_isr(SensorEvent::AccelMagDataReady);
        }
        while let Some(event) = channel.try_receive() {
            if let Err(error) = consumer.handle(event, &mailbox) {
                println!("sensor event {:?}: {}", event, error);
            }
        }

        let _ = task.poll(now_us, &mailbox);

        // Rigid body response, small-angle kinematics.
        let moments = *command.borrow();
        {
            let mut body = body.borrow_mut();
            body.rates.0 += moments.roll_moment / IXX * dt;
            body.rates.1 += moments.pitch_moment / IYY * dt;
            body.rates.2 += moments.yaw_moment / IZZ * dt;
            let rates = body.rates;
            body.attitude.0 += rates.0 * dt;
            body.attitude.1 += rates.1 * dt;
            body.attitude.2 += rates.2 * dt;
        }

        if sampler.poll(now_us) {
            let (roll, pitch, yaw) = body.borrow().attitude;
            println!("t = {:.3} s", now_us as f32 / 1e6);
            println!(
                "    True Attitude:  {:-8.4}, {:-8.4}, {:-8.4}",
                roll, pitch, yaw
            );
            print!("{}", EstimatorDiagnostics::from(task.control().estimator()));
            print!("{}", task.control().pid().diagnostics());
            println!(
                "    Command:        {:-8.4}, {:-8.4}, {:-8.4}, {:-8.3}",
                moments.roll_moment, moments.pitch_moment, moments.yaw_moment, moments.thrust
            );
        }
    }

    println!(
        "executed {} ticks, skipped {}, dropped events {}",
        task.executed_ticks(),
        task.skipped_ticks(),
        channel.dropped_count()
    );
    Ok(())
}
