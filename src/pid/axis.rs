// src/pid/axis.rs

//! # Single-Axis PID Controller
//!
//! Wraps a `piddiy::PidController` with the parts of the control law that
//! need history: the first-order filtered derivative on set-point weighted
//! error, output scaling and offset, saturation and back-calculation
//! anti-windup.

use crate::config::PidConfig;
use crate::error::{Error, Result};
use crate::number::{Number, Real};
use crate::pid::compute::{compute_pid, PidControlData, PidForm};
use num_traits::Float;
use piddiy::PidController;

/// Running terms of one controller after its last update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidTerms<T> {
    /// Proportional term.
    pub p: T,
    /// Integral term, after anti-windup.
    pub i: T,
    /// Derivative term.
    pub d: T,
    /// Saturated output.
    pub output: T,
}

/// PID controller for one axis.
pub struct PidAxis<T: Real> {
    pid: PidController<T, PidControlData<T>>,
    config: PidConfig<T>,
    form: PidForm,
    tracking_time: T,
    terms: PidTerms<T>,
    previous_state: T,
    previous_reference: T,
}

impl<T: Real> PidAxis<T> {
    /// Creates a controller from a configuration. The configuration is
    /// expected to be validated by the caller.
    pub fn with_config(config: PidConfig<T>, form: PidForm) -> Self {
        let mut pid = PidController::new();
        pid.compute_fn(compute_pid)
            .set_point(T::zero())
            .kp(config.k)
            .ki(T::one())
            .kd(T::one());

        PidAxis {
            pid,
            config,
            form,
            tracking_time: config.tracking_time(),
            terms: PidTerms::default(),
            previous_state: T::zero(),
            previous_reference: T::zero(),
        }
    }

    /// Runs one control step of length `dt` and returns the saturated
    /// output. Non-finite inputs are rejected and the controller is left
    /// untouched.
    pub fn update(&mut self, state: T, reference: T, dt: T) -> Result<T> {
        if !(Float::is_finite(state) && Float::is_finite(reference)) {
            return Err(Error::NonFiniteInput("pid input"));
        }
        if !(Float::is_finite(dt) && dt > T::zero()) {
            return Err(Error::ImplausibleMagnitude("dt"));
        }
        let config = &self.config;

        let filter = config.td + config.n * dt;
        let derivative = if filter > T::zero() {
            let gain = self.form.derivative_gain(config.k, config.td, config.n);
            config.td / filter * self.terms.d
                + gain / filter
                    * (config.gamma * (reference - self.previous_reference)
                        - (state - self.previous_state))
        } else {
            T::zero()
        };

        let integral_gain = if config.integral_enabled {
            self.form.integral_gain(config.k, config.ti, dt)
        } else {
            T::zero()
        };

        let data = PidControlData {
            state,
            beta: config.beta,
            integral_gain,
            derivative,
        };
        self.pid.set_point(reference);
        let sum = self.pid.compute(data);

        let raw = (sum + config.offset) * config.scale;
        let output = Number::clamp(raw, config.lower, config.upper);

        // Back-calculation: bleed the saturation gap out of the integrator.
        if config.integral_enabled && self.tracking_time > T::zero() {
            self.pid.integral = self.pid.integral + dt / self.tracking_time * (output - raw);
        }

        self.terms = PidTerms {
            p: self.pid.kp * self.pid.error,
            i: self.pid.integral,
            d: derivative,
            output,
        };
        self.previous_state = state;
        self.previous_reference = reference;
        Ok(output)
    }

    /// Clears all running terms and history.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.terms = PidTerms::default();
        self.previous_state = T::zero();
        self.previous_reference = T::zero();
    }

    /// Terms of the last update.
    pub fn terms(&self) -> PidTerms<T> {
        self.terms
    }

    /// Configuration the controller was built from.
    pub fn config(&self) -> &PidConfig<T> {
        &self.config
    }

    /// Anti-windup tracking time in use.
    pub fn tracking_time(&self) -> T {
        self.tracking_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn proportional(k: f32, lower: f32, upper: f32) -> PidConfig<f32> {
        PidConfig {
            k,
            lower,
            upper,
            ..PidConfig::new()
        }
    }

    /// A large error drives the output exactly onto the limit.
    #[test]
    fn test_pid_axis_saturation() {
        let mut axis = PidAxis::with_config(proportional(1.0, -5.0, 5.0), PidForm::Classic);
        let output = axis.update(0.0, 1000.0, 0.004).unwrap();
        assert_eq!(5.0, output, "Output should saturate at exactly 5.");

        let output = axis.update(0.0, -1000.0, 0.004).unwrap();
        assert_eq!(-5.0, output, "Output should saturate at exactly -5.");
    }

    /// Held in saturation, the integrator settles instead of winding up.
    #[test]
    fn test_pid_axis_anti_windup_bounded() {
        let config = PidConfig {
            ti: 1.0,
            tt: Some(0.5),
            integral_enabled: true,
            ..proportional(1.0, -5.0, 5.0)
        };
        let mut axis = PidAxis::with_config(config, PidForm::Classic);

        let mut previous = 0.0;
        for step in 0..2_000 {
            let output = axis.update(0.0, 1000.0, 0.01).unwrap();
            assert_eq!(5.0, output);
            let integral = axis.terms().i;
            assert!(
                integral.abs() < 1000.0,
                "Integral {} unbounded at step {}",
                integral,
                step
            );
            previous = integral;
        }
        let _ = axis.update(0.0, 1000.0, 0.01).unwrap();
        assert!(
            (axis.terms().i - previous).abs() < 1e-2,
            "Integral should converge."
        );
    }

    /// Classic and parallel forms use different integral and derivative
    /// coefficients.
    #[test]
    fn test_pid_axis_forms() {
        let config = PidConfig {
            k: 2.0,
            ti: 4.0,
            td: 0.5,
            tt: Some(1.0),
            n: 10.0,
            integral_enabled: true,
            ..PidConfig::new()
        };

        let mut classic = PidAxis::with_config(config, PidForm::Classic);
        let output = classic.update(0.0, 1.0, 0.1).unwrap();
        let terms = classic.terms();
        assert!(value_close(2.0, terms.p));
        assert!(value_close(0.05, terms.i));
        assert!((terms.d - 10.0 / 1.5).abs() < 1e-4);
        assert!((output - (2.05 + 10.0 / 1.5)).abs() < 1e-4);

        let mut parallel = PidAxis::with_config(config, PidForm::Parallel);
        let output = parallel.update(0.0, 1.0, 0.1).unwrap();
        let terms = parallel.terms();
        assert!(value_close(0.4, terms.i));
        assert!((terms.d - 5.0 / 1.5).abs() < 1e-4);
        assert!((output - (2.4 + 5.0 / 1.5)).abs() < 1e-4);
    }

    /// With a steady reference and state the derivative decays.
    #[test]
    fn test_pid_axis_derivative_filter_decays() {
        let config = PidConfig {
            td: 0.5,
            n: 10.0,
            ..PidConfig::new()
        };
        let mut axis = PidAxis::with_config(config, PidForm::Classic);
        let _ = axis.update(0.0, 1.0, 0.1).unwrap();
        let first = axis.terms().d;
        let _ = axis.update(0.0, 1.0, 0.1).unwrap();
        let second = axis.terms().d;
        assert!((second - first / 3.0).abs() < 1e-4);
    }

    /// With Td = 0 and N = 0 the derivative term is zero, not NaN.
    #[test]
    fn test_pid_axis_zero_derivative_filter() {
        let config = PidConfig {
            n: 0.0,
            ..PidConfig::new()
        };
        let mut axis = PidAxis::with_config(config, PidForm::Classic);
        let output = axis.update(0.0, 3.0, 0.004).unwrap();
        assert_eq!(0.0, axis.terms().d);
        assert!(value_close(3.0, output));
    }

    #[test]
    fn test_pid_axis_integral_disabled() {
        let config = PidConfig {
            ti: 1.0,
            ..PidConfig::new()
        };
        let mut axis = PidAxis::with_config(config, PidForm::Classic);
        for _ in 0..100 {
            let _ = axis.update(0.0, 1.0, 0.01).unwrap();
        }
        assert_eq!(0.0, axis.terms().i);
    }

    /// Offset is added before scaling, as for the gravity-compensated
    /// altitude controller.
    #[test]
    fn test_pid_axis_offset_and_scale() {
        let mut axis = PidAxis::with_config(PidConfig::altitude(), PidForm::Classic);
        let output = axis.update(0.0, 0.0, 0.004).unwrap();
        assert!(value_close(-9.82 * 1.3, output));
    }

    #[test]
    fn test_pid_axis_rejects_non_finite_input() {
        let mut axis = PidAxis::with_config(PidConfig::<f32>::new(), PidForm::Classic);
        let _ = axis.update(0.5, 1.0, 0.004).unwrap();
        let before = axis.terms();
        assert_eq!(
            Err(Error::NonFiniteInput("pid input")),
            axis.update(f32::NAN, 1.0, 0.004)
        );
        assert_eq!(before, axis.terms());
    }

    #[test]
    fn test_pid_axis_reset() {
        let config = PidConfig {
            ti: 1.0,
            td: 0.2,
            tt: Some(0.5),
            integral_enabled: true,
            ..PidConfig::new()
        };
        let mut axis = PidAxis::with_config(config, PidForm::Classic);
        for _ in 0..10 {
            let _ = axis.update(0.0, 1.0, 0.01).unwrap();
        }
        axis.reset();
        assert_eq!(PidTerms::default(), axis.terms());
        assert_eq!(0.0, axis.pid.integral);
        assert_eq!(0.0, axis.pid.error);
        assert_eq!(0.0, axis.pid.derivative);

        // Behaves like a fresh controller afterwards.
        let mut fresh = PidAxis::with_config(config, PidForm::Classic);
        let expected = fresh.update(0.0, 1.0, 0.01).unwrap();
        assert_eq!(expected, axis.update(0.0, 1.0, 0.01).unwrap());
    }
}
