// src/pid/compute.rs

//! # PID Compute Callback
//!
//! The callback handed to `piddiy::PidController`. The controller is built
//! with `kp = K`, `ki = 1` and `kd = 1`, so its output is
//! `K * error + I + D` where `error` is the set-point weighted error, `I` the
//! accumulated integral term and `D` the filtered derivative term computed by
//! the caller.

use crate::Number;
use piddiy::PidController;

/// Algebraic form of the integral and derivative terms, selected once per
/// deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PidForm {
    /// `u = K*e + K/Ti*∫e + K*Td*de/dt`.
    #[default]
    Classic,
    /// `u = K*e + Ti*∫e + Td*de/dt`.
    Parallel,
}

impl PidForm {
    /// Per-step integral coefficient. Zero when the classic form has no
    /// positive integration time.
    pub fn integral_gain<T: Number>(self, k: T, ti: T, dt: T) -> T {
        match self {
            PidForm::Classic if ti > T::zero() => k * dt / ti,
            PidForm::Classic => T::zero(),
            PidForm::Parallel => ti * dt,
        }
    }

    /// Numerator of the derivative filter gain.
    pub fn derivative_gain<T: Number>(self, k: T, td: T, n: T) -> T {
        match self {
            PidForm::Classic => k * td * n,
            PidForm::Parallel => td * n,
        }
    }
}

/// Control data for the PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidControlData<T> {
    /// The controlled state, e.g. an estimated angle.
    pub state: T,
    /// Set-point weight of the proportional term.
    pub beta: T,
    /// Integral increment per unit error for this step. Zero disables
    /// integral action.
    pub integral_gain: T,
    /// Filtered derivative term for this step.
    pub derivative: T,
}

/// PID compute callback.
pub fn compute_pid<T: Number>(
    pid: &mut PidController<T, PidControlData<T>>,
    data: PidControlData<T>,
) -> (T, T, T) {
    let error = data.beta * pid.set_point - data.state;
    let integral = pid.integral + data.integral_gain * (pid.set_point - data.state);

    (error, integral, data.derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn controller(set_point: f32, k: f32) -> PidController<f32, PidControlData<f32>> {
        let mut pid = PidController::new();
        pid.compute_fn(compute_pid)
            .set_point(set_point)
            .kp(k)
            .ki(1.0)
            .kd(1.0);
        pid
    }

    /// Output is the sum of the weighted proportional, integral and
    /// derivative terms.
    #[test]
    fn test_pid_compute_response() {
        let mut pid = controller(10.0, 2.0);
        let data = PidControlData {
            state: 4.0,
            beta: 1.0,
            integral_gain: 0.5,
            derivative: 1.5,
        };

        let (error, integral, derivative) = compute_pid(&mut pid, data);
        let output = pid.compute(data);

        assert!(value_close(6.0, error), "Error should be 6.");
        assert!(value_close(3.0, integral), "Integral should be 3.");
        assert!(value_close(1.5, derivative), "Derivative is passed through.");
        assert!(
            value_close(16.5, output),
            "Output should be K*error + I + D."
        );

        // The integral keeps accumulating on the stored value.
        let (_, integral, _) = compute_pid(&mut pid, data);
        assert!(value_close(6.0, integral), "Integral should accumulate to 6.");
    }

    /// Beta weights only the proportional error, never the integral.
    #[test]
    fn test_pid_compute_set_point_weighting() {
        let mut pid = controller(2.0, 1.0);
        let data = PidControlData {
            state: 0.0,
            beta: 0.5,
            integral_gain: 1.0,
            derivative: 0.0,
        };
        let (error, integral, _) = compute_pid(&mut pid, data);
        assert!(value_close(1.0, error));
        assert!(value_close(2.0, integral));
    }

    /// A zero integral gain holds the integral term.
    #[test]
    fn test_pid_compute_integral_disabled() {
        let mut pid = controller(10.0, 1.0);
        let data = PidControlData {
            state: 0.0,
            beta: 1.0,
            integral_gain: 0.0,
            derivative: 0.0,
        };
        for _ in 0..10 {
            let _ = pid.compute(data);
        }
        assert!(value_close(0.0, pid.integral));
        assert!(value_close(10.0, pid.compute(data)));
    }

    #[test]
    fn test_pid_form_coefficients() {
        assert!(value_close(0.05, PidForm::Classic.integral_gain(2.0, 4.0, 0.1)));
        assert!(value_close(0.0, PidForm::Classic.integral_gain(2.0, 0.0, 0.1)));
        assert!(value_close(0.4, PidForm::Parallel.integral_gain(2.0, 4.0, 0.1)));
        assert!(value_close(10.0, PidForm::Classic.derivative_gain(2.0, 0.5, 10.0)));
        assert!(value_close(5.0, PidForm::Parallel.derivative_gain(2.0, 0.5, 10.0)));
    }
}
