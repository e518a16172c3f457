// src/diagnostics.rs

//! # Diagnostics
//!
//! Snapshots of the estimator and the PID bank for the console, printable as
//! text or packed as a little-endian `f32` frame, and a sampling session that
//! decides when to take them. Sessions end on their own after the configured
//! duration or when stopped.

use crate::error::{Error, Result};
use crate::estimator::{AttitudeEstimator, KalmanState};
use crate::logging::log_info;
use crate::number::Real;
use crate::pid::PidTerms;
use core::fmt::{self, Write};
use heapless::Vec;

/// Frame tag of an estimator snapshot.
pub const ESTIMATOR_FRAME_TAG: u8 = b'E';
/// Frame tag of a PID snapshot.
pub const PID_FRAME_TAG: u8 = b'P';

/// Output format of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Serialization {
    /// One human-readable line per axis.
    #[default]
    Ascii,
    /// Tag byte followed by little-endian `f32` values.
    Binary,
}

/// A snapshot that can be written in either serialization.
pub trait DiagnosticRecord: fmt::Display {
    /// Tag byte opening the binary frame.
    const TAG: u8;

    /// Calls `f` with every value of the binary frame, in order.
    fn for_each_value(&self, f: &mut dyn FnMut(f32));

    /// Writes the record into `out` using `serialization`.
    fn serialize<const N: usize>(&self, serialization: Serialization, out: &mut Vec<u8, N>) -> Result<()> {
        match serialization {
            Serialization::Ascii => {
                write!(VecWriter(out), "{}", self).map_err(|_| Error::BufferOverflow)
            }
            Serialization::Binary => {
                out.push(Self::TAG).map_err(|_| Error::BufferOverflow)?;
                let mut overflow = false;
                self.for_each_value(&mut |value| {
                    overflow |= out.extend_from_slice(&value.to_le_bytes()).is_err();
                });
                if overflow {
                    Err(Error::BufferOverflow)
                } else {
                    Ok(())
                }
            }
        }
    }
}

struct VecWriter<'a, const N: usize>(&'a mut Vec<u8, N>);

impl<const N: usize> Write for VecWriter<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

fn to_f32<T: Real>(value: T) -> f32 {
    value.to_f32().unwrap_or(f32::NAN)
}

/// Filter state of one estimator axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisDiagnostics<T> {
    /// Angle, rad.
    pub angle: T,
    /// Bias-corrected rate, rad/s.
    pub angle_rate: T,
    /// Rate bias, rad/s.
    pub angle_rate_bias: T,
    /// Covariance `[p11, p12, p21, p22]`.
    pub covariance: [T; 4],
    /// Gains of the last correction.
    pub k1: T,
    /// Gains of the last correction.
    pub k2: T,
}

impl<T: Real> From<&KalmanState<T>> for AxisDiagnostics<T> {
    fn from(kalman: &KalmanState<T>) -> Self {
        Self {
            angle: kalman.angle,
            angle_rate: kalman.rate,
            angle_rate_bias: kalman.bias,
            covariance: [kalman.p11, kalman.p12, kalman.p21, kalman.p22],
            k1: kalman.k1,
            k2: kalman.k2,
        }
    }
}

impl<T: Real> AxisDiagnostics<T> {
    fn values(&self) -> [T; 9] {
        let [p11, p12, p21, p22] = self.covariance;
        [
            self.angle,
            self.angle_rate,
            self.angle_rate_bias,
            p11,
            p12,
            p21,
            p22,
            self.k1,
            self.k2,
        ]
    }
}

/// Estimator snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EstimatorDiagnostics<T> {
    /// Roll axis.
    pub roll: AxisDiagnostics<T>,
    /// Pitch axis.
    pub pitch: AxisDiagnostics<T>,
    /// Yaw axis.
    pub yaw: AxisDiagnostics<T>,
}

impl<T: Real> From<&AttitudeEstimator<T>> for EstimatorDiagnostics<T> {
    fn from(estimator: &AttitudeEstimator<T>) -> Self {
        Self {
            roll: (&estimator.roll).into(),
            pitch: (&estimator.pitch).into(),
            yaw: (&estimator.yaw).into(),
        }
    }
}

impl<T: Real> fmt::Display for EstimatorDiagnostics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, axis) in [("roll", &self.roll), ("pitch", &self.pitch), ("yaw", &self.yaw)] {
            let [p11, p12, p21, p22] = axis.covariance;
            writeln!(
                f,
                "{}: angle={:.4} rate={:.4} bias={:.4} k1={:.4} k2={:.4} P=[{:.6} {:.6}; {:.6} {:.6}]",
                name, axis.angle, axis.angle_rate, axis.angle_rate_bias, axis.k1, axis.k2, p11, p12, p21, p22
            )?;
        }
        Ok(())
    }
}

impl<T: Real> DiagnosticRecord for EstimatorDiagnostics<T> {
    const TAG: u8 = ESTIMATOR_FRAME_TAG;

    fn for_each_value(&self, f: &mut dyn FnMut(f32)) {
        for axis in [&self.roll, &self.pitch, &self.yaw] {
            axis.values().into_iter().for_each(|value| f(to_f32(value)));
        }
    }
}

/// PID bank snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidDiagnostics<T> {
    /// Roll controller.
    pub roll: PidTerms<T>,
    /// Pitch controller.
    pub pitch: PidTerms<T>,
    /// Yaw controller.
    pub yaw: PidTerms<T>,
    /// Altitude controller.
    pub altitude: PidTerms<T>,
}

impl<T: Real> fmt::Display for PidDiagnostics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let controllers = [
            ("roll", &self.roll),
            ("pitch", &self.pitch),
            ("yaw", &self.yaw),
            ("altitude", &self.altitude),
        ];
        for (name, terms) in controllers {
            writeln!(
                f,
                "{}: P={:.4} I={:.4} D={:.4} u={:.4}",
                name, terms.p, terms.i, terms.d, terms.output
            )?;
        }
        Ok(())
    }
}

impl<T: Real> DiagnosticRecord for PidDiagnostics<T> {
    const TAG: u8 = PID_FRAME_TAG;

    fn for_each_value(&self, f: &mut dyn FnMut(f32)) {
        for terms in [&self.roll, &self.pitch, &self.yaw, &self.altitude] {
            for value in [terms.p, terms.i, terms.d, terms.output] {
                f(to_f32(value));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SamplingSession {
    period_us: u64,
    next_sample_us: u64,
    end_us: u64,
}

/// Periodic diagnostic sampling session.
///
/// Example Usage
/// ```
/// use free_flight_core::diagnostics::DiagnosticSampler;
///
/// let mut sampler = DiagnosticSampler::new();
/// // Sample every 100 ms for one second.
/// sampler.start(0, 100_000, 1_000_000).unwrap();
///
/// let samples = (0..2_000_000).step_by(1_000).filter(|now| sampler.poll(*now)).count();
/// assert_eq!(9, samples);
/// assert!(!sampler.is_active());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticSampler {
    session: Option<SamplingSession>,
    serialization: Serialization,
}

impl DiagnosticSampler {
    /// Creates an idle sampler printing ASCII.
    pub const fn new() -> Self {
        Self {
            session: None,
            serialization: Serialization::Ascii,
        }
    }

    /// Starts a session at `now_us` taking one sample every `period_us`
    /// until `duration_us` has elapsed.
    pub fn start(&mut self, now_us: u64, period_us: u32, duration_us: u64) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::SamplingActive);
        }
        if period_us == 0 {
            return Err(Error::InvalidConfig("sample period"));
        }
        let period_us = u64::from(period_us);
        self.session = Some(SamplingSession {
            period_us,
            next_sample_us: now_us.saturating_add(period_us),
            end_us: now_us.saturating_add(duration_us),
        });
        log_info!("diagnostic sampling started");
        Ok(())
    }

    /// Stops the session. Returns `false` if none was active.
    pub fn stop(&mut self) -> bool {
        let was_active = self.session.take().is_some();
        if was_active {
            log_info!("diagnostic sampling stopped");
        }
        was_active
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Returns `true` if a sample is due at `now_us`. Ends the session once
    /// its duration has elapsed. Missed samples are not caught up.
    pub fn poll(&mut self, now_us: u64) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if now_us >= session.end_us {
            self.stop();
            return false;
        }
        if now_us < session.next_sample_us {
            return false;
        }
        let late = (now_us - session.next_sample_us) / session.period_us;
        session.next_sample_us += (late + 1) * session.period_us;
        true
    }

    /// Serializes `record` into `out` if a sample is due. Returns whether a
    /// sample was written.
    pub fn sample<R, const N: usize>(&mut self, now_us: u64, record: &R, out: &mut Vec<u8, N>) -> Result<bool>
    where
        R: DiagnosticRecord,
    {
        if !self.poll(now_us) {
            return Ok(false);
        }
        record.serialize(self.serialization, out)?;
        Ok(true)
    }

    /// Selects the output format of subsequent samples.
    pub fn set_serialization(&mut self, serialization: Serialization) {
        self.serialization = serialization;
    }

    /// Output format of samples.
    pub fn serialization(&self) -> Serialization {
        self.serialization
    }
}
