//! Time-alignment (round-trip delay) estimation from frequency-domain LSEs.
//!
//! A propagation delay `t` turns into a linear phase ramp across the pilot
//! subcarriers, `exp(-j 2π n Δf_comb t)` with `Δf_comb` the comb tone
//! spacing. [`IdftTaEstimator`] recovers `t` by transforming the LSE of
//! each receive port into an oversampled impulse response, combining the
//! port power profiles non-coherently, and picking the strongest bin
//! inside the unambiguous window. Cyclic-shift multiplexing leaves replicas
//! of the other antenna ports in the profile; they land at multiples of
//! the maximum unambiguous delay, which is why the search is restricted to
//! the peak closest to the origin.
//!
//! The estimate is reported at bin granularity; the bin period is exposed
//! as the measurement resolution. The estimator sits behind the
//! [`TaEstimator`] trait so a platform can substitute its own delay
//! estimator without touching the SRS core.
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use srs_estimator::time_alignment::{IdftTaEstimator, TaEstimator};
//!
//! let scs_hz = 15e3;
//! let comb = 2;
//! let max_ta = 1.0 / (8.0 * scs_hz * comb as f64);
//! let delay = 0.8e-6;
//!
//! // LSE of a single receive port: pure delay, unit gain.
//! let lse: Vec<Complex32> = (0..48)
//!     .map(|n| {
//!         let phase = -std::f64::consts::TAU * n as f64 * scs_hz * comb as f64 * delay;
//!         Complex32::new(phase.cos() as f32, phase.sin() as f32)
//!     })
//!     .collect();
//!
//! let mut estimator = IdftTaEstimator::new();
//! let measurement = estimator.estimate(&[&lse], comb, scs_hz, max_ta);
//! assert!((measurement.time_alignment - delay).abs() < measurement.resolution);
//! ```

use num_complex::Complex32;
use rustfft::FftPlanner;

/// Impulse-response oversampling factor of the default estimator.
const OVERSAMPLING: usize = 8;

/// One time-alignment measurement.
///
/// `min` and `max` bound the measurable delay range, `resolution` is the
/// estimator's grid step. All values are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAlignmentMeasurement {
    /// Estimated delay.
    pub time_alignment: f64,
    /// Step of the underlying delay grid.
    pub resolution: f64,
    /// Lower bound of the measurable range.
    pub min: f64,
    /// Upper bound of the measurable range.
    pub max: f64,
}

/// Delay estimation over a collection of per-receive-port LSEs.
pub trait TaEstimator {
    /// Estimate the common delay of `port_lse` (one LSE slice per receive
    /// port, all of equal length).
    ///
    /// `max_ta` is the maximum unambiguous delay implied by the
    /// cyclic-shift multiplexing; the estimate is confined to
    /// `[-max_ta/2, max_ta/2]`.
    fn estimate(
        &mut self,
        port_lse: &[&[Complex32]],
        comb_size: usize,
        scs_hz: f64,
        max_ta: f64,
    ) -> TimeAlignmentMeasurement;
}

/// Default delay estimator: oversampled IDFT peak search.
pub struct IdftTaEstimator {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex32>,
    power: Vec<f32>,
}

impl IdftTaEstimator {
    /// Create an estimator. Transform plans are cached per size.
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
            power: Vec::new(),
        }
    }
}

impl Default for IdftTaEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaEstimator for IdftTaEstimator {
    fn estimate(
        &mut self,
        port_lse: &[&[Complex32]],
        comb_size: usize,
        scs_hz: f64,
        max_ta: f64,
    ) -> TimeAlignmentMeasurement {
        assert!(!port_lse.is_empty(), "at least one receive port is required");
        let sequence_length = port_lse[0].len();
        assert!(sequence_length > 0, "empty LSE");

        let dft_size = (sequence_length * OVERSAMPLING).next_power_of_two();
        let idft = self.planner.plan_fft_inverse(dft_size);

        // Non-coherent combination of the per-port impulse responses.
        self.power.clear();
        self.power.resize(dft_size, 0.0);
        self.buffer.resize(dft_size, Complex32::new(0.0, 0.0));
        for lse in port_lse {
            debug_assert_eq!(lse.len(), sequence_length);
            self.buffer.fill(Complex32::new(0.0, 0.0));
            self.buffer[..sequence_length].copy_from_slice(lse);
            idft.process(&mut self.buffer);
            for (acc, sample) in self.power.iter_mut().zip(&self.buffer) {
                *acc += sample.norm_sqr();
            }
        }

        // A delay t maps to bin t * dft_size * scs * comb; the upper half
        // of the transform holds negative delays.
        let bin_period = 1.0 / (dft_size as f64 * scs_hz * comb_size as f64);
        let half_window =
            (((max_ta / 2.0) / bin_period).floor() as usize).min(dft_size / 2 - 1);

        let mut best_bin: i64 = 0;
        let mut best_power = self.power[0];
        for offset in 1..=half_window {
            if self.power[offset] > best_power {
                best_power = self.power[offset];
                best_bin = offset as i64;
            }
            let negative = dft_size - offset;
            if self.power[negative] > best_power {
                best_power = self.power[negative];
                best_bin = -(offset as i64);
            }
        }

        TimeAlignmentMeasurement {
            time_alignment: best_bin as f64 * bin_period,
            resolution: bin_period,
            min: -max_ta / 2.0,
            max: max_ta / 2.0,
        }
    }
}
