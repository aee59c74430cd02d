//! SRS channel, timing and noise estimation.
//!
//! One [`SrsChannelEstimator::estimate`] call processes one SRS occasion:
//! it accumulates the received pilots of every symbol, correlates them
//! against the known reference sequences to obtain per-subcarrier
//! least-squares estimates (LSEs), estimates and compensates the common
//! timing alignment, reduces each antenna pair to a wideband channel
//! coefficient, and derives noise variance, EPRE and RSRP from the
//! residual between the received and the reconstructed pilots.
//!
//! The call is synchronous and compute bound; every intermediate buffer is
//! pre-sized to the system maxima at construction, so steady-state
//! operation performs no allocation. The estimator keeps no state between
//! calls — two calls with the same configuration and grid contents return
//! the same result.
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use srs_estimator::config::{SrsEstimatorConfig, SrsResource};
//! use srs_estimator::resource_grid::ResourceGrid;
//! use srs_estimator::srs_estimator::SrsChannelEstimator;
//! use srs_estimator::srs_sequence::{sequence_info, LowPaprSequenceGenerator};
//!
//! let config = SrsEstimatorConfig {
//!     resource: SrsResource {
//!         nof_antenna_ports: 1,
//!         nof_symbols: 1,
//!         start_symbol: 13,
//!         comb_size: 2,
//!         comb_offset: 0,
//!         sequence_id: 0,
//!         cyclic_shift: 0,
//!         freq_shift: 0,
//!         nof_prb: 4,
//!     },
//!     numerology: 0,
//!     ports: vec![0],
//!     context: None,
//! };
//!
//! // Noiseless occasion: the grid carries exactly the reference pilot.
//! let info = sequence_info(&config.resource, 0);
//! let mut pilot = vec![Complex32::new(0.0, 0.0); info.sequence_length];
//! LowPaprSequenceGenerator::new().generate(
//!     &mut pilot,
//!     info.sequence_group,
//!     info.sequence_number,
//!     info.n_cs,
//!     info.n_cs_max,
//! );
//! let mut grid = ResourceGrid::new(1, 14, 48);
//! grid.map_comb(0, 13, info.mapping_initial_subcarrier, info.comb_size, &pilot);
//!
//! let mut estimator = SrsChannelEstimator::new();
//! let result = estimator.estimate(&grid, &config);
//! assert_eq!(result.channel_matrix.nof_rx_ports(), 1);
//! assert_eq!(result.channel_matrix.nof_tx_ports(), 1);
//! assert!(result.noise_variance < 1e-6);
//! ```

use crate::cexp_table::CexpTable;
use crate::channel_matrix::ChannelMatrix;
use crate::config::{
    self, SrsEstimatorConfig, MAX_NOF_RX_PORTS, MAX_NOF_TX_PORTS, MAX_SEQ_LENGTH,
};
use crate::csi_capture::{CsiObserver, CsiRecord};
use crate::resource_grid::ResourceGridReader;
use crate::srs_sequence::{sequence_info, LowPaprSequenceGenerator};
use crate::time_alignment::{IdftTaEstimator, TaEstimator, TimeAlignmentMeasurement};
use num_complex::Complex32;
use std::f32::consts::TAU;

/// Output of one estimation call.
#[derive(Debug, Clone)]
pub struct SrsEstimatorResult {
    /// Combined timing-alignment measurement.
    pub time_alignment: TimeAlignmentMeasurement,
    /// Wideband channel coefficients, normalized by the noise standard
    /// deviation so the squared Frobenius norm approximates linear SNR.
    pub channel_matrix: ChannelMatrix,
    /// Noise variance, linear and unnormalized.
    pub noise_variance: f32,
    /// Energy per resource element, in dB.
    pub epre_db: f32,
    /// Reference signal received power, in dB.
    pub rsrp_db: f32,
}

/// SRS-based uplink channel estimator.
///
/// See the [module-level documentation](self) for the processing chain.
pub struct SrsChannelEstimator {
    sequence_generator: LowPaprSequenceGenerator,
    cexp_table: CexpTable,
    ta_estimator: Box<dyn TaEstimator>,
    observer: Option<Box<dyn CsiObserver>>,
    /// Accumulated/correlated LSEs, subcarrier × rx port × antenna port.
    temp_lse: Vec<Complex32>,
    /// Generated reference pilots, subcarrier × antenna port.
    all_sequences: Vec<Complex32>,
    /// Raw accumulated energy for the noise residual, subcarrier ×
    /// interleave group × rx port.
    temp_noise: Vec<Complex32>,
    /// Rounded phase indices for the derotation lookup.
    temp_phase: Vec<i32>,
    /// Complex exponentials fetched from the table.
    temp_cexp: Vec<Complex32>,
    /// One symbol of received pilot samples.
    rx_sequence: Vec<Complex32>,
}

impl SrsChannelEstimator {
    /// Create an estimator with the default delay estimator and phase
    /// table, scratch sized for the largest supported occasion.
    pub fn new() -> Self {
        Self::with_ta_estimator(Box::new(IdftTaEstimator::new()))
    }

    /// Create an estimator with a custom delay estimator.
    pub fn with_ta_estimator(ta_estimator: Box<dyn TaEstimator>) -> Self {
        let zero = Complex32::new(0.0, 0.0);
        Self {
            sequence_generator: LowPaprSequenceGenerator::new(),
            cexp_table: CexpTable::default(),
            ta_estimator,
            observer: None,
            temp_lse: vec![zero; MAX_SEQ_LENGTH * MAX_NOF_RX_PORTS * MAX_NOF_TX_PORTS],
            all_sequences: vec![zero; MAX_SEQ_LENGTH * MAX_NOF_TX_PORTS],
            temp_noise: vec![zero; MAX_SEQ_LENGTH * 2 * MAX_NOF_RX_PORTS],
            temp_phase: vec![0; MAX_SEQ_LENGTH],
            temp_cexp: vec![zero; MAX_SEQ_LENGTH],
            rx_sequence: vec![zero; MAX_SEQ_LENGTH],
        }
    }

    /// Attach a diagnostic CSI observer. The observer sees the compensated
    /// per-subcarrier LSE of every antenna pair; it cannot influence the
    /// returned result.
    pub fn set_observer(&mut self, observer: Box<dyn CsiObserver>) {
        self.observer = Some(observer);
    }

    /// Detach the diagnostic observer, returning it.
    pub fn take_observer(&mut self) -> Option<Box<dyn CsiObserver>> {
        self.observer.take()
    }

    /// Estimate channel, timing alignment, noise and power metrics for one
    /// SRS occasion.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`config::validate`]; an invalid
    /// configuration at this point is a contract breach of the caller, not
    /// a recoverable condition.
    pub fn estimate(
        &mut self,
        grid: &dyn ResourceGridReader,
        config: &SrsEstimatorConfig,
    ) -> SrsEstimatorResult {
        if let Err(msg) = config::validate(config) {
            panic!("invalid SRS estimator configuration: {msg}");
        }

        let nof_rx_ports = config.ports.len();
        let nof_antenna_ports = config.resource.nof_antenna_ports;
        let nof_symbols = config.resource.nof_symbols;
        let start_symbol = config.resource.start_symbol;
        let comb_size = config.resource.comb_size;
        let scs_hz = config.subcarrier_spacing_hz();

        let common_info = sequence_info(&config.resource, 0);
        let sequence_length = common_info.sequence_length;

        // Maximum unambiguous delay given the cyclic-shift multiplexing.
        let max_ta = 1.0 / (common_info.n_cs_max as f64 * scs_hz * comb_size as f64);

        // Odd and even antenna ports occupy disjoint resource elements in
        // this configuration family, so the noise residual is tracked in
        // two groups instead of one.
        let interleaved_pilots =
            nof_antenna_ports == 4 && common_info.n_cs >= common_info.n_cs_max / 2;

        let mut time_alignment = TimeAlignmentMeasurement {
            time_alignment: 0.0,
            resolution: 0.0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        };
        let mut channel_matrix = ChannelMatrix::new(nof_rx_ports, nof_antenna_ports);

        for value in &mut self.temp_noise[..sequence_length * 2 * nof_rx_ports] {
            *value = Complex32::new(0.0, 0.0);
        }

        let mut epre = 0.0f32;

        // LSE accumulation: correlate the symbol-accumulated pilots of
        // every (rx port, antenna port) pair against the reference.
        for i_antenna_port in 0..nof_antenna_ports {
            let info = sequence_info(&config.resource, i_antenna_port);
            debug_assert_eq!(info.sequence_length, sequence_length);

            let sequence =
                &mut self.all_sequences[i_antenna_port * sequence_length..][..sequence_length];
            self.sequence_generator.generate(
                sequence,
                info.sequence_group,
                info.sequence_number,
                info.n_cs,
                info.n_cs_max,
            );

            for i_rx_port_index in 0..nof_rx_ports {
                let i_rx_port = config.ports[i_rx_port_index];
                let lse_offset = lse_offset(i_rx_port_index, i_antenna_port, nof_rx_ports)
                    * sequence_length;

                for i_symbol in start_symbol..start_symbol + nof_symbols {
                    grid.get(
                        &mut self.rx_sequence[..sequence_length],
                        i_rx_port,
                        i_symbol,
                        info.mapping_initial_subcarrier,
                        info.comb_size,
                    );

                    // The same pilots repeat on every symbol, so the raw
                    // energy is accumulated once per resource-element
                    // group for the later noise residual.
                    if contributes_to_noise(i_antenna_port, interleaved_pilots) {
                        let group = noise_group(i_antenna_port, interleaved_pilots);
                        let noise = noise_slice_mut(
                            &mut self.temp_noise,
                            group,
                            i_rx_port_index,
                            nof_rx_ports,
                            sequence_length,
                        );
                        for (acc, &rx) in noise.iter_mut().zip(&self.rx_sequence) {
                            *acc += rx;
                        }
                        epre += average_power(&self.rx_sequence[..sequence_length]);
                    }

                    // Copy on the first symbol, add afterwards; skips a
                    // zeroing pass over the scratch tensor.
                    let mean_lse = &mut self.temp_lse[lse_offset..][..sequence_length];
                    if i_symbol == start_symbol {
                        mean_lse.copy_from_slice(&self.rx_sequence[..sequence_length]);
                    } else {
                        for (acc, &rx) in mean_lse.iter_mut().zip(&self.rx_sequence) {
                            *acc += rx;
                        }
                    }
                }

                // Correlate against the reference to form the raw LSE.
                let sequence =
                    &self.all_sequences[i_antenna_port * sequence_length..][..sequence_length];
                let mean_lse = &mut self.temp_lse[lse_offset..][..sequence_length];
                for (lse, seq) in mean_lse.iter_mut().zip(sequence) {
                    *lse *= seq.conj();
                }
                if nof_symbols > 1 {
                    let scale = 1.0 / nof_symbols as f32;
                    for lse in mean_lse.iter_mut() {
                        *lse *= scale;
                    }
                }
            }

            // Delegate delay estimation on this antenna port's LSE set.
            // The LSEs still carry replicas of the other antenna ports
            // (they only cancel under subcarrier averaging), but the delay
            // estimator keeps to the peak nearest the origin, so the
            // measurement remains valid.
            let temp_lse = &self.temp_lse;
            let port_lse: Vec<&[Complex32]> = (0..nof_rx_ports)
                .map(|r| {
                    let offset =
                        lse_offset(r, i_antenna_port, nof_rx_ports) * sequence_length;
                    &temp_lse[offset..][..sequence_length]
                })
                .collect();
            let measurement =
                self.ta_estimator
                    .estimate(&port_lse, info.comb_size, scs_hz, max_ta);

            // Sum the centres, intersect the bounds, keep the coarsest
            // resolution. The sum is divided by the port count below.
            time_alignment.time_alignment += measurement.time_alignment;
            time_alignment.min = time_alignment.min.max(measurement.min);
            time_alignment.max = time_alignment.max.min(measurement.max);
            time_alignment.resolution = time_alignment.resolution.max(measurement.resolution);
        }

        time_alignment.time_alignment /= nof_antenna_ports as f64;

        let mut noise_var = 0.0f32;
        let mut rsrp = 0.0f32;

        // Phase compensation, coefficient extraction and noise residual.
        for i_rx_port in 0..nof_rx_ports {
            for i_antenna_port in 0..nof_antenna_ports {
                let info = sequence_info(&config.resource, i_antenna_port);
                let lse_offset =
                    lse_offset(i_rx_port, i_antenna_port, nof_rx_ports) * sequence_length;

                // Subcarrier-to-subcarrier phase slope of the estimated
                // delay, and the phase at the first mapped subcarrier.
                let phase_shift_subcarrier = (f64::from(TAU)
                    * time_alignment.time_alignment
                    * scs_hz
                    * comb_size as f64) as f32;
                let phase_shift_offset = phase_shift_subcarrier
                    * info.mapping_initial_subcarrier as f32
                    / comb_size as f32;

                compensate_phase_shift(
                    &self.cexp_table,
                    &mut self.temp_phase[..sequence_length],
                    &mut self.temp_cexp[..sequence_length],
                    &mut self.temp_lse[lse_offset..][..sequence_length],
                    phase_shift_subcarrier,
                    phase_shift_offset,
                );

                // Best-effort diagnostic tap; cannot alter the result.
                if let Some(observer) = self.observer.as_deref_mut() {
                    observer.record(&CsiRecord {
                        context: config.context.as_ref(),
                        rx_port: i_rx_port,
                        antenna_port: i_antenna_port,
                        start_symbol,
                        initial_subcarrier: info.mapping_initial_subcarrier,
                        comb_size: info.comb_size,
                        lse: &self.temp_lse[lse_offset..][..sequence_length],
                    });
                }

                let coefficient = mean(&self.temp_lse[lse_offset..][..sequence_length]);
                channel_matrix.set_coefficient(coefficient, i_rx_port, i_antenna_port);
                rsrp += coefficient.norm_sqr();

                let group = noise_group(i_antenna_port, interleaved_pilots);
                if contributes_to_noise(i_antenna_port, interleaved_pilots) {
                    // Keep the raw accumulation phase-aligned with the
                    // compensated estimate before subtracting.
                    let noise = noise_slice_mut(
                        &mut self.temp_noise,
                        group,
                        i_rx_port,
                        nof_rx_ports,
                        sequence_length,
                    );
                    compensate_phase_shift(
                        &self.cexp_table,
                        &mut self.temp_phase[..sequence_length],
                        &mut self.temp_cexp[..sequence_length],
                        noise,
                        phase_shift_subcarrier,
                        phase_shift_offset,
                    );
                }

                // Remove this port's reconstructed contribution from the
                // accumulated energy. The accumulator holds a sum over
                // symbols, so the reconstruction counts nof_symbols times.
                let sequence =
                    &self.all_sequences[i_antenna_port * sequence_length..][..sequence_length];
                let scale = coefficient * nof_symbols as f32;
                let noise = noise_slice_mut(
                    &mut self.temp_noise,
                    group,
                    i_rx_port,
                    nof_rx_ports,
                    sequence_length,
                );
                for (acc, seq) in noise.iter_mut().zip(sequence) {
                    *acc -= scale * *seq;
                }
            }

            let noise = noise_slice_mut(
                &mut self.temp_noise,
                0,
                i_rx_port,
                nof_rx_ports,
                sequence_length,
            );
            noise_var += average_power(noise) * noise.len() as f32;

            if interleaved_pilots {
                let noise = noise_slice_mut(
                    &mut self.temp_noise,
                    1,
                    i_rx_port,
                    nof_rx_ports,
                    sequence_length,
                );
                noise_var += average_power(noise) * noise.len() as f32;
            }
        }

        // Degrees-of-freedom correction: total samples minus the number of
        // independently estimated coefficients per residual group. With
        // interleaved pilots each group sees 2 estimates over twice the
        // samples.
        let nof_estimates = if interleaved_pilots { 2 } else { nof_antenna_ports };
        let correction_factor = if interleaved_pilots { 2 } else { 1 };
        noise_var /= ((nof_symbols * sequence_length - nof_estimates)
            * correction_factor
            * nof_rx_ports) as f32;

        // Normalize so the squared Frobenius norm approximates linear SNR,
        // flooring the divisor to keep the reportable SNR at or below
        // roughly 40 dB when the noise estimate collapses.
        let noise_std = noise_var.sqrt().max(rsrp.sqrt() * 0.01);
        channel_matrix.scale(1.0 / noise_std);

        epre /= (nof_symbols * correction_factor * nof_rx_ports) as f32;
        rsrp /= (nof_antenna_ports * nof_rx_ports) as f32;

        SrsEstimatorResult {
            time_alignment,
            channel_matrix,
            noise_variance: noise_var,
            epre_db: convert_power_to_db(epre),
            rsrp_db: convert_power_to_db(rsrp),
        }
    }
}

impl Default for SrsChannelEstimator {
    fn default() -> Self {
        Self::new()
    }
}

// --- Layout helpers ----------------------------------------------------------

/// Flat slot index of the (rx port, antenna port) LSE slice.
fn lse_offset(rx_port: usize, antenna_port: usize, nof_rx_ports: usize) -> usize {
    antenna_port * nof_rx_ports + rx_port
}

/// Whether `antenna_port`'s raw samples feed the noise accumulator.
fn contributes_to_noise(antenna_port: usize, interleaved_pilots: bool) -> bool {
    antenna_port == 0 || (interleaved_pilots && antenna_port == 1)
}

/// Interleave group of an antenna port: always 0 unless pilots interleave.
fn noise_group(antenna_port: usize, interleaved_pilots: bool) -> usize {
    if interleaved_pilots {
        antenna_port % 2
    } else {
        0
    }
}

fn noise_slice_mut<'a>(
    temp_noise: &'a mut [Complex32],
    group: usize,
    rx_port: usize,
    nof_rx_ports: usize,
    sequence_length: usize,
) -> &'a mut [Complex32] {
    let offset = (group * nof_rx_ports + rx_port) * sequence_length;
    &mut temp_noise[offset..][..sequence_length]
}

// --- Numeric helpers ---------------------------------------------------------

/// Derotate `lse` in place by `n * phase_shift_subcarrier +
/// phase_shift_offset`, via rounded lookups into the phase table.
fn compensate_phase_shift(
    table: &CexpTable,
    phase_indices: &mut [i32],
    cexp: &mut [Complex32],
    lse: &mut [Complex32],
    phase_shift_subcarrier: f32,
    phase_shift_offset: f32,
) {
    let table_size = table.size() as f32;
    for (n, index) in phase_indices.iter_mut().enumerate() {
        let phase = n as f32 * phase_shift_subcarrier + phase_shift_offset;
        *index = (table_size * phase / TAU).round() as i32;
    }
    table.generate(cexp, phase_indices);
    for (value, rotation) in lse.iter_mut().zip(cexp.iter()) {
        *value *= *rotation;
    }
}

/// Arithmetic mean of a complex slice.
fn mean(values: &[Complex32]) -> Complex32 {
    let sum: Complex32 = values.iter().sum();
    sum / values.len() as f32
}

/// Mean squared magnitude of a complex slice.
fn average_power(values: &[Complex32]) -> f32 {
    values.iter().map(|v| v.norm_sqr()).sum::<f32>() / values.len() as f32
}

/// Linear power to dB.
fn convert_power_to_db(power: f32) -> f32 {
    10.0 * power.log10()
}
