//! SRS sequence parameters and low-PAPR pilot generation.
//!
//! Two concerns live here. [`sequence_info`] derives, for one transmit
//! antenna port, everything the estimator needs to know about the pilot it
//! must correlate against: sequence length, cyclic shift, comb mapping and
//! the first occupied subcarrier. [`LowPaprSequenceGenerator`] produces the
//! pilot itself: a unit-modulus Zadoff-Chu base sequence rotated by the
//! cyclic-shift phase ramp.
//!
//! Antenna ports share one base sequence and are separated in the code
//! domain by equally spaced cyclic shifts. One configuration family is
//! special: with four antenna ports and a base cyclic shift in the upper
//! half of its range, the odd-indexed ports move to a comb offset shifted
//! by half the comb size, so odd and even ports occupy disjoint resource
//! elements ("interleaved pilots").
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use srs_estimator::config::SrsResource;
//! use srs_estimator::srs_sequence::{sequence_info, LowPaprSequenceGenerator};
//!
//! let resource = SrsResource {
//!     nof_antenna_ports: 2,
//!     nof_symbols: 1,
//!     start_symbol: 0,
//!     comb_size: 2,
//!     comb_offset: 0,
//!     sequence_id: 5,
//!     cyclic_shift: 0,
//!     freq_shift: 0,
//!     nof_prb: 4,
//! };
//!
//! let info = sequence_info(&resource, 1);
//! assert_eq!(info.sequence_length, 24);
//! // Port 1 of 2 sits half the cyclic-shift range away from port 0.
//! assert_eq!(info.n_cs, 4);
//!
//! let generator = LowPaprSequenceGenerator::new();
//! let mut pilot = vec![Complex32::new(0.0, 0.0); info.sequence_length];
//! generator.generate(
//!     &mut pilot,
//!     info.sequence_group,
//!     info.sequence_number,
//!     info.n_cs,
//!     info.n_cs_max,
//! );
//! // Low-PAPR: every pilot sample has unit modulus.
//! for p in &pilot {
//!     assert!((p.norm() - 1.0).abs() < 1e-5);
//! }
//! ```

use crate::config::{n_cs_max_for_comb, SrsResource};
use num_complex::Complex32;
use std::f64::consts::PI;

/// Number of base sequence groups.
const NOF_SEQUENCE_GROUPS: u16 = 30;

/// Derived pilot parameters for one transmit antenna port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrsSequenceInfo {
    /// Number of pilot subcarriers; identical for every port of a resource.
    pub sequence_length: usize,
    /// Base sequence group `u`.
    pub sequence_group: u32,
    /// Base sequence number `v` within the group.
    pub sequence_number: u32,
    /// Cyclic shift of this port.
    pub n_cs: usize,
    /// Cyclic-shift modulus for the configured comb size.
    pub n_cs_max: usize,
    /// Transmission comb size.
    pub comb_size: usize,
    /// First subcarrier of the comb pattern, absolute within the grid.
    pub mapping_initial_subcarrier: usize,
}

/// Derive the sequence parameters of `antenna_port` for one SRS resource.
pub fn sequence_info(resource: &SrsResource, antenna_port: usize) -> SrsSequenceInfo {
    let comb_size = resource.comb_size;
    let n_cs_max = n_cs_max_for_comb(comb_size);
    let nof_ports = resource.nof_antenna_ports;

    let n_cs = (resource.cyclic_shift + n_cs_max * antenna_port / nof_ports) % n_cs_max;

    // With 4 ports and a base shift in the upper half of the range, odd
    // ports move to the complementary comb offset.
    let mut comb_offset = resource.comb_offset;
    if nof_ports == 4 && resource.cyclic_shift >= n_cs_max / 2 && antenna_port % 2 == 1 {
        comb_offset = (comb_offset + comb_size / 2) % comb_size;
    }

    SrsSequenceInfo {
        sequence_length: resource.sequence_length(),
        sequence_group: u32::from(resource.sequence_id % NOF_SEQUENCE_GROUPS),
        sequence_number: 0,
        n_cs,
        n_cs_max,
        comb_size,
        mapping_initial_subcarrier: 12 * resource.freq_shift + comb_offset,
    }
}

/// Low-PAPR reference sequence generator.
///
/// Builds the cyclically extended Zadoff-Chu construction: the base
/// sequence of length `M` repeats a root sequence of length `N_zc`, the
/// largest prime below `M`, and the cyclic shift is applied as the phase
/// ramp `exp(j 2π n_cs n / n_cs_max)`.
#[derive(Debug, Clone, Default)]
pub struct LowPaprSequenceGenerator;

impl LowPaprSequenceGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self
    }

    /// Fill `out` with the pilot sequence for the given parameters.
    ///
    /// The sequence length is `out.len()`.
    pub fn generate(
        &self,
        out: &mut [Complex32],
        sequence_group: u32,
        sequence_number: u32,
        n_cs: usize,
        n_cs_max: usize,
    ) {
        let m = out.len();
        if m == 0 {
            return;
        }

        let n_zc = largest_prime_below(m);
        let q = root_index(n_zc, sequence_group, sequence_number);
        let alpha = 2.0 * PI * n_cs as f64 / n_cs_max as f64;

        for (n, value) in out.iter_mut().enumerate() {
            let k = (n % n_zc) as f64;
            let base_phase = -PI * q * k * (k + 1.0) / n_zc as f64;
            let phase = base_phase + alpha * n as f64;
            *value = Complex32::new(phase.cos() as f32, phase.sin() as f32);
        }
    }
}

/// Zadoff-Chu root index for group `u`, number `v`.
fn root_index(n_zc: usize, sequence_group: u32, sequence_number: u32) -> f64 {
    let q_bar = n_zc as f64 * (sequence_group as f64 + 1.0) / 31.0;
    let sign = if (2.0 * q_bar).floor() as i64 % 2 == 0 {
        1.0
    } else {
        -1.0
    };
    (q_bar + 0.5).floor() + sequence_number as f64 * sign
}

/// Largest prime strictly below `n`, or `n` itself when no smaller prime
/// exists (lengths below 3).
fn largest_prime_below(n: usize) -> usize {
    for candidate in (2..n).rev() {
        if is_prime(candidate) {
            return candidate;
        }
    }
    n
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}
