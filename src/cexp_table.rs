//! Precomputed complex-exponential lookup table.
//!
//! Phase derotation in the estimator runs once per pilot subcarrier per
//! port pair, every SRS occasion. Evaluating `sin`/`cos` there is wasted
//! work: the table quantizes one full turn into a power-of-two number of
//! steps and the hot path reduces to a rounded index and a load.
//!
//! Indices may be any `i32`; they wrap around the table, so negative
//! phases need no special handling at the call site.
//!
//! # Example
//!
//! ```rust
//! use srs_estimator::cexp_table::CexpTable;
//!
//! let table = CexpTable::new(1024);
//! let mut out = vec![num_complex::Complex32::new(0.0, 0.0); 3];
//! // 0, quarter turn, and minus a quarter turn.
//! table.generate(&mut out, &[0, 256, -256]);
//! assert!((out[0].re - 1.0).abs() < 1e-6);
//! assert!((out[1].im - 1.0).abs() < 1e-6);
//! assert!((out[2].im + 1.0).abs() < 1e-6);
//! ```

use num_complex::Complex32;
use std::f64::consts::TAU;

/// Complex-exponential table over one full turn.
#[derive(Debug, Clone)]
pub struct CexpTable {
    entries: Vec<Complex32>,
    mask: i32,
}

impl CexpTable {
    /// Build a table with `size` entries. `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        assert!(
            size.is_power_of_two(),
            "cexp table size must be a power of two, got {size}"
        );
        let entries = (0..size)
            .map(|k| {
                let phase = TAU * k as f64 / size as f64;
                Complex32::new(phase.cos() as f32, phase.sin() as f32)
            })
            .collect();
        Self {
            entries,
            mask: (size - 1) as i32,
        }
    }

    /// Number of entries, i.e. the angular resolution over one turn.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Batch lookup: `out[i] = exp(j * 2π * indices[i] / size)`.
    ///
    /// `out` and `indices` must have the same length.
    pub fn generate(&self, out: &mut [Complex32], indices: &[i32]) {
        debug_assert_eq!(out.len(), indices.len());
        for (value, &index) in out.iter_mut().zip(indices) {
            *value = self.entries[(index & self.mask) as usize];
        }
    }
}

impl Default for CexpTable {
    /// 1024-entry table, enough for derotation well below the pilot SNR
    /// floor.
    fn default() -> Self {
        Self::new(1024)
    }
}
