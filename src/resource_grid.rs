//! Frequency-domain resource grid access.
//!
//! The estimator never owns the receive buffer; it reads pilot samples
//! through [`ResourceGridReader`], which hides the demodulator's storage
//! behind a comb-pattern read: one receive port, one OFDM symbol, every
//! `stride`-th subcarrier starting from `initial_subcarrier`.
//!
//! [`ResourceGrid`] is a dense in-memory implementation for tests,
//! doctests, benches and offline processing of recorded slots.
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use srs_estimator::resource_grid::{ResourceGrid, ResourceGridReader};
//!
//! let mut grid = ResourceGrid::new(1, 14, 48);
//! grid.put(0, 3, 0, Complex32::new(1.0, 0.0));
//! grid.put(0, 3, 2, Complex32::new(0.0, 1.0));
//!
//! let mut pilots = vec![Complex32::new(0.0, 0.0); 2];
//! grid.get(&mut pilots, 0, 3, 0, 2);
//! assert_eq!(pilots[0], Complex32::new(1.0, 0.0));
//! assert_eq!(pilots[1], Complex32::new(0.0, 1.0));
//! ```

use num_complex::Complex32;

/// Read access to a frequency-domain receive buffer.
///
/// Implementations must fill exactly `out.len()` samples; short reads are
/// a contract violation on the reader's side, not an error path of the
/// estimator.
pub trait ResourceGridReader {
    /// Fill `out` with the samples of `rx_port` on `symbol`, taking every
    /// `stride`-th subcarrier starting at `initial_subcarrier`.
    fn get(
        &self,
        out: &mut [Complex32],
        rx_port: usize,
        symbol: usize,
        initial_subcarrier: usize,
        stride: usize,
    );
}

/// Dense in-memory resource grid, indexed port-major.
#[derive(Debug, Clone)]
pub struct ResourceGrid {
    nof_ports: usize,
    nof_symbols: usize,
    nof_subcarriers: usize,
    data: Vec<Complex32>,
}

impl ResourceGrid {
    /// Create an all-zero grid.
    pub fn new(nof_ports: usize, nof_symbols: usize, nof_subcarriers: usize) -> Self {
        Self {
            nof_ports,
            nof_symbols,
            nof_subcarriers,
            data: vec![Complex32::new(0.0, 0.0); nof_ports * nof_symbols * nof_subcarriers],
        }
    }

    /// Number of receive ports.
    pub fn nof_ports(&self) -> usize {
        self.nof_ports
    }

    /// Number of OFDM symbols.
    pub fn nof_symbols(&self) -> usize {
        self.nof_symbols
    }

    /// Number of subcarriers.
    pub fn nof_subcarriers(&self) -> usize {
        self.nof_subcarriers
    }

    fn index(&self, port: usize, symbol: usize, subcarrier: usize) -> usize {
        debug_assert!(port < self.nof_ports);
        debug_assert!(symbol < self.nof_symbols);
        debug_assert!(subcarrier < self.nof_subcarriers);
        (port * self.nof_symbols + symbol) * self.nof_subcarriers + subcarrier
    }

    /// Write one resource element.
    pub fn put(&mut self, port: usize, symbol: usize, subcarrier: usize, value: Complex32) {
        let index = self.index(port, symbol, subcarrier);
        self.data[index] = value;
    }

    /// Read one resource element.
    pub fn sample(&self, port: usize, symbol: usize, subcarrier: usize) -> Complex32 {
        self.data[self.index(port, symbol, subcarrier)]
    }

    /// Map `values` onto the comb pattern starting at `initial_subcarrier`
    /// with the given stride.
    pub fn map_comb(
        &mut self,
        port: usize,
        symbol: usize,
        initial_subcarrier: usize,
        stride: usize,
        values: &[Complex32],
    ) {
        for (n, &value) in values.iter().enumerate() {
            self.put(port, symbol, initial_subcarrier + n * stride, value);
        }
    }
}

impl ResourceGridReader for ResourceGrid {
    fn get(
        &self,
        out: &mut [Complex32],
        rx_port: usize,
        symbol: usize,
        initial_subcarrier: usize,
        stride: usize,
    ) {
        for (n, value) in out.iter_mut().enumerate() {
            *value = self.sample(rx_port, symbol, initial_subcarrier + n * stride);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_zero() {
        let grid = ResourceGrid::new(2, 14, 24);
        let mut out = vec![Complex32::new(1.0, 1.0); 12];
        grid.get(&mut out, 1, 13, 0, 2);
        assert!(out.iter().all(|v| v.norm() == 0.0));
    }

    #[test]
    fn test_ports_and_symbols_are_independent() {
        let mut grid = ResourceGrid::new(2, 4, 8);
        grid.put(0, 1, 3, Complex32::new(1.0, 0.0));
        grid.put(1, 1, 3, Complex32::new(0.0, 1.0));
        assert_eq!(grid.sample(0, 1, 3), Complex32::new(1.0, 0.0));
        assert_eq!(grid.sample(1, 1, 3), Complex32::new(0.0, 1.0));
        assert_eq!(grid.sample(0, 2, 3), Complex32::new(0.0, 0.0));
    }

    #[test]
    fn test_map_comb_round_trip() {
        let mut grid = ResourceGrid::new(1, 14, 48);
        let values: Vec<Complex32> = (0..12)
            .map(|n| Complex32::new(n as f32, -(n as f32)))
            .collect();
        grid.map_comb(0, 6, 1, 4, &values);

        let mut out = vec![Complex32::new(0.0, 0.0); 12];
        grid.get(&mut out, 0, 6, 1, 4);
        assert_eq!(out, values);

        // Off-comb subcarriers stay empty.
        assert_eq!(grid.sample(0, 6, 2), Complex32::new(0.0, 0.0));
    }
}
