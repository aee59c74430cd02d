//! Wideband channel coefficient matrix.
//!
//! One complex coefficient per (receive port, transmit antenna port) pair,
//! the primary output of the SRS estimator. After SNR normalization the
//! squared Frobenius norm of the matrix approximates the linear SNR of the
//! sounded link.

use num_complex::Complex32;

/// Dense rx-port × tx-antenna-port coefficient grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMatrix {
    nof_rx_ports: usize,
    nof_tx_ports: usize,
    coefficients: Vec<Complex32>,
}

impl ChannelMatrix {
    /// Create an all-zero matrix.
    pub fn new(nof_rx_ports: usize, nof_tx_ports: usize) -> Self {
        Self {
            nof_rx_ports,
            nof_tx_ports,
            coefficients: vec![Complex32::new(0.0, 0.0); nof_rx_ports * nof_tx_ports],
        }
    }

    /// Number of receive ports.
    pub fn nof_rx_ports(&self) -> usize {
        self.nof_rx_ports
    }

    /// Number of transmit antenna ports.
    pub fn nof_tx_ports(&self) -> usize {
        self.nof_tx_ports
    }

    fn index(&self, rx_port: usize, tx_port: usize) -> usize {
        debug_assert!(rx_port < self.nof_rx_ports);
        debug_assert!(tx_port < self.nof_tx_ports);
        rx_port * self.nof_tx_ports + tx_port
    }

    /// Coefficient of one antenna pair.
    pub fn coefficient(&self, rx_port: usize, tx_port: usize) -> Complex32 {
        self.coefficients[self.index(rx_port, tx_port)]
    }

    /// Set the coefficient of one antenna pair.
    pub fn set_coefficient(&mut self, value: Complex32, rx_port: usize, tx_port: usize) {
        let index = self.index(rx_port, tx_port);
        self.coefficients[index] = value;
    }

    /// Scale every coefficient by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for c in &mut self.coefficients {
            *c *= factor;
        }
    }

    /// Sum of squared magnitudes over all entries.
    pub fn frobenius_norm_squared(&self) -> f32 {
        self.coefficients.iter().map(|c| c.norm_sqr()).sum()
    }
}
