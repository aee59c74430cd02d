//! SRS estimator configuration and validation.
//!
//! The configuration mirrors the information element that schedules an SRS
//! occasion: the resource description (antenna ports, symbols, comb pattern,
//! sequence parameters, frequency allocation), the numerology, the ordered
//! list of receive ports to process, and optional context metadata that is
//! opaque to the estimation core and only consumed by the diagnostic CSI
//! sink (see [`crate::csi_capture`]).
//!
//! Validation is a separate, caller-facing step: [`validate`] returns a
//! human-readable error, while the estimator itself treats an invalid
//! configuration as a contract breach and panics. The expectation is that
//! configurations are validated once when they enter the pipeline, not on
//! every slot.

use serde::Serialize;

/// Maximum number of physical resource blocks the estimator supports.
pub const MAX_NOF_PRB: usize = 272;

/// Maximum number of receive antenna ports.
pub const MAX_NOF_RX_PORTS: usize = 4;

/// Maximum number of SRS transmit antenna ports.
pub const MAX_NOF_TX_PORTS: usize = 4;

/// Maximum pilot sequence length, reached at the smallest comb size.
pub const MAX_SEQ_LENGTH: usize = MAX_NOF_PRB * 12 / 2;

/// Symbols per slot with normal cyclic prefix.
pub const NOF_SYMBOLS_PER_SLOT: usize = 14;

/// Cyclic-shift modulus for a given comb size.
///
/// Comb 2 multiplexes up to 8 cyclic shifts, comb 4 up to 12.
pub fn n_cs_max_for_comb(comb_size: usize) -> usize {
    match comb_size {
        2 => 8,
        4 => 12,
        _ => 0,
    }
}

/// Description of one SRS resource (shared by all symbols of an occasion).
#[derive(Debug, Clone)]
pub struct SrsResource {
    /// Number of SRS antenna ports (1, 2 or 4).
    pub nof_antenna_ports: usize,
    /// Number of consecutive SRS symbols (1, 2 or 4).
    pub nof_symbols: usize,
    /// First OFDM symbol of the occasion within the slot.
    pub start_symbol: usize,
    /// Transmission comb size (2 or 4).
    pub comb_size: usize,
    /// Comb offset in subcarriers, `0..comb_size`.
    pub comb_offset: usize,
    /// Sequence identity; selects the base sequence group.
    pub sequence_id: u16,
    /// Cyclic shift of antenna port 0, `0..n_cs_max`.
    pub cyclic_shift: usize,
    /// Frequency-domain start of the allocation, in PRB.
    pub freq_shift: usize,
    /// Width of the allocation, in PRB; the tabulated widths are positive
    /// multiples of 4.
    pub nof_prb: usize,
}

impl SrsResource {
    /// Pilot sequence length implied by this resource.
    pub fn sequence_length(&self) -> usize {
        self.nof_prb * 12 / self.comb_size
    }
}

/// Optional per-occasion context, opaque to the estimation core.
///
/// Carried through to the diagnostic CSI sink, which keys its output by
/// `rnti`. A zero RNTI is treated as absent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SrsContext {
    /// Serving sector identifier.
    pub sector_id: u32,
    /// Radio network temporary identifier of the subscriber.
    pub rnti: u16,
}

/// Full configuration of one `estimate` call.
#[derive(Debug, Clone)]
pub struct SrsEstimatorConfig {
    /// SRS resource description.
    pub resource: SrsResource,
    /// Numerology µ; subcarrier spacing is `15 kHz * 2^µ`.
    pub numerology: u8,
    /// Receive ports to process, in result order. No duplicates.
    pub ports: Vec<usize>,
    /// Optional context metadata for the diagnostic sink.
    pub context: Option<SrsContext>,
}

impl SrsEstimatorConfig {
    /// Subcarrier spacing in Hz.
    pub fn subcarrier_spacing_hz(&self) -> f64 {
        15_000.0 * f64::from(1u32 << self.numerology)
    }
}

/// Check a configuration against the estimator's contract.
///
/// Returns `Err` with a description of the first violation found. The
/// estimator asserts on this result rather than propagating it: by the time
/// an occasion reaches the PHY the configuration must already be valid.
pub fn validate(config: &SrsEstimatorConfig) -> Result<(), String> {
    let res = &config.resource;

    if !matches!(res.nof_antenna_ports, 1 | 2 | 4) {
        return Err(format!(
            "invalid number of antenna ports {}, expected 1, 2 or 4",
            res.nof_antenna_ports
        ));
    }
    if !matches!(res.nof_symbols, 1 | 2 | 4) {
        return Err(format!(
            "invalid number of symbols {}, expected 1, 2 or 4",
            res.nof_symbols
        ));
    }
    if res.start_symbol + res.nof_symbols > NOF_SYMBOLS_PER_SLOT {
        return Err(format!(
            "start symbol {} plus {} symbols exceeds the {} symbols per slot",
            res.start_symbol, res.nof_symbols, NOF_SYMBOLS_PER_SLOT
        ));
    }
    if !matches!(res.comb_size, 2 | 4) {
        return Err(format!("invalid comb size {}, expected 2 or 4", res.comb_size));
    }
    if res.comb_offset >= res.comb_size {
        return Err(format!(
            "comb offset {} out of range for comb size {}",
            res.comb_offset, res.comb_size
        ));
    }
    let n_cs_max = n_cs_max_for_comb(res.comb_size);
    if res.cyclic_shift >= n_cs_max {
        return Err(format!(
            "cyclic shift {} out of range, maximum for comb {} is {}",
            res.cyclic_shift,
            res.comb_size,
            n_cs_max - 1
        ));
    }
    // The standard tabulates allocation widths as multiples of 4 PRB. This
    // also keeps the shortest accepted sequence (12 pilots at comb 4) above
    // the number of coefficients the noise residual removes.
    if res.nof_prb < 4 || res.nof_prb % 4 != 0 {
        return Err(format!(
            "invalid allocation width {} PRB, expected a positive multiple of 4",
            res.nof_prb
        ));
    }
    if res.freq_shift + res.nof_prb > MAX_NOF_PRB {
        return Err(format!(
            "frequency shift {} plus {} PRB exceeds the {} PRB grid",
            res.freq_shift, res.nof_prb, MAX_NOF_PRB
        ));
    }
    if config.numerology > 4 {
        return Err(format!("invalid numerology {}", config.numerology));
    }
    if config.ports.is_empty() {
        return Err("the receive port list must not be empty".to_string());
    }
    if config.ports.len() > MAX_NOF_RX_PORTS {
        return Err(format!(
            "{} receive ports requested, maximum is {}",
            config.ports.len(),
            MAX_NOF_RX_PORTS
        ));
    }
    for (i, port) in config.ports.iter().enumerate() {
        if config.ports[..i].contains(port) {
            return Err(format!("duplicated receive port {port}"));
        }
    }

    Ok(())
}
