//! # SRS Uplink Channel Estimator
//!
//! This crate implements Sounding Reference Signal (SRS) based uplink
//! channel estimation for a 5G NR base-station PHY: from the raw pilot
//! samples of a frequency-domain resource grid to a wideband channel
//! matrix, a timing-alignment measurement and noise/power metrics.
//!
//! ## Overview
//!
//! One SRS occasion spans 1, 2 or 4 consecutive OFDM symbols on a comb
//! pattern of subcarriers, sounded simultaneously from up to 4 transmit
//! antenna ports that share the same resource elements through
//! cyclic-shift multiplexing. The estimator processes one occasion per
//! call:
//!
//! - **Sequence generation**: Zadoff-Chu low-PAPR reference sequences per
//!   antenna port ([`srs_sequence`])
//! - **LSE accumulation**: symbol accumulation and conjugate correlation
//!   against the reference ([`srs_estimator`])
//! - **Timing alignment**: oversampled IDFT delay search, combined across
//!   antenna ports ([`time_alignment`])
//! - **Phase compensation**: table-driven derotation of the estimated
//!   delay ([`cexp_table`])
//! - **Reduction**: wideband coefficients, noise variance with an SNR
//!   normalization, EPRE and RSRP ([`channel_matrix`])
//! - **Diagnostics**: optional per-subscriber CSI capture to disk
//!   ([`csi_capture`])
//!
//! ## Signal Flow
//!
//! ```text
//! grid → accumulate symbols → correlate vs reference → LSE
//!      → IDFT delay search → derotate → mean → channel matrix
//!      → residual vs reconstruction → noise variance → SNR scaling
//! ```
//!
//! ## Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use srs_estimator::config::{SrsEstimatorConfig, SrsResource};
//! use srs_estimator::resource_grid::ResourceGrid;
//! use srs_estimator::SrsChannelEstimator;
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
//! // Sound the channel with the known pilot, flat unit gain.
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
//! assert!((result.time_alignment.time_alignment).abs() < result.time_alignment.resolution);
//! ```

pub mod cexp_table;
pub mod channel_matrix;
pub mod config;
pub mod csi_capture;
pub mod resource_grid;
pub mod srs_estimator;
pub mod srs_sequence;
pub mod time_alignment;

pub use channel_matrix::ChannelMatrix;
pub use config::{SrsContext, SrsEstimatorConfig, SrsResource};
pub use csi_capture::{CsiFileLogger, CsiObserver, CsiRecord};
pub use resource_grid::{ResourceGrid, ResourceGridReader};
pub use srs_estimator::{SrsChannelEstimator, SrsEstimatorResult};
pub use time_alignment::{IdftTaEstimator, TaEstimator, TimeAlignmentMeasurement};
