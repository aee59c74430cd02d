//! Best-effort per-subscriber CSI capture.
//!
//! An optional diagnostic tap on the estimator: after timing and phase
//! compensation, the per-subcarrier channel estimate of every antenna pair
//! can be persisted for offline analysis (beam training studies, channel
//! replay, regression datasets). The tap is deliberately outside the
//! estimation contract — it observes, it never participates:
//!
//! * attaching or detaching an observer cannot change any estimator
//!   output;
//! * a missing or malformed context (no RNTI) means the record is
//!   silently dropped;
//! * I/O failures are logged at `warn` level and otherwise swallowed.
//!
//! [`CsiFileLogger`] writes one binary file family per RNTI under a
//! configurable directory, rotating when a file reaches the size limit,
//! and appends session events to a `session_metadata.jsonl` journal.
//!
//! ## File format
//!
//! Each record is a 16-byte little-endian header followed by 12-byte
//! samples:
//!
//! ```text
//! header:  timestamp_us: i64 | rnti: u16 | rx_port: u16 | tx_port: u16 | nof_tones: u16
//! sample:  subcarrier: u16 | symbol: u16 | re: f32 | im: f32
//! ```
//!
//! Subcarrier indices are absolute within the grid, following the comb
//! pattern of the recorded port.

use crate::config::SrsContext;
use chrono::Local;
use num_complex::Complex32;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default rotation threshold: 100 MB per capture file.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Bytes per record header.
const HEADER_SIZE: u64 = 16;

/// Bytes per CSI sample.
const SAMPLE_SIZE: u64 = 12;

/// One compensated channel-estimate snapshot offered to an observer.
#[derive(Debug, Clone, Copy)]
pub struct CsiRecord<'a> {
    /// Occasion context; `None` or a zero RNTI drops the record.
    pub context: Option<&'a SrsContext>,
    /// Receive-port index within the estimation call.
    pub rx_port: usize,
    /// Transmit antenna port.
    pub antenna_port: usize,
    /// First OFDM symbol of the occasion.
    pub start_symbol: usize,
    /// First mapped subcarrier of the comb pattern.
    pub initial_subcarrier: usize,
    /// Comb size (subcarrier stride of the pattern).
    pub comb_size: usize,
    /// Compensated per-subcarrier channel estimate.
    pub lse: &'a [Complex32],
}

/// Passive observer of compensated channel estimates.
pub trait CsiObserver {
    /// Offer one record. Implementations must be best-effort: no panic,
    /// no feedback into the estimation.
    fn record(&mut self, record: &CsiRecord<'_>);
}

/// Per-RNTI file state.
#[derive(Debug)]
struct RntiCollector {
    rnti: u16,
    file_counter: u32,
    current_size: u64,
    current_path: PathBuf,
    session_start: String,
    records_written: u64,
}

impl RntiCollector {
    fn new(rnti: u16) -> Self {
        Self {
            rnti,
            file_counter: 0,
            current_size: 0,
            current_path: PathBuf::new(),
            session_start: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            records_written: 0,
        }
    }

    fn rotate(&mut self, output_dir: &Path) {
        self.file_counter += 1;
        self.current_size = 0;
        self.current_path = output_dir.join(format!(
            "srs_csi_rnti_0x{:04x}_{}_{}.bin",
            self.rnti, self.session_start, self.file_counter
        ));
    }
}

/// File-backed CSI observer keyed by RNTI.
#[derive(Debug)]
pub struct CsiFileLogger {
    output_dir: PathBuf,
    max_file_size: u64,
    collectors: HashMap<u16, RntiCollector>,
}

impl CsiFileLogger {
    /// Create a logger writing under `output_dir` with the default 100 MB
    /// rotation threshold. The directory is created lazily on the first
    /// record.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            collectors: HashMap::new(),
        }
    }

    /// Override the rotation threshold.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Path of the capture file currently receiving records for `rnti`,
    /// if any record has been written.
    pub fn current_file(&self, rnti: u16) -> Option<&Path> {
        self.collectors
            .get(&rnti)
            .filter(|c| c.file_counter > 0)
            .map(|c| c.current_path.as_path())
    }

    /// Number of records written for `rnti` in this session.
    pub fn records_written(&self, rnti: u16) -> u64 {
        self.collectors.get(&rnti).map_or(0, |c| c.records_written)
    }

    fn write_record(
        &mut self,
        context: &SrsContext,
        record: &CsiRecord<'_>,
    ) -> std::io::Result<()> {
        let rnti = context.rnti;
        fs::create_dir_all(&self.output_dir)?;

        let record_size = HEADER_SIZE + SAMPLE_SIZE * record.lse.len() as u64;

        let output_dir = self.output_dir.clone();
        let max_file_size = self.max_file_size;
        let collector = self
            .collectors
            .entry(rnti)
            .or_insert_with(|| RntiCollector::new(rnti));

        let mut events: Vec<&str> = Vec::new();
        if collector.file_counter == 0 {
            collector.rotate(&output_dir);
            events.push("session_start");
        } else if collector.current_size + record_size > max_file_size {
            collector.rotate(&output_dir);
            events.push("file_rotation");
        }

        let timestamp_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);

        let mut payload =
            Vec::with_capacity((HEADER_SIZE + SAMPLE_SIZE * record.lse.len() as u64) as usize);
        payload.extend_from_slice(&timestamp_us.to_le_bytes());
        payload.extend_from_slice(&rnti.to_le_bytes());
        payload.extend_from_slice(&(record.rx_port as u16).to_le_bytes());
        payload.extend_from_slice(&(record.antenna_port as u16).to_le_bytes());
        payload.extend_from_slice(&(record.lse.len() as u16).to_le_bytes());
        for (tone, value) in record.lse.iter().enumerate() {
            let subcarrier = (record.initial_subcarrier + tone * record.comb_size) as u16;
            payload.extend_from_slice(&subcarrier.to_le_bytes());
            payload.extend_from_slice(&(record.start_symbol as u16).to_le_bytes());
            payload.extend_from_slice(&value.re.to_le_bytes());
            payload.extend_from_slice(&value.im.to_le_bytes());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&collector.current_path)?;
        file.write_all(&payload)?;

        collector.current_size += payload.len() as u64;
        collector.records_written += 1;
        let file_name = collector
            .current_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for event in events {
            write_metadata_entry(&output_dir, context, &file_name, event)?;
        }

        Ok(())
    }
}

impl CsiObserver for CsiFileLogger {
    fn record(&mut self, record: &CsiRecord<'_>) {
        let context = match record.context {
            Some(context) if context.rnti != 0 => context,
            _ => return,
        };

        if let Err(error) = self.write_record(context, record) {
            tracing::warn!("CSI capture for rnti 0x{:04x} failed: {error}", context.rnti);
        }
    }
}

/// Append one event line to the session metadata journal.
fn write_metadata_entry(
    output_dir: &Path,
    context: &SrsContext,
    file_name: &str,
    event: &str,
) -> std::io::Result<()> {
    let entry = serde_json::json!({
        "context": context,
        "file": file_name,
        "timestamp": Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        "event": event,
    });

    let mut journal = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_dir.join("session_metadata.jsonl"))?;
    writeln!(journal, "{entry}")?;
    Ok(())
}

/// Observer that drops every record; useful to keep an estimator's wiring
/// identical between instrumented and plain deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCsiObserver;

impl CsiObserver for NullCsiObserver {
    fn record(&mut self, _record: &CsiRecord<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(rnti: u16) -> SrsContext {
        SrsContext { sector_id: 1, rnti }
    }

    fn record<'a>(context: Option<&'a SrsContext>, lse: &'a [Complex32]) -> CsiRecord<'a> {
        CsiRecord {
            context,
            rx_port: 1,
            antenna_port: 0,
            start_symbol: 13,
            initial_subcarrier: 2,
            comb_size: 2,
            lse,
        }
    }

    #[test]
    fn test_record_written_with_expected_layout() {
        let temp = TempDir::new().unwrap();
        let mut logger = CsiFileLogger::new(temp.path());

        let ctx = context(0x4601);
        let lse = vec![Complex32::new(1.0, -2.0), Complex32::new(0.5, 0.25)];
        logger.record(&record(Some(&ctx), &lse));

        let path = logger.current_file(0x4601).unwrap();
        let bytes = fs::read(path).unwrap();
        assert_eq!(bytes.len(), 16 + 2 * 12);

        // Header fields after the timestamp.
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 0x4601);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 1); // rx port
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 0); // tx port
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 2); // tones

        // First sample: subcarrier 2, symbol 13, value (1.0, -2.0).
        assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[18], bytes[19]]), 13);
        let re = f32::from_le_bytes(bytes[20..24].try_into().unwrap());
        let im = f32::from_le_bytes(bytes[24..28].try_into().unwrap());
        assert_eq!((re, im), (1.0, -2.0));

        // Second sample follows the comb: subcarrier 2 + 2.
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 4);
    }

    #[test]
    fn test_missing_or_zero_rnti_is_dropped() {
        let temp = TempDir::new().unwrap();
        let mut logger = CsiFileLogger::new(temp.path());
        let lse = vec![Complex32::new(1.0, 0.0)];

        logger.record(&record(None, &lse));
        let zero = context(0);
        logger.record(&record(Some(&zero), &lse));

        assert_eq!(logger.records_written(0), 0);
        // Nothing at all was created, not even the directory content.
        assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_rotation_and_metadata_journal() {
        let temp = TempDir::new().unwrap();
        // Threshold below two records: every second record rotates.
        let record_size = 16 + 12;
        let mut logger =
            CsiFileLogger::new(temp.path()).with_max_file_size(record_size as u64 + 4);

        let ctx = context(0x17);
        let lse = vec![Complex32::new(0.0, 1.0)];
        logger.record(&record(Some(&ctx), &lse));
        let first = logger.current_file(0x17).unwrap().to_path_buf();
        logger.record(&record(Some(&ctx), &lse));
        let second = logger.current_file(0x17).unwrap().to_path_buf();

        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
        assert_eq!(logger.records_written(0x17), 2);

        let journal = fs::read_to_string(temp.path().join("session_metadata.jsonl")).unwrap();
        let events: Vec<serde_json::Value> = journal
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "session_start");
        assert_eq!(events[1]["event"], "file_rotation");
        assert_eq!(events[0]["context"]["rnti"], 0x17);
        assert_eq!(events[0]["context"]["sector_id"], 1);
    }

    #[test]
    fn test_separate_files_per_rnti() {
        let temp = TempDir::new().unwrap();
        let mut logger = CsiFileLogger::new(temp.path());
        let lse = vec![Complex32::new(1.0, 1.0)];

        let a = context(0x0001);
        let b = context(0x0002);
        logger.record(&record(Some(&a), &lse));
        logger.record(&record(Some(&b), &lse));

        let file_a = logger.current_file(0x0001).unwrap();
        let file_b = logger.current_file(0x0002).unwrap();
        assert_ne!(file_a, file_b);
    }

    #[test]
    fn test_unwritable_directory_fails_silently() {
        let mut logger = CsiFileLogger::new("/proc/does-not-exist/csi");
        let ctx = context(0x30);
        let lse = vec![Complex32::new(1.0, 0.0)];
        // Must not panic.
        logger.record(&record(Some(&ctx), &lse));
        assert_eq!(logger.records_written(0x30), 0);
    }
}
