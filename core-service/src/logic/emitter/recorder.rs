//! Signal Log Recorder
//!
//! Append-only JSONL writer for output records, with size-based
//! rotation and a bounded number of retained files.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::sink::OutputSink;
use super::types::{OutputRecord, RecorderConfig, SinkError};

/// Log file prefix
const LOG_PREFIX: &str = "rfghost_";

/// Log file extension
const LOG_EXT: &str = "jsonl";

const BYTES_PER_MB: u64 = 1024 * 1024;

// ============================================================================
// RECORDER
// ============================================================================

/// Append-only JSONL recorder
pub struct JsonlRecorder {
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_size: u64,
    base_dir: PathBuf,
    max_file_size: u64,
    max_files: usize,
    sequence: u32,
    records_written: u64,
}

impl JsonlRecorder {
    /// Create a recorder in `base_dir`, rotating at `max_file_size` bytes
    pub fn new(base_dir: PathBuf, max_file_size: u64, max_files: usize) -> std::io::Result<Self> {
        std::fs::create_dir_all(&base_dir)?;
        let (file_path, file) = Self::open_new_file(&base_dir, 0)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        let recorder = Self {
            writer: BufWriter::new(file),
            current_file: file_path,
            current_size,
            base_dir,
            max_file_size: max_file_size.max(1),
            max_files: max_files.max(1),
            sequence: 0,
            records_written: 0,
        };
        recorder.enforce_retention()?;
        Ok(recorder)
    }

    pub fn from_config(config: &RecorderConfig) -> std::io::Result<Self> {
        Self::new(config.resolved_dir(), config.max_file_size_mb * BYTES_PER_MB, config.max_files)
    }

    /// Open a new log file named by UTC time and sequence
    fn open_new_file(base_dir: &Path, sequence: u32) -> std::io::Result<(PathBuf, File)> {
        let filename = format!(
            "{}{}_{:04}.{}",
            LOG_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            sequence,
            LOG_EXT
        );
        let file_path = base_dir.join(filename);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        log::info!("Opened signal log: {:?}", file_path);
        Ok((file_path, file))
    }

    /// Append one record as a JSON line
    pub fn record(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        let line = record.to_jsonl()?;
        let len = line.len() as u64 + 1;

        if self.current_size > 0 && self.current_size + len > self.max_file_size {
            self.rotate()?;
        }

        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.current_size += len;
        self.records_written += 1;
        Ok(())
    }

    /// Rotate to a new file and drop the oldest beyond `max_files`
    fn rotate(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;

        self.sequence += 1;
        let (new_path, new_file) = Self::open_new_file(&self.base_dir, self.sequence)?;
        self.writer = BufWriter::new(new_file);

        log::info!("Rotated from {:?} to {:?}", self.current_file, new_path);
        self.current_file = new_path;
        self.current_size = 0;

        self.enforce_retention()
    }

    fn enforce_retention(&self) -> std::io::Result<()> {
        let files = list_log_files(&self.base_dir)?;
        if files.len() <= self.max_files {
            return Ok(());
        }

        let excess = files.len() - self.max_files;
        for old in files.iter().filter(|f| **f != self.current_file).take(excess) {
            match std::fs::remove_file(old) {
                Ok(()) => log::debug!("Removed old signal log {:?}", old),
                Err(e) => log::warn!("Failed to remove old signal log {:?}: {}", old, e),
            }
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl OutputSink for JsonlRecorder {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        self.record(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        log::info!(
            "Signal recorder closed: {} records, last file {:?}",
            self.records_written,
            self.current_file
        );
        Ok(())
    }
}

// ============================================================================
// QUERY API
// ============================================================================

/// Read all records from a log file, skipping lines that do not parse
pub fn read_records(file_path: &Path) -> std::io::Result<Vec<OutputRecord>> {
    let reader = BufReader::new(File::open(file_path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<OutputRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => log::debug!("Skipping malformed line in {:?}: {}", file_path, e),
        }
    }

    Ok(records)
}

/// Last `count` records across the signal logs in `dir`, oldest first
pub fn recent_records(dir: &Path, count: usize) -> std::io::Result<Vec<OutputRecord>> {
    let mut recent = Vec::new();
    for file in list_log_files(dir)?.iter().rev() {
        let mut records = read_records(file)?;
        let take = count.saturating_sub(recent.len()).min(records.len());
        let tail = records.split_off(records.len() - take);
        recent.splice(0..0, tail);
        if recent.len() >= count {
            break;
        }
    }
    Ok(recent)
}

/// Signal log files in `dir`, oldest first
pub fn list_log_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_log = path.extension().map_or(false, |e| e == LOG_EXT)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(LOG_PREFIX));
            if is_log {
                files.push(path);
            }
        }
    }

    // Name carries timestamp + sequence
    files.sort();
    Ok(files)
}
