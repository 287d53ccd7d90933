//! CsvFileWriter - comma-separated rows in a local file

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use contracts::{ContractError, RowWriter};
use tracing::{debug, error, info};

/// Row writer backed by a buffered file
///
/// The file is created lazily on the first row, so a session that never
/// detects a schema leaves nothing behind.
pub struct CsvFileWriter {
    name: String,
    path: PathBuf,
    file: Option<BufWriter<File>>,
    closed: bool,
}

impl CsvFileWriter {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file: None,
            closed: false,
        }
    }

    /// `dir/stem_YYYY-MM-DD_HH-MM-SS.ext` for a session started at `started`
    pub fn timestamped_path(base: &Path, started: &DateTime<Local>) -> PathBuf {
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sensor_data".to_string());
        let ext = base
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "csv".to_string());
        let file_name = format!("{stem}_{}.{ext}", started.format("%Y-%m-%d_%H-%M-%S"));
        base.with_file_name(file_name)
    }

    fn open(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(&self.path)?;
            info!(sink = %self.name, path = %self.path.display(), "Store file created");
            self.file = Some(BufWriter::new(file));
        }
        // populated above
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("store file missing"))
    }

    fn write_line(&mut self, fields: &[String]) -> std::io::Result<()> {
        let file = self.open()?;
        writeln!(file, "{}", fields.join(","))
    }

    fn write_failed(&self, e: std::io::Error) -> ContractError {
        error!(sink = %self.name, path = %self.path.display(), error = %e, "Write failed");
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl RowWriter for CsvFileWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_row(&mut self, fields: &[String]) -> Result<(), ContractError> {
        if self.closed {
            return Err(ContractError::sink_write(&self.name, "file closed"));
        }
        self.write_line(fields).map_err(|e| self.write_failed(e))
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let result = file.flush().and_then(|_| file.get_ref().sync_data());
        result.map_err(|e| self.write_failed(e))
    }

    fn close(&mut self) -> Result<(), ContractError> {
        self.closed = true;
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|e| self.write_failed(e))?;
        }
        debug!(sink = %self.name, "CsvFileWriter closed");
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_rows_written_after_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("data.csv");
        let mut writer = CsvFileWriter::new("csv", &path);

        assert!(!path.exists());
        writer
            .write_row(&["x".into(), "y".into(), "z".into()])
            .unwrap();
        writer
            .write_row(&["1".into(), "-2".into(), "3".into()])
            .unwrap();
        writer.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "x,y,z\n1,-2,3\n");
    }

    #[test]
    fn test_flush_without_file_is_noop() {
        let dir = tempdir().unwrap();
        let mut writer = CsvFileWriter::new("csv", dir.path().join("never.csv"));
        writer.flush().unwrap();
        writer.close().unwrap();
        assert!(!dir.path().join("never.csv").exists());
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut writer = CsvFileWriter::new("csv", dir.path().join("data.csv"));
        writer.close().unwrap();
        assert!(writer.write_row(&["1".into()]).is_err());
    }

    #[test]
    fn test_timestamped_path() {
        let started = Local.with_ymd_and_hms(2026, 2, 1, 14, 5, 9).unwrap();
        let path = CsvFileWriter::timestamped_path(Path::new("logs/sensor_data.csv"), &started);
        assert_eq!(
            path,
            PathBuf::from("logs/sensor_data_2026-02-01_14-05-09.csv")
        );
    }
}
