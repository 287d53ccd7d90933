//! Serial/USB-CDC line source
//!
//! The serial driver is blocking, so a dedicated thread reads lines and
//! hands them over a bounded channel. The port read timeout bounds how long
//! the thread takes to notice `close`.

use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{ContractError, LineSource, RawLine};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::strip_terminator;

/// Lines buffered between the reader thread and the ingestor
const LINE_QUEUE: usize = 1024;

type LineResult = io::Result<Vec<u8>>;

pub struct SerialLineSource {
    name: String,
    rx: mpsc::Receiver<LineResult>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialLineSource {
    /// Open `path` at `baud_rate`, 8N1, no flow control
    pub fn open(
        path: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, ContractError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|e| ContractError::transport(path, e.to_string()))?;

        info!(port = path, baud_rate, "Opened serial port");

        let (tx, rx) = mpsc::channel(LINE_QUEUE);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let reader = thread::Builder::new()
            .name(format!("serial-reader-{path}"))
            .spawn(move || read_lines(port, tx, thread_stop))
            .map_err(|e| ContractError::transport(path, e.to_string()))?;

        Ok(Self {
            name: path.to_string(),
            rx,
            stop,
            reader: Some(reader),
        })
    }
}

fn read_lines(port: Box<dyn SerialPort>, tx: mpsc::Sender<LineResult>, stop: Arc<AtomicBool>) {
    let mut reader = BufReader::new(port);
    let mut line = Vec::new();

    while !stop.load(Ordering::Relaxed) {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                // Timed-out partial reads keep accumulating in `line`
                if line.last() != Some(&b'\n') {
                    continue;
                }
                if tx.blocking_send(Ok(std::mem::take(&mut line))).is_err() {
                    break;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    debug!("Serial reader thread exiting");
}

impl LineSource for SerialLineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<RawLine>, ContractError> {
        match self.rx.recv().await {
            Some(Ok(mut line)) => {
                strip_terminator(&mut line);
                Ok(Some(RawLine::new(line)))
            }
            Some(Err(e)) => Err(ContractError::transport(&self.name, e.to_string())),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.stop.store(true, Ordering::Relaxed);
        self.rx.close();

        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        match tokio::task::spawn_blocking(move || reader.join()).await {
            Ok(Ok(())) => info!(port = %self.name, "Serial port closed"),
            _ => warn!(port = %self.name, "Serial reader thread did not exit cleanly"),
        }
        Ok(())
    }
}

impl Drop for SerialLineSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
