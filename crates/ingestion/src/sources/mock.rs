//! Scripted line source for tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, LineSource, RawLine};
use tokio::time::{self, Instant};
use tracing::trace;

enum Step {
    Line(Bytes),
    Pause(Duration),
    /// Armed pause; the deadline survives a cancelled read
    Until(Instant),
    Fail(String),
}

/// Replays a fixed script, then reports end of input (or hangs)
pub struct MockLineSource {
    name: String,
    script: VecDeque<Step>,
    hang_at_end: bool,
    closes: Arc<AtomicU64>,
}

impl MockLineSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: VecDeque::new(),
            hang_at_end: false,
            closes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Bytes>,
    {
        lines
            .into_iter()
            .fold(Self::new("mock"), |source, line| source.line(line))
    }

    pub fn line(mut self, line: impl Into<Bytes>) -> Self {
        self.script.push_back(Step::Line(line.into()));
        self
    }

    /// Wait before the next scripted step
    pub fn pause(mut self, duration: Duration) -> Self {
        self.script.push_back(Step::Pause(duration));
        self
    }

    /// Fail the read at this point of the script
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.script.push_back(Step::Fail(message.into()));
        self
    }

    /// Never report end of input once the script is exhausted
    pub fn hang_at_end(mut self) -> Self {
        self.hang_at_end = true;
        self
    }

    /// Counts `close` calls
    pub fn close_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.closes)
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LineSource for MockLineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<RawLine>, ContractError> {
        loop {
            if let Some(step) = self.script.front_mut() {
                if let Step::Pause(duration) = *step {
                    *step = Step::Until(Instant::now() + duration);
                }
                if let Step::Until(deadline) = *step {
                    time::sleep_until(deadline).await;
                    self.script.pop_front();
                    continue;
                }
            }

            match self.script.pop_front() {
                Some(Step::Line(line)) => {
                    trace!(len = line.len(), "Mock line");
                    return Ok(Some(RawLine::new(line)));
                }
                Some(Step::Fail(message)) => {
                    return Err(ContractError::transport(&self.name, message));
                }
                Some(Step::Pause(_) | Step::Until(_)) => {}
                None if self.hang_at_end => std::future::pending::<()>().await,
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
