//! Outcome reporting back to the Ayd supervisor.
//!
//! Each run emits exactly one JSON line on stdout describing what happened
//! to the alert. Ayd stores that line as a record of the `mailto:` target.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

use chrono::{Local, SecondsFormat};
use serde::Serialize;
use serde_json::Value;

use crate::record::Status;

/// One reported result of an alert delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub time: String,
    pub status: Status,
    /// Milliseconds spent handling the alert.
    pub latency: f64,
    pub target: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Stamps outcomes for one alert channel with time and elapsed latency.
#[derive(Debug, Clone)]
pub struct OutcomeLog {
    target: String,
    started: Instant,
}

impl OutcomeLog {
    /// Start timing for `target` now.
    pub fn start(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            started: Instant::now(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn outcome(
        &self,
        status: Status,
        message: impl Into<String>,
        extra: BTreeMap<String, Value>,
    ) -> Outcome {
        Outcome {
            time: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            status,
            latency: self.started.elapsed().as_secs_f64() * 1000.0,
            target: self.target.clone(),
            message: message.into(),
            extra,
        }
    }
}

/// Sink for delivery outcomes.
pub trait OutcomeReporter: Send + Sync {
    fn report(&self, outcome: &Outcome) -> io::Result<()>;
}

/// Writes each outcome as one line of JSON.
pub struct JsonLineReporter<W> {
    writer: Mutex<W>,
}

impl JsonLineReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLineReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> OutcomeReporter for JsonLineReporter<W> {
    fn report(&self, outcome: &Outcome) -> io::Result<()> {
        let line = serde_json::to_string(outcome)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("outcome writer lock poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}
