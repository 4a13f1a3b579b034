//! Health check records handed over by the Ayd supervisor.
//!
//! A record arrives as a single argument, either as a JSON object or in
//! the older tab separated form `time<TAB>status<TAB>latency<TAB>target<TAB>message`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UsageError;

/// Result of a single health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Unknown,
    Healthy,
    Degrade,
    Failure,
    Aborted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "UNKNOWN",
            Status::Healthy => "HEALTHY",
            Status::Degrade => "DEGRADE",
            Status::Failure => "FAILURE",
            Status::Aborted => "ABORTED",
        }
    }

    /// Parse a status name case-insensitively. Unrecognized names are `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "HEALTHY" => Status::Healthy,
            "DEGRADE" => Status::Degrade,
            "FAILURE" => Status::Failure,
            "ABORTED" => Status::Aborted,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The check result being alerted on.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRecord {
    pub checked_at: DateTime<FixedOffset>,
    pub status: Status,
    /// Check duration in milliseconds.
    pub latency_ms: f64,
    pub target: String,
    pub message: String,
    /// Additional structured fields, sorted by key.
    pub extra: BTreeMap<String, Value>,
}

impl CheckRecord {
    /// Decode a record from its JSON or tab separated form.
    pub fn parse(raw: &str) -> Result<Self, UsageError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            Self::parse_json(trimmed)
        } else {
            Self::parse_tsv(trimmed)
        }
    }

    fn parse_json(raw: &str) -> Result<Self, UsageError> {
        let wire: WireRecord =
            serde_json::from_str(raw).map_err(|e| UsageError::InvalidRecord(e.to_string()))?;

        Ok(Self {
            checked_at: parse_time(&wire.time)?,
            status: Status::from_name(&wire.status),
            latency_ms: wire.latency.unwrap_or_default(),
            target: non_empty_target(wire.target)?,
            message: wire.message.unwrap_or_default(),
            extra: wire.extra,
        })
    }

    fn parse_tsv(raw: &str) -> Result<Self, UsageError> {
        let fields: Vec<&str> = raw.splitn(5, '\t').collect();
        let [time, status, latency, target, rest @ ..] = fields.as_slice() else {
            return Err(UsageError::InvalidRecord(
                "expected at least 4 tab separated fields".to_string(),
            ));
        };

        let latency_ms = latency.trim().parse::<f64>().map_err(|e| {
            UsageError::InvalidRecord(format!("invalid latency '{}': {}", latency, e))
        })?;

        Ok(Self {
            checked_at: parse_time(time)?,
            status: Status::from_name(status),
            latency_ms,
            target: non_empty_target(target.trim().to_string())?,
            message: rest.first().map(|m| m.to_string()).unwrap_or_default(),
            extra: BTreeMap::new(),
        })
    }
}

impl FromStr for CheckRecord {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Deserialize)]
struct WireRecord {
    time: String,
    status: String,
    #[serde(default)]
    latency: Option<f64>,
    target: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn parse_time(raw: &str) -> Result<DateTime<FixedOffset>, UsageError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| UsageError::InvalidRecord(format!("invalid time '{}': {}", raw, e)))
}

fn non_empty_target(target: String) -> Result<String, UsageError> {
    if target.is_empty() {
        Err(UsageError::InvalidRecord("target is empty".to_string()))
    } else {
        Ok(target)
    }
}
