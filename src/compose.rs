//! Builds the template context for an alert mail from a check record.

use chrono::SecondsFormat;
use serde::Serialize;
use url::Url;

use crate::record::{CheckRecord, Status};

/// Status page location, relative to the Ayd base URL.
pub const STATUS_PAGE_PATH: &str = "status.html";

/// Label shown instead of `HEALTHY` when a target recovers.
pub const RESOLVED_LABEL: &str = "RESOLVED";

/// Derives a stable fragment identifier for a target on the status page.
pub trait AnchorStrategy: Send + Sync {
    fn anchor(&self, target: &str) -> Option<String>;
}

/// Plain status page link without a fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnchor;

impl AnchorStrategy for NoAnchor {
    fn anchor(&self, _target: &str) -> Option<String> {
        None
    }
}

/// `target-<16 hex digits>` taken from the BLAKE3 hash of the target URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashAnchor;

impl AnchorStrategy for HashAnchor {
    fn anchor(&self, target: &str) -> Option<String> {
        let hash = blake3::hash(target.as_bytes());
        Some(format!("target-{}", &hash.to_hex()[..16]))
    }
}

/// Everything the mail templates can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderContext {
    pub subject: String,
    pub status_page: Option<String>,
    pub target: String,
    pub checked_at: String,
    pub status: String,
    pub message: String,
}

/// Turns a record plus resolved side information into a [`RenderContext`].
pub struct AlertComposer {
    anchor: Box<dyn AnchorStrategy>,
}

impl Default for AlertComposer {
    fn default() -> Self {
        Self::new(Box::new(NoAnchor))
    }
}

impl AlertComposer {
    pub fn new(anchor: Box<dyn AnchorStrategy>) -> Self {
        Self { anchor }
    }

    pub fn compose(
        &self,
        record: &CheckRecord,
        status_page_base: Option<&Url>,
        resolved_message: &str,
    ) -> RenderContext {
        let status = status_label(record.status);
        let status_page = status_page_base.and_then(|base| self.status_page_url(base, &record.target));

        RenderContext {
            subject: format!("[{}] {}", status, record.target),
            status_page,
            target: record.target.clone(),
            checked_at: record.checked_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            status,
            message: compose_message(resolved_message, record),
        }
    }

    fn status_page_url(&self, base: &Url, target: &str) -> Option<String> {
        let mut url = match base.join(STATUS_PAGE_PATH) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, base = %base, "cannot derive status page URL");
                return None;
            }
        };
        url.set_fragment(self.anchor.anchor(target).as_deref());
        Some(url.to_string())
    }
}

/// `RESOLVED` for healthy records, the status name otherwise.
pub fn status_label(status: Status) -> String {
    match status {
        Status::Healthy => RESOLVED_LABEL.to_string(),
        other => other.to_string(),
    }
}

fn compose_message(message: &str, record: &CheckRecord) -> String {
    if record.extra.is_empty() {
        return message.to_string();
    }

    match serde_json::to_string_pretty(&record.extra) {
        Ok(extra) if message.is_empty() => extra,
        Ok(extra) => format!("{}\n\n{}", message, extra),
        Err(e) => {
            tracing::warn!(error = %e, "cannot format extra fields, leaving them out");
            message.to_string()
        }
    }
}
