//! The one-shot alert pipeline.
//!
//! ```text
//! Init ─► ConfigResolved ─► AddressesResolved ─► MessageComposed ─► Sent
//!   └───────────┴──────────────────┴────────────────────┴─────────► Failed
//! ```
//!
//! Every invocation ends in exactly one reported [`Outcome`]. Nothing past
//! argument parsing escapes as an error.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;
use url::Url;

use crate::address::{AlertTarget, channel_target, format_mailbox_list};
use crate::compose::{AlertComposer, HashAnchor};
use crate::config::{ConfigResolver, ENV_AYD_URL, EnvSource, ProcessEnv, default_config_paths, lookup};
use crate::error::{ConfigError, DeliveryError, DispatchError, TemplateError};
use crate::incident::IncidentLookup;
use crate::notify::{OutcomeLog, OutcomeReporter, SmtpTransportFactory, TransportFactory, build_message};
use crate::record::{CheckRecord, Status};
use crate::template::TemplateEngine;

/// Ayd base URL assumed when `ayd_url` is not set.
pub const DEFAULT_AYD_URL: &str = "http://localhost:9000";

const EXTRA_SMTP_SERVER: &str = "smtp_server";
const EXTRA_FROM_ADDRESS: &str = "from_address";
const EXTRA_LOOKUP_ERROR: &str = "incident_lookup_error";

/// Where a dispatch run currently is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Init,
    ConfigResolved,
    AddressesResolved,
    MessageComposed,
    Sent,
    Failed,
}

/// Parsed process arguments: where to send, and what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub alert_url: Url,
    pub record: CheckRecord,
}

// Mutable bookkeeping for one run.
struct Progress {
    state: DispatchState,
    extra: BTreeMap<String, Value>,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: DispatchState::Init,
            extra: BTreeMap::new(),
        }
    }

    fn advance(&mut self, state: DispatchState) {
        tracing::debug!(from = ?self.state, to = ?state, "dispatch state transition");
        self.state = state;
    }

    fn note(&mut self, key: &str, value: impl Into<Value>) {
        self.extra.insert(key.to_string(), value.into());
    }
}

/// Drives an [`Invocation`] from configuration to a reported outcome.
pub struct Dispatcher {
    config_paths: Vec<PathBuf>,
    env: Box<dyn EnvSource + Send + Sync>,
    transports: Box<dyn TransportFactory>,
    lookup: Option<IncidentLookup>,
    templates: TemplateEngine,
    reporter: Box<dyn OutcomeReporter>,
}

impl Dispatcher {
    /// Dispatcher reading the platform config files and the process
    /// environment, delivering over real SMTP.
    pub fn new(reporter: Box<dyn OutcomeReporter>) -> Result<Self, TemplateError> {
        Ok(Self {
            config_paths: default_config_paths(),
            env: Box::new(ProcessEnv),
            transports: Box::new(SmtpTransportFactory),
            lookup: None,
            templates: TemplateEngine::new()?,
            reporter,
        })
    }

    pub fn with_config_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_paths = paths;
        self
    }

    pub fn with_env(mut self, env: Box<dyn EnvSource + Send + Sync>) -> Self {
        self.env = env;
        self
    }

    pub fn with_transport_factory(mut self, transports: Box<dyn TransportFactory>) -> Self {
        self.transports = transports;
        self
    }

    pub fn with_incident_lookup(mut self, lookup: IncidentLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_templates(mut self, templates: TemplateEngine) -> Self {
        self.templates = templates;
        self
    }

    /// Run the pipeline once and report the outcome. Returns the terminal state.
    pub async fn dispatch(&self, invocation: &Invocation) -> DispatchState {
        let log = OutcomeLog::start(channel_target(&invocation.alert_url));
        let mut progress = Progress::new();

        let result = self.run(invocation, &mut progress).await;

        let outcome = match result {
            Ok(recipients) => {
                progress.advance(DispatchState::Sent);
                let message = format!("sent alert to {}", recipients);
                tracing::info!(target_url = %log.target(), "{}", message);
                log.outcome(Status::Healthy, message, progress.extra)
            }
            Err(e) => {
                tracing::error!(
                    state = ?progress.state,
                    target_url = %log.target(),
                    error = %e,
                    "alert dispatch failed"
                );
                progress.advance(DispatchState::Failed);
                log.outcome(Status::Failure, e.to_string(), progress.extra)
            }
        };

        if let Err(e) = self.reporter.report(&outcome) {
            tracing::error!(error = %e, "failed to report outcome");
        }

        progress.state
    }

    async fn run(
        &self,
        invocation: &Invocation,
        progress: &mut Progress,
    ) -> Result<String, DispatchError> {
        let env = self.env.as_ref();

        // Init -> ConfigResolved
        let mut resolver = ConfigResolver::new();
        let resolved = resolver
            .load_files(&self.config_paths)
            .and_then(|()| resolver.apply_env(env))
            .and_then(|()| resolver.build());
        if let Some(triage) = resolver.triage() {
            progress.note(EXTRA_SMTP_SERVER, triage.smtp_server);
            progress.note(EXTRA_FROM_ADDRESS, triage.from_address);
        }
        let config = resolved?;
        progress.advance(DispatchState::ConfigResolved);

        // ConfigResolved -> AddressesResolved
        let target = AlertTarget::from_url(&invocation.alert_url)?;
        let from = target
            .override_from
            .clone()
            .unwrap_or_else(|| config.from.clone());
        progress.note(EXTRA_FROM_ADDRESS, from.to_string());
        progress.advance(DispatchState::AddressesResolved);

        // AddressesResolved -> MessageComposed
        let ayd_url = lookup(env, ENV_AYD_URL);
        let base = status_page_base(ayd_url.as_deref())?;

        let record = &invocation.record;
        let mut message = record.message.clone();
        let composer = match &ayd_url {
            Some(explicit) => {
                if message.is_empty() {
                    message = self.find_incident_message(explicit, &record.target, progress).await;
                }
                AlertComposer::new(Box::new(HashAnchor))
            }
            None => AlertComposer::default(),
        };

        let context = composer.compose(record, Some(&base), &message);
        let mail = self.templates.render(&context)?;
        let email = build_message(&from, &target.recipients, &mail)?;
        progress.advance(DispatchState::MessageComposed);

        // MessageComposed -> Sent; the transport is dropped on every path out
        let transport = self.transports.open(&config)?;
        tracing::info!(
            smtp_server = %config.endpoint(),
            recipients = target.recipients.len(),
            "sending alert"
        );
        transport
            .send_email(email)
            .await
            .map_err(DeliveryError::Send)?;

        Ok(format_mailbox_list(&target.recipients))
    }

    async fn find_incident_message(
        &self,
        base_url: &str,
        target: &str,
        progress: &mut Progress,
    ) -> String {
        let lookup = match &self.lookup {
            Some(lookup) => lookup.clone(),
            None => match IncidentLookup::with_default_client() {
                Ok(lookup) => lookup,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot create status feed client");
                    progress.note(EXTRA_LOOKUP_ERROR, e.to_string());
                    return String::new();
                }
            },
        };

        let outcome = lookup.find_message(base_url, target).await;
        if let Some(error) = outcome.error {
            progress.note(EXTRA_LOOKUP_ERROR, error.to_string());
        }
        outcome.message
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config_paths", &self.config_paths)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

fn status_page_base(ayd_url: Option<&str>) -> Result<Url, ConfigError> {
    let raw = ayd_url.unwrap_or(DEFAULT_AYD_URL);
    let invalid = |reason: String| ConfigError::InvalidEnv {
        name: ENV_AYD_URL,
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(invalid(format!("{}: not a base URL", raw)));
    }
    Ok(url)
}
