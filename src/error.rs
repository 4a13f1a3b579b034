//! Centralized error types for ayd-mailto-alert using thiserror.
//!
//! Everything after argument parsing is turned into a reported outcome, so
//! the `Display` text of these errors is what the supervisor ends up seeing.

use std::path::PathBuf;

use thiserror::Error;

/// Bad process arguments. Reported on stderr, never through the outcome channel.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid alert URL '{url}': {message}")]
    InvalidAlertUrl { url: String, message: String },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Malformed SMTP endpoints or mailbox strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address {0}: missing host in address")]
    MissingHost(String),
    #[error("address {0}: missing port in address")]
    MissingPort(String),
    #[error("address {addr}: invalid port \"{port}\"")]
    InvalidPort { addr: String, port: String },
    #[error("unsupported protocol: '{0}'")]
    UnsupportedProtocol(String),
    #[error("invalid mail address '{fragment}': {reason}")]
    InvalidAddress { fragment: String, reason: String },
    #[error("no mail address given")]
    EmptyList,
}

/// Errors related to SMTP configuration resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("environment variable `{name}` is invalid: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
    #[error("{}:{line}: invalid `{key}`: {source}", .path.display())]
    InvalidValue {
        path: PathBuf,
        line: usize,
        key: String,
        source: AddressError,
    },
    #[error("{}:{line}: unbalanced quotes", .path.display())]
    Syntax { path: PathBuf, line: usize },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Status feed failures. Never fatal; callers fall back to an empty message.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("invalid status feed URL: {0}")]
    InvalidUrl(String),
    #[error("failed to fetch status feed: {0}")]
    Request(String),
    #[error("status feed returned HTTP {0}")]
    Status(u16),
    #[error("malformed status feed: {0}")]
    Decode(String),
}

/// Errors related to template rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template '{name}' not found")]
    NotFound { name: String },
    #[error("template render failed: {message}")]
    RenderFailed { message: String },
}

/// Errors related to building or submitting the e-mail.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to build e-mail: {0}")]
    Build(String),
    #[error("failed to set up SMTP transport: {0}")]
    Transport(String),
    #[error("failed to send e-mail: {0}")]
    Send(String),
}

/// Any failure of the dispatch pipeline once arguments have been accepted.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("mail address is invalid: {0}")]
    Address(#[from] AddressError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
