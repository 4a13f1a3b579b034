//! Environment variable access.
//!
//! The resolver never touches `std::env` directly; it reads through an
//! [`EnvSource`] so tests can hand it a plain map.

use std::collections::HashMap;

/// SMTP server as `host:port`.
pub const ENV_SMTP_SERVER: &str = "smtp_server";

/// SMTP auth user.
pub const ENV_SMTP_USERNAME: &str = "smtp_username";

/// SMTP auth password.
pub const ENV_SMTP_PASSWORD: &str = "smtp_password";

/// Sender identity override.
pub const ENV_MAIL_FROM: &str = "ayd_mail_from";

/// Base URL of the Ayd instance, used for the status page and status feed.
pub const ENV_AYD_URL: &str = "ayd_url";

/// A read-only key/value view of the environment.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Look a variable up by its lower-case name first, then its upper-case name.
///
/// Empty values count as unset.
pub fn lookup(env: &dyn EnvSource, name: &str) -> Option<String> {
    [name.to_lowercase(), name.to_uppercase()]
        .into_iter()
        .filter_map(|key| env.var(&key))
        .find(|value| !value.is_empty())
}
