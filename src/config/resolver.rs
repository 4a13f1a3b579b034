//! Layered configuration resolution.
//!
//! Precedence, lowest first: built-in defaults, config files in the order
//! given, environment variables. Later sources win field by field.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::env::{
    ENV_MAIL_FROM, ENV_SMTP_PASSWORD, ENV_SMTP_SERVER, ENV_SMTP_USERNAME, EnvSource, lookup,
};
use super::mailrc::{Setting, Settings};
use super::secret::SecretString;
use super::types::{Config, Triage, default_from};
use crate::address::{Endpoint, MailboxIdentity};
use crate::error::ConfigError;

const KEY_SMTP: &str = "smtp";
const KEY_SMTP_USER: &str = "smtp-auth-user";
const KEY_SMTP_PASSWORD: &str = "smtp-auth-password";
const KEY_FROM: &str = "from";

/// Resolve the configuration from `paths` and `env` in one go.
pub fn resolve<P: AsRef<Path>>(paths: &[P], env: &dyn EnvSource) -> Result<Config, ConfigError> {
    let mut resolver = ConfigResolver::new();
    resolver.load_files(paths)?;
    resolver.apply_env(env)?;
    resolver.build()
}

/// In-progress configuration.
///
/// Kept separate from [`Config`] so a half-filled value never leaves the
/// resolver; only [`ConfigResolver::triage`] exposes anything on failure.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    host: String,
    port: u16,
    secure: bool,
    username: String,
    password: SecretString,
    from: MailboxIdentity,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            secure: true,
            username: String::new(),
            password: SecretString::default(),
            from: default_from(),
        }
    }
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every existing file in order. Missing files are skipped; any
    /// other I/O failure or a malformed value stops resolution.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), ConfigError> {
        for path in paths {
            self.load_file(path.as_ref())?;
        }
        Ok(())
    }

    /// Apply one file. Returns `false` if it does not exist.
    pub fn load_file(&mut self, path: &Path) -> Result<bool, ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, skipping");
                return Ok(false);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        tracing::debug!(path = %path.display(), "loading config file");
        self.load_reader(file, path)?;
        Ok(true)
    }

    /// Apply `set` assignments read from `reader`; `origin` is used in errors.
    pub fn load_reader<R: Read>(&mut self, reader: R, origin: &Path) -> Result<(), ConfigError> {
        for setting in Settings::new(BufReader::new(reader), origin) {
            self.apply_setting(setting?, origin)?;
        }
        Ok(())
    }

    fn apply_setting(&mut self, setting: Setting, origin: &Path) -> Result<(), ConfigError> {
        let invalid = |source| ConfigError::InvalidValue {
            path: origin.to_path_buf(),
            line: setting.line,
            key: setting.key.clone(),
            source,
        };

        match setting.key.as_str() {
            KEY_SMTP => {
                let endpoint = Endpoint::parse(&setting.value).map_err(invalid)?;
                self.set_endpoint(endpoint);
            }
            KEY_SMTP_USER => self.username = setting.value,
            KEY_SMTP_PASSWORD => self.password = SecretString::new(setting.value),
            KEY_FROM => self.from = MailboxIdentity::parse(&setting.value).map_err(invalid)?,
            _ => {}
        }
        Ok(())
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self, env: &dyn EnvSource) -> Result<(), ConfigError> {
        if let Some(server) = lookup(env, ENV_SMTP_SERVER) {
            let endpoint =
                Endpoint::parse_host_port(&server).map_err(|e| ConfigError::InvalidEnv {
                    name: ENV_SMTP_SERVER,
                    reason: e.to_string(),
                })?;
            self.set_endpoint(endpoint);
        }

        if let Some(username) = lookup(env, ENV_SMTP_USERNAME) {
            self.username = username;
        }
        if let Some(password) = lookup(env, ENV_SMTP_PASSWORD) {
            self.password = SecretString::new(password);
        }

        if let Some(from) = lookup(env, ENV_MAIL_FROM) {
            self.from = MailboxIdentity::parse(&from).map_err(|e| ConfigError::InvalidEnv {
                name: ENV_MAIL_FROM,
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.host = endpoint.host;
        self.port = endpoint.port;
        self.secure = endpoint.secure;
    }

    /// SMTP host and sender seen so far, once a host is known.
    pub fn triage(&self) -> Option<Triage> {
        (!self.host.is_empty()).then(|| Triage {
            smtp_server: self.host.clone(),
            from_address: self.from.to_string(),
        })
    }

    /// Check required fields and produce the final [`Config`].
    ///
    /// Only the first missing field is reported.
    pub fn build(&self) -> Result<Config, ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingField("SMTP_SERVER"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::MissingField("SMTP_USERNAME"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingField("SMTP_PASSWORD"));
        }

        Ok(Config {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
            username: self.username.clone(),
            password: self.password.clone(),
            from: self.from.clone(),
        })
    }
}
