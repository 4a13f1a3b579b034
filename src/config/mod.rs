//! Configuration resolution for ayd-mailto-alert.
//!
//! SMTP settings come from mailx-style `mail.rc` files and are then
//! overridden by environment variables.

mod env;
mod mailrc;
mod resolver;
mod secret;
mod types;

// Re-exports publics
pub use env::{
    ENV_AYD_URL, ENV_MAIL_FROM, ENV_SMTP_PASSWORD, ENV_SMTP_SERVER, ENV_SMTP_USERNAME, EnvSource,
    ProcessEnv, lookup,
};
pub use mailrc::{Setting, Settings};
pub use resolver::{ConfigResolver, resolve};
pub use secret::SecretString;
pub use types::{
    Config, DEFAULT_FROM_ADDRESS, DEFAULT_FROM_NAME, SYSTEM_CONFIG_PATHS, Triage, USER_CONFIG_FILE,
    default_config_paths, default_from,
};
