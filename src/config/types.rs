//! Core configuration types.

use std::path::PathBuf;

use super::secret::SecretString;
use crate::address::{Endpoint, MailboxIdentity};

/// System-wide mail.rc locations, read in this order before `~/.mailrc`.
pub const SYSTEM_CONFIG_PATHS: [&str; 3] = [
    "/usr/share/misc/mail.rc",
    "/usr/local/etc/mail.rc",
    "/etc/mail.rc",
];

/// Per-user configuration file name, relative to the home directory.
pub const USER_CONFIG_FILE: &str = ".mailrc";

/// Display name of the built-in sender identity.
pub const DEFAULT_FROM_NAME: &str = "Ayd? Alert";

/// Address of the built-in sender identity.
pub const DEFAULT_FROM_ADDRESS: &str = "ayd@localhost";

/// Candidate configuration files, platform-wide first, then user-level.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = SYSTEM_CONFIG_PATHS.iter().map(PathBuf::from).collect();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(USER_CONFIG_FILE));
    }
    paths
}

/// The placeholder sender used when nothing overrides it.
pub fn default_from() -> MailboxIdentity {
    MailboxIdentity {
        name: DEFAULT_FROM_NAME.to_string(),
        address: DEFAULT_FROM_ADDRESS.to_string(),
    }
}

/// Fully resolved SMTP and sender settings.
///
/// Only produced by the resolver once every required field is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// TLS is mandatory when set, opportunistic otherwise.
    pub secure: bool,
    pub username: String,
    /// SMTP password (never exposed in logs).
    pub password: SecretString,
    pub from: MailboxIdentity,
}

impl Config {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
        }
    }

    pub fn triage(&self) -> Triage {
        Triage {
            smtp_server: self.host.clone(),
            from_address: self.from.to_string(),
        }
    }
}

/// What an operator needs to tell a bad config from a bad recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triage {
    pub smtp_server: String,
    pub from_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_start_with_system_files() {
        let paths = default_config_paths();
        assert_eq!(paths[0], PathBuf::from("/usr/share/misc/mail.rc"));
        assert_eq!(paths[2], PathBuf::from("/etc/mail.rc"));
        if paths.len() == 4 {
            assert!(paths[3].ends_with(".mailrc"));
        }
    }

    #[test]
    fn default_from_renders_as_mailbox() {
        assert_eq!(default_from().to_string(), "Ayd? Alert <ayd@localhost>");
    }

    #[test]
    fn config_debug_hides_password() {
        let config = Config {
            host: "smtp.example.com".to_string(),
            port: 587,
            secure: true,
            username: "alerts".to_string(),
            password: SecretString::new("do-not-print".to_string()),
            from: default_from(),
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("do-not-print"));
        assert!(debug.contains("smtp.example.com"));
    }
}
