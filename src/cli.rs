//! Command-line interface for ayd-mailto-alert using clap.
//!
//! Ayd runs the plugin as `ayd-mailto-alert ALERT_URL RECORD`.

use clap::{Parser, ValueEnum};
use url::Url;

use crate::address::ALERT_SCHEME;
use crate::dispatch::Invocation;
use crate::error::UsageError;
use crate::record::CheckRecord;

/// Program name used in version and usage output.
pub const PROGRAM_NAME: &str = "ayd-mailto-alert";

/// Build commit, injected at compile time.
pub const COMMIT: &str = match option_env!("AYD_MAILTO_ALERT_COMMIT") {
    Some(commit) => commit,
    None => "UNKNOWN",
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format for log aggregation.
    Json,
}

/// E-mail alert plugin for Ayd? status monitoring.
#[derive(Parser, Debug)]
#[command(name = PROGRAM_NAME)]
#[command(about = "Send Ayd? alerts by e-mail")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print version and exit.
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Alert channel URL, e.g. `mailto:ops@example.com`.
    #[arg(value_name = "ALERT_URL")]
    pub alert_url: Option<String>,

    /// Check record as JSON or a tab separated line.
    #[arg(value_name = "RECORD")]
    pub record: Option<String>,
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Version,
    Dispatch(Invocation),
}

impl Cli {
    /// Validate the argument shape into a [`Command`].
    pub fn into_command(self) -> Result<Command, UsageError> {
        if self.version {
            return Ok(Command::Version);
        }

        let alert_url = self
            .alert_url
            .ok_or(UsageError::MissingArgument("ALERT_URL"))?;
        let record = self.record.ok_or(UsageError::MissingArgument("RECORD"))?;

        Ok(Command::Dispatch(Invocation {
            alert_url: parse_alert_url(&alert_url)?,
            record: CheckRecord::parse(&record)?,
        }))
    }
}

fn parse_alert_url(raw: &str) -> Result<Url, UsageError> {
    let invalid = |message: String| UsageError::InvalidAlertUrl {
        url: raw.to_string(),
        message,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != ALERT_SCHEME {
        return Err(invalid(format!("expected scheme '{}'", ALERT_SCHEME)));
    }
    Ok(url)
}

/// `ayd-mailto-alert <version> (<commit>)`
pub fn version_string() -> String {
    format!("{} {} ({})", PROGRAM_NAME, env!("CARGO_PKG_VERSION"), COMMIT)
}

/// Usage line printed on argument errors.
pub fn usage() -> String {
    format!("usage: {} [--log-format FORMAT] ALERT_URL RECORD", PROGRAM_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Status;
    use serial_test::serial;

    const RECORD: &str = r#"{"time":"2021-01-02T15:04:05Z","status":"FAILURE","target":"https://svc/health","message":"timeout"}"#;

    fn parse(args: &[&str]) -> Result<Command, UsageError> {
        let mut argv = vec![PROGRAM_NAME];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into_command()
    }

    #[test]
    fn cli_short_version_flag() {
        assert_eq!(parse(&["-v"]).unwrap(), Command::Version);
    }

    #[test]
    fn cli_long_version_flag_ignores_positionals() {
        assert_eq!(
            parse(&["--version", "mailto:a@example.org"]).unwrap(),
            Command::Version
        );
    }

    #[test]
    fn cli_dispatch_arguments() {
        let Command::Dispatch(invocation) = parse(&["mailto:ops@example.org", RECORD]).unwrap()
        else {
            panic!("expected dispatch");
        };
        assert_eq!(invocation.alert_url.as_str(), "mailto:ops@example.org");
        assert_eq!(invocation.record.status, Status::Failure);
        assert_eq!(invocation.record.target, "https://svc/health");
    }

    #[test]
    fn cli_missing_arguments_rejected() {
        assert!(matches!(
            parse(&[]),
            Err(UsageError::MissingArgument("ALERT_URL"))
        ));
        assert!(matches!(
            parse(&["mailto:ops@example.org"]),
            Err(UsageError::MissingArgument("RECORD"))
        ));
    }

    #[test]
    fn cli_extra_positional_rejected() {
        assert!(Cli::try_parse_from([PROGRAM_NAME, "mailto:a@b.c", RECORD, "extra"]).is_err());
    }

    #[test]
    fn cli_wrong_scheme_rejected() {
        let err = parse(&["https://example.org", RECORD]).unwrap_err();
        assert!(matches!(err, UsageError::InvalidAlertUrl { .. }));
        assert!(err.to_string().contains("expected scheme 'mailto'"));
    }

    #[test]
    fn cli_bad_record_rejected() {
        assert!(matches!(
            parse(&["mailto:ops@example.org", "garbage"]),
            Err(UsageError::InvalidRecord(_))
        ));
    }

    #[test]
    fn version_string_format() {
        let version = version_string();
        assert!(version.starts_with("ayd-mailto-alert "));
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
        assert!(version.ends_with(')'));
    }

    #[test]
    #[serial]
    fn cli_log_format_default() {
        temp_env::with_var_unset("LOG_FORMAT", || {
            let cli = Cli::try_parse_from([PROGRAM_NAME, "-v"]).unwrap();
            assert!(matches!(cli.log_format, LogFormat::Text));
        });
    }

    #[test]
    #[serial]
    fn cli_log_format_from_env() {
        temp_env::with_var("LOG_FORMAT", Some("json"), || {
            let cli = Cli::try_parse_from([PROGRAM_NAME, "-v"]).unwrap();
            assert!(matches!(cli.log_format, LogFormat::Json));
        });
    }

    #[test]
    #[serial]
    fn cli_log_format_flag_overrides_env() {
        temp_env::with_var("LOG_FORMAT", Some("json"), || {
            let cli = Cli::try_parse_from([PROGRAM_NAME, "--log-format", "text", "-v"]).unwrap();
            assert!(matches!(cli.log_format, LogFormat::Text));
        });
    }

    #[test]
    fn cli_log_format_invalid_rejected() {
        assert!(Cli::try_parse_from([PROGRAM_NAME, "--log-format", "xml"]).is_err());
    }
}
