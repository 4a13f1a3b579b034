//! Parsing of SMTP endpoints, mailboxes and the `mailto:` alert URL.
//!
//! Nothing in here performs I/O. Mailbox syntax checking is delegated to
//! lettre so that anything accepted here is also accepted by the transport.

use std::fmt;
use std::str::FromStr;

use lettre::Address;
use lettre::message::Mailbox;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::AddressError;

/// Default port of the `smtp` scheme.
pub const SMTP_PORT: u16 = 25;

/// Default port of the `smtps` scheme.
pub const SMTPS_PORT: u16 = 465;

/// URL scheme of the alert channel handled by this program.
pub const ALERT_SCHEME: &str = "mailto";

/// Resolved SMTP server location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// TLS is mandatory when set, opportunistic otherwise.
    pub secure: bool,
}

impl Endpoint {
    /// Parse either an `smtp://`/`smtps://` URL or a bare `host:port` pair.
    ///
    /// A bare pair carries no scheme, so it is treated as `secure`.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        if raw.contains("://") {
            Self::parse_url(raw)
        } else {
            Self::parse_host_port(raw)
        }
    }

    /// Parse a bare `host:port` pair. The port is mandatory.
    pub fn parse_host_port(raw: &str) -> Result<Self, AddressError> {
        let (host, port) = split_host_port(raw)?;
        Ok(Self {
            host,
            port,
            secure: true,
        })
    }

    /// Parse an `smtp://` or `smtps://` URL, filling in the scheme's default
    /// port when none is given. Any path, query or fragment is ignored.
    pub fn parse_url(raw: &str) -> Result<Self, AddressError> {
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| AddressError::UnsupportedProtocol(String::new()))?;

        let (secure, default_port) = match scheme.to_ascii_lowercase().as_str() {
            "smtp" => (false, SMTP_PORT),
            "smtps" => (true, SMTPS_PORT),
            _ => return Err(AddressError::UnsupportedProtocol(scheme.to_string())),
        };

        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let authority = match authority.rsplit_once('@') {
            Some((_userinfo, hostport)) => hostport,
            None => authority,
        };

        let addr = if has_port(authority) {
            authority.to_string()
        } else {
            format!("{}:{}", authority, default_port)
        };

        let (host, port) = split_host_port(&addr)?;
        Ok(Self { host, port, secure })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "smtps" } else { "smtp" };
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", scheme, self.host, self.port)
        }
    }
}

fn has_port(authority: &str) -> bool {
    match authority.strip_prefix('[') {
        Some(bracketed) => bracketed
            .split_once(']')
            .is_some_and(|(_, tail)| tail.starts_with(':')),
        None => authority.contains(':'),
    }
}

/// Split `host:port` the way a dialer expects it, with `[v6]:port` support.
fn split_host_port(addr: &str) -> Result<(String, u16), AddressError> {
    let (host, port) = if let Some(bracketed) = addr.strip_prefix('[') {
        let (host, tail) = bracketed
            .split_once(']')
            .ok_or_else(|| AddressError::MissingPort(addr.to_string()))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| AddressError::MissingPort(addr.to_string()))?;
        (host, port)
    } else {
        addr.rsplit_once(':')
            .ok_or_else(|| AddressError::MissingPort(addr.to_string()))?
    };

    let port: u16 = port.parse().map_err(|_| AddressError::InvalidPort {
        addr: addr.to_string(),
        port: port.to_string(),
    })?;

    if host.is_empty() {
        return Err(AddressError::MissingHost(addr.to_string()));
    }

    Ok((host.to_string(), port))
}

/// A display name paired with a mailbox address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxIdentity {
    pub name: String,
    pub address: String,
}

impl MailboxIdentity {
    /// Build an identity from its parts, validating the address.
    pub fn new(name: impl Into<String>, address: &str) -> Result<Self, AddressError> {
        let parsed = Address::from_str(address).map_err(|e| AddressError::InvalidAddress {
            fragment: address.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.into(),
            address: parsed.to_string(),
        })
    }

    /// Parse a single `Display Name <address>` or bare `address` mailbox.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let mailbox = Mailbox::from_str(trimmed).map_err(|e| AddressError::InvalidAddress {
            fragment: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from(mailbox))
    }

    /// Convert into lettre's mailbox for message building.
    pub fn to_mailbox(&self) -> Result<Mailbox, AddressError> {
        let email = Address::from_str(&self.address).map_err(|e| AddressError::InvalidAddress {
            fragment: self.address.clone(),
            reason: e.to_string(),
        })?;
        let name = (!self.name.is_empty()).then(|| self.name.clone());
        Ok(Mailbox::new(name, email))
    }
}

impl From<Mailbox> for MailboxIdentity {
    fn from(mailbox: Mailbox) -> Self {
        Self {
            name: mailbox.name.unwrap_or_default(),
            address: mailbox.email.to_string(),
        }
    }
}

impl FromStr for MailboxIdentity {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MailboxIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.trim();
        if name.is_empty() {
            return f.write_str(&self.address);
        }
        if name.chars().any(needs_quoting) {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "\"{}\" <{}>", escaped, self.address)
        } else {
            write!(f, "{} <{}>", name, self.address)
        }
    }
}

fn needs_quoting(c: char) -> bool {
    c.is_control() || matches!(c, '(' | ')' | '<' | '>' | '[' | ']' | ':' | ';' | '@' | '\\' | ',' | '"')
}

/// Parse a comma separated mailbox list, preserving order.
pub fn parse_mailbox_list(raw: &str) -> Result<Vec<MailboxIdentity>, AddressError> {
    let fragments: Vec<&str> = split_mailbox_list(raw)
        .into_iter()
        .map(str::trim)
        .collect();

    if fragments.iter().all(|f| f.is_empty()) {
        return Err(AddressError::EmptyList);
    }

    fragments
        .into_iter()
        .map(|fragment| {
            if fragment.is_empty() {
                Err(AddressError::InvalidAddress {
                    fragment: raw.to_string(),
                    reason: "empty entry in address list".to_string(),
                })
            } else {
                MailboxIdentity::parse(fragment)
            }
        })
        .collect()
}

/// Render mailboxes back into a list string.
pub fn format_mailbox_list(mailboxes: &[MailboxIdentity]) -> String {
    mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// Commas inside quoted names or angle brackets do not separate entries.
fn split_mailbox_list(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

/// The alert channel URL, decomposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTarget {
    pub scheme: String,
    pub recipients: Vec<MailboxIdentity>,
    pub override_from: Option<MailboxIdentity>,
}

impl AlertTarget {
    /// Parse a raw `mailto:` URL.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let url = Url::parse(raw).map_err(|e| AddressError::InvalidAddress {
            fragment: raw.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_url(&url)
    }

    /// Decompose an already parsed alert URL.
    pub fn from_url(url: &Url) -> Result<Self, AddressError> {
        if url.scheme() != ALERT_SCHEME {
            return Err(AddressError::UnsupportedProtocol(url.scheme().to_string()));
        }

        let recipients = parse_mailbox_list(&decode_component(url.path())?)?;

        let override_from = url
            .query()
            .into_iter()
            .flat_map(|q| q.split('&'))
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "from")
            .map(|(_, value)| decode_component(value))
            .transpose()?
            .filter(|value| !value.trim().is_empty())
            .map(|value| MailboxIdentity::parse(&value))
            .transpose()?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            recipients,
            override_from,
        })
    }
}

/// The alert URL with its query removed, as reported back to the supervisor.
pub fn channel_target(url: &Url) -> String {
    format!("{}:{}", url.scheme(), url.path())
}

fn decode_component(raw: &str) -> Result<String, AddressError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| AddressError::InvalidAddress {
            fragment: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_with_explicit_ports() {
        let ep = Endpoint::parse_url("smtps://smtp.gmail.com:465").unwrap();
        assert_eq!(
            ep,
            Endpoint {
                host: "smtp.gmail.com".to_string(),
                port: 465,
                secure: true
            }
        );

        let ep = Endpoint::parse_url("smtp://example.com:25").unwrap();
        assert_eq!(ep.host, "example.com");
        assert_eq!(ep.port, 25);
        assert!(!ep.secure);
    }

    #[test]
    fn parse_url_uses_scheme_default_port() {
        let ep = Endpoint::parse_url("smtps://smtp.gmail.com").unwrap();
        assert_eq!(ep.port, SMTPS_PORT);
        assert!(ep.secure);

        let ep = Endpoint::parse_url("smtp://example.com").unwrap();
        assert_eq!(ep.port, SMTP_PORT);
        assert!(!ep.secure);
    }

    #[test]
    fn parse_url_ignores_path_and_userinfo() {
        let ep = Endpoint::parse_url("smtp://user@example.com/foo/bar").unwrap();
        assert_eq!(ep.host, "example.com");
        assert_eq!(ep.port, 25);
    }

    #[test]
    fn parse_url_rejects_unsupported_scheme() {
        let err = Endpoint::parse_url("http://example.com").unwrap_err();
        assert_eq!(err.to_string(), "unsupported protocol: 'http'");
    }

    #[test]
    fn parse_url_rejects_missing_host() {
        let err = Endpoint::parse_url("smtps://:465").unwrap_err();
        assert_eq!(err.to_string(), "address :465: missing host in address");
    }

    #[test]
    fn parse_url_rejects_non_numeric_port() {
        let err = Endpoint::parse_url("smtp://example.com:mail").unwrap_err();
        assert!(matches!(err, AddressError::InvalidPort { .. }));
    }

    #[test]
    fn parse_url_accepts_bracketed_ipv6() {
        let ep = Endpoint::parse_url("smtp://[::1]").unwrap();
        assert_eq!(ep.host, "::1");
        assert_eq!(ep.port, 25);
        assert_eq!(ep.to_string(), "smtp://[::1]:25");
    }

    #[test]
    fn parse_host_port_requires_port() {
        let ep = Endpoint::parse_host_port("example.com:587").unwrap();
        assert_eq!(ep.host, "example.com");
        assert_eq!(ep.port, 587);
        assert!(ep.secure);

        let err = Endpoint::parse_host_port("example.com").unwrap_err();
        assert_eq!(err, AddressError::MissingPort("example.com".to_string()));
    }

    #[test]
    fn parse_dispatches_on_scheme_separator() {
        assert!(!Endpoint::parse("smtp://example.com").unwrap().secure);
        assert!(Endpoint::parse("example.com:25").unwrap().secure);
    }

    #[test]
    fn mailbox_list_preserves_order() {
        let list = parse_mailbox_list("me <me@example.com>, you@example.org").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "me");
        assert_eq!(list[0].address, "me@example.com");
        assert_eq!(list[1].name, "");
        assert_eq!(list[1].address, "you@example.org");
        assert_eq!(
            format_mailbox_list(&list),
            "me <me@example.com>, you@example.org"
        );

        let reparsed = parse_mailbox_list(&format_mailbox_list(&list)).unwrap();
        assert_eq!(reparsed, list);
    }

    #[test]
    fn mailbox_list_keeps_commas_in_quoted_names() {
        let list = parse_mailbox_list("\"Doe, John\" <john@example.com>, ops@example.org").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Doe, John");
        assert_eq!(list[0].to_string(), "\"Doe, John\" <john@example.com>");
    }

    #[test]
    fn mailbox_list_rejects_empty_input() {
        assert_eq!(parse_mailbox_list("  ").unwrap_err(), AddressError::EmptyList);
    }

    #[test]
    fn mailbox_list_reports_offending_fragment() {
        let err = parse_mailbox_list("ok@example.com, broken").unwrap_err();
        match err {
            AddressError::InvalidAddress { fragment, .. } => assert_eq!(fragment, "broken"),
            e => panic!("Expected InvalidAddress, got {:?}", e),
        }
    }

    #[test]
    fn mailbox_without_space_before_angle() {
        let mb = MailboxIdentity::parse("me<me@example.com>").unwrap();
        assert_eq!(mb.name, "me");
        assert_eq!(mb.address, "me@example.com");
    }

    #[test]
    fn mailbox_converts_to_lettre() {
        let mb = MailboxIdentity::new("Ops", "ops@example.org").unwrap();
        let lettre_mb = mb.to_mailbox().unwrap();
        assert_eq!(lettre_mb.name.as_deref(), Some("Ops"));
        assert_eq!(lettre_mb.email.to_string(), "ops@example.org");
    }

    #[test]
    fn alert_url_with_recipients_and_from() {
        let target =
            AlertTarget::parse("mailto:ops@example.org,dev@example.org?from=alert@example.com")
                .unwrap();
        assert_eq!(target.scheme, "mailto");
        assert_eq!(target.recipients.len(), 2);
        assert_eq!(target.recipients[1].address, "dev@example.org");
        assert_eq!(
            target.override_from.unwrap().address,
            "alert@example.com"
        );
    }

    #[test]
    fn alert_url_decodes_percent_encoding() {
        let target = AlertTarget::parse(
            "mailto:Ops%20Team%20%3Cops@example.org%3E?from=Bot%20%3Cbot+alerts@example.com%3E",
        )
        .unwrap();
        assert_eq!(target.recipients[0].name, "Ops Team");
        let from = target.override_from.unwrap();
        assert_eq!(from.name, "Bot");
        assert_eq!(from.address, "bot+alerts@example.com");
    }

    #[test]
    fn alert_url_rejects_other_schemes() {
        let err = AlertTarget::parse("https://example.com").unwrap_err();
        assert_eq!(err, AddressError::UnsupportedProtocol("https".to_string()));
    }

    #[test]
    fn alert_url_requires_recipients() {
        let err = AlertTarget::parse("mailto:?from=a@example.com").unwrap_err();
        assert_eq!(err, AddressError::EmptyList);
    }

    #[test]
    fn channel_target_strips_query() {
        let url = Url::parse("mailto:ops@example.org?from=a@example.com").unwrap();
        assert_eq!(channel_target(&url), "mailto:ops@example.org");
    }
}
