//! SMTP delivery of the alert mail.
//!
//! # Testability
//!
//! The transport is abstracted behind [`MailTransport`] and created by a
//! [`TransportFactory`]:
//! - Production: [`SmtpTransportFactory`] builds an `AsyncSmtpTransport<Tokio1Executor>`
//! - Testing: a recording transport, no SMTP server needed

use async_trait::async_trait;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::address::{MailboxIdentity, SMTPS_PORT};
use crate::config::Config;
use crate::error::{DeliveryError, DispatchError};
use crate::template::RenderedMail;

/// Async email transport abstraction for testability.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Submit one message. The error is the transport's own description.
    async fn send_email(&self, message: Message) -> Result<(), String>;
}

/// Opens one SMTP session per run from the resolved configuration.
pub trait TransportFactory: Send + Sync {
    fn open(&self, config: &Config) -> Result<Box<dyn MailTransport>, DeliveryError>;
}

/// How TLS is negotiated for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// TLS from the first byte (SMTPS).
    Wrapper,
    /// STARTTLS, failing if the server does not offer it.
    Required,
    /// STARTTLS when offered, plain text otherwise.
    Opportunistic,
}

impl TlsPolicy {
    /// Port 465 always means implicit TLS; elsewhere `secure` decides
    /// whether STARTTLS is mandatory.
    pub fn for_endpoint(port: u16, secure: bool) -> Self {
        if port == SMTPS_PORT {
            TlsPolicy::Wrapper
        } else if secure {
            TlsPolicy::Required
        } else {
            TlsPolicy::Opportunistic
        }
    }
}

/// Where and how an SMTP session will connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub host: String,
    pub port: u16,
    pub tls: TlsPolicy,
}

impl SessionPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            tls: TlsPolicy::for_endpoint(config.port, config.secure),
        }
    }
}

/// Real SMTP transport wrapper implementing `MailTransport`.
pub struct SmtpMailTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { inner: transport }
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send_email(&self, message: Message) -> Result<(), String> {
        self.inner
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Builds lettre SMTP transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn open(&self, config: &Config) -> Result<Box<dyn MailTransport>, DeliveryError> {
        let plan = SessionPlan::from_config(config);

        let tls_parameters = TlsParameters::builder(plan.host.clone())
            .build()
            .map_err(|e| DeliveryError::Transport(format!("TLS configuration error: {}", e)))?;

        let tls = match plan.tls {
            TlsPolicy::Wrapper => Tls::Wrapper(tls_parameters),
            TlsPolicy::Required => Tls::Required(tls_parameters),
            TlsPolicy::Opportunistic => Tls::Opportunistic(tls_parameters),
        };

        tracing::debug!(
            host = %plan.host,
            port = plan.port,
            tls = ?plan.tls,
            "opening SMTP transport"
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&plan.host)
            .port(plan.port)
            .tls(tls)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose().to_string(),
            ))
            .build();

        Ok(Box::new(SmtpMailTransport::new(transport)))
    }
}

/// Assemble the multipart alert mail: one `To` entry per recipient, in order.
pub fn build_message(
    from: &MailboxIdentity,
    recipients: &[MailboxIdentity],
    mail: &RenderedMail,
) -> Result<Message, DispatchError> {
    let mut builder = Message::builder()
        .from(from.to_mailbox()?)
        .subject(mail.subject.as_str());

    for recipient in recipients {
        builder = builder.to(recipient.to_mailbox()?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        ))
        .map_err(|e| DeliveryError::Build(e.to_string()).into())
}
