//! Alert delivery and outcome reporting.
//!
//! ```text
//! Dispatcher ──► build_message ──► TransportFactory::open ──► MailTransport::send_email
//!      │
//!      └────► OutcomeReporter::report (one JSON line on stdout)
//! ```

pub mod email;
pub mod report;

pub use email::{
    MailTransport, SessionPlan, SmtpMailTransport, SmtpTransportFactory, TlsPolicy,
    TransportFactory, build_message,
};
pub use report::{JsonLineReporter, Outcome, OutcomeLog, OutcomeReporter};
