// src/lib.rs
//! ayd-mailto-alert - e-mail alert plugin for the Ayd? status monitor.

pub mod address;
pub mod cli;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod incident;
pub mod notify;
pub mod record;
pub mod template;

// Re-export commonly used types
pub use address::{AlertTarget, Endpoint, MailboxIdentity};
pub use cli::LogFormat;
pub use compose::{AlertComposer, AnchorStrategy, HashAnchor, NoAnchor, RenderContext};
pub use config::{Config, ConfigResolver, EnvSource, ProcessEnv};
pub use dispatch::{DispatchState, Dispatcher, Invocation};
pub use incident::IncidentLookup;
pub use notify::{
    JsonLineReporter, MailTransport, Outcome, OutcomeReporter, SmtpTransportFactory,
    TransportFactory,
};
pub use record::{CheckRecord, Status};
pub use template::{RenderedMail, TemplateEngine};
