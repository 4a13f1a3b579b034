//! Mail body rendering with minijinja.
//!
//! The plain text and HTML bodies come from two static templates compiled
//! into the binary. The HTML template is rendered with auto-escaping since
//! target URLs and messages come from checked services.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use crate::compose::RenderContext;
use crate::error::TemplateError;

/// Name of the plain text body template.
pub const TEXT_TEMPLATE: &str = "mail.txt";

/// Name of the HTML body template.
pub const HTML_TEMPLATE: &str = "mail.html";

const TEXT_SOURCE: &str = include_str!("../templates/mail.txt.j2");
const HTML_SOURCE: &str = include_str!("../templates/mail.html.j2");

/// Subject and both body parts of an alert mail.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Template engine holding the two mail templates.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Engine with the built-in templates.
    pub fn new() -> Result<Self, TemplateError> {
        Self::with_sources(TEXT_SOURCE, HTML_SOURCE)
    }

    /// Engine with custom template sources.
    pub fn with_sources(text: &'static str, html: &'static str) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_auto_escape_callback(|name| {
            if name.ends_with(".html") {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });

        for (name, source) in [(TEXT_TEMPLATE, text), (HTML_TEMPLATE, html)] {
            env.add_template(name, source)
                .map_err(|e| TemplateError::RenderFailed {
                    message: format!("{}: {}", name, e),
                })?;
        }

        Ok(Self { env })
    }

    /// Render subject, text and HTML parts for `ctx`.
    pub fn render(&self, ctx: &RenderContext) -> Result<RenderedMail, TemplateError> {
        tracing::trace!(subject = %ctx.subject, "rendering mail templates");

        Ok(RenderedMail {
            subject: ctx.subject.clone(),
            text: self.render_one(TEXT_TEMPLATE, ctx)?,
            html: self.render_one(HTML_TEMPLATE, ctx)?,
        })
    }

    fn render_one(&self, name: &str, ctx: &RenderContext) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|_| TemplateError::NotFound {
                name: name.to_string(),
            })?;
        template.render(ctx).map_err(|e| TemplateError::RenderFailed {
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("templates", &[TEXT_TEMPLATE, HTML_TEMPLATE])
            .finish()
    }
}
