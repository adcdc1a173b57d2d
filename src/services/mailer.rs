//! Outbound email: template rendering plus the delivery providers.

use async_trait::async_trait;
use reqwest::Client;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{MailConfig, MailProvider};

pub const USER_INVITATION_TEMPLATE: &str = "user_invitation.tmpl";

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider rejected message with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Delivery capability consumed by the user lifecycle.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Renders `template` with `vars` and delivers it. Returns the provider's
    /// status code on success.
    async fn send(
        &self,
        template: &str,
        recipient_name: &str,
        recipient_email: &str,
        vars: &HashMap<String, String>,
        sandbox: bool,
    ) -> Result<u16, MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Templates start with a `Subject:` line; the remainder is the HTML body.
/// `{{name}}` placeholders are replaced, HTML-escaped in the body.
pub fn render(template: &str, vars: &HashMap<String, String>) -> Result<RenderedMail, MailError> {
    let file = Templates::get(template)
        .ok_or_else(|| MailError::TemplateNotFound(template.to_string()))?;
    let source = std::str::from_utf8(&file.data)
        .map_err(|e| MailError::Template(format!("{template} is not UTF-8: {e}")))?;

    render_source(source, vars)
}

fn render_source(source: &str, vars: &HashMap<String, String>) -> Result<RenderedMail, MailError> {
    let (first_line, body) = source.split_once('\n').unwrap_or((source, ""));
    let subject = first_line
        .strip_prefix("Subject:")
        .ok_or_else(|| MailError::Template("missing Subject line".to_string()))?
        .trim();

    let mut subject = subject.to_string();
    let mut html = body.trim_start().to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{key}}}}}");
        subject = subject.replace(&placeholder, value);
        html = html.replace(&placeholder, &html_escape::encode_double_quoted_attribute(value));
    }

    let text = html2text::from_read(html.as_bytes(), 80)
        .map_err(|e| MailError::Template(e.to_string()))?;

    Ok(RenderedMail {
        subject,
        html,
        text,
    })
}

#[must_use]
pub fn from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match config.provider {
        MailProvider::Mailtrap => Arc::new(MailtrapMailer::new(config)),
        MailProvider::Log => Arc::new(LogMailer),
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: [Address<'a>; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    category: &'a str,
}

/// Mailtrap HTTP send API.
pub struct MailtrapMailer {
    client: Client,
    api_url: String,
    sandbox_api_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl MailtrapMailer {
    #[must_use]
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("postline/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: config.api_url.clone(),
            sandbox_api_url: config.sandbox_api_url.clone(),
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }
}

#[async_trait]
impl Mailer for MailtrapMailer {
    async fn send(
        &self,
        template: &str,
        recipient_name: &str,
        recipient_email: &str,
        vars: &HashMap<String, String>,
        sandbox: bool,
    ) -> Result<u16, MailError> {
        let mail = render(template, vars)?;
        let category = template.trim_end_matches(".tmpl");

        let request = SendRequest {
            from: Address {
                email: &self.from_email,
                name: &self.from_name,
            },
            to: [Address {
                email: recipient_email,
                name: recipient_name,
            }],
            subject: &mail.subject,
            html: &mail.html,
            text: &mail.text,
            category,
        };

        let url = if sandbox {
            &self.sandbox_api_url
        } else {
            &self.api_url
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Mailtrap rejected message");
            return Err(MailError::Rejected(status.as_u16()));
        }

        Ok(status.as_u16())
    }
}

/// Renders and logs instead of delivering. For local development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        template: &str,
        recipient_name: &str,
        recipient_email: &str,
        vars: &HashMap<String, String>,
        sandbox: bool,
    ) -> Result<u16, MailError> {
        let mail = render(template, vars)?;

        info!(
            to = %recipient_email,
            name = %recipient_name,
            subject = %mail.subject,
            sandbox,
            "Email not delivered (log provider)\n{}",
            mail.text
        );

        Ok(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_render_invitation_template() {
        let mail = render(
            USER_INVITATION_TEMPLATE,
            &vars(&[
                ("username", "alice"),
                ("activation_url", "http://localhost/confirm/abc"),
                ("expiry_hours", "72"),
            ]),
        )
        .unwrap();

        assert_eq!(mail.subject, "Finish signing up for Postline");
        assert!(mail.html.contains("Hi alice,"));
        assert!(mail.html.contains("http://localhost/confirm/abc"));
        assert!(mail.text.contains("alice"));
        assert!(!mail.html.contains("{{"));
    }

    #[test]
    fn test_values_are_escaped_in_body() {
        let mail = render_source(
            "Subject: Hello {{name}}\n<p>{{name}}</p>",
            &vars(&[("name", "<b>bob</b>")]),
        )
        .unwrap();

        assert_eq!(mail.subject, "Hello <b>bob</b>");
        assert_eq!(mail.html, "<p>&lt;b&gt;bob&lt;/b&gt;</p>");
    }

    #[test]
    fn test_missing_subject_line() {
        let err = render_source("<p>hi</p>", &HashMap::new()).unwrap_err();
        assert!(matches!(err, MailError::Template(_)));
    }

    #[test]
    fn test_unknown_template() {
        let err = render("nope.tmpl", &HashMap::new()).unwrap_err();
        assert!(matches!(err, MailError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        let status = LogMailer
            .send(
                USER_INVITATION_TEMPLATE,
                "alice",
                "alice@example.com",
                &vars(&[("username", "alice")]),
                true,
            )
            .await
            .unwrap();

        assert_eq!(status, 200);
    }
}
