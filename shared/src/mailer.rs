//! Outbound email via SES.

use async_trait::async_trait;
use aws_sdk_ses::types::{Body, Content, Destination, Message};

use crate::{Error, Result};

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the email, returning the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

pub struct SesMailer {
    client: aws_sdk_ses::Client,
    from_email: String,
}

impl SesMailer {
    pub fn new(client: aws_sdk_ses::Client, from_email: impl Into<String>) -> Self {
        Self {
            client,
            from_email: from_email.into(),
        }
    }
}

fn content(data: &str, what: &str) -> Result<Content> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| Error::Aws(format!("Failed to build {}: {}", what, e)))
}

/// HTML alternative of a plain-text body.
fn html_body(subject: &str, text: &str) -> String {
    let escape = |s: &str| {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: sans-serif; padding: 20px;">
    <h2>{}</h2>
    <p>{}</p>
</body>
</html>"#,
        escape(subject),
        escape(text).replace('\n', "<br>")
    )
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let body = Body::builder()
            .html(content(&html_body(&email.subject, &email.text), "html body")?)
            .text(content(&email.text, "text body")?)
            .build();

        let message = Message::builder()
            .subject(content(&email.subject, "subject")?)
            .body(body)
            .build();

        let destination = Destination::builder().to_addresses(&email.to).build();

        let result = self
            .client
            .send_email()
            .source(&self.from_email)
            .destination(destination)
            .message(message)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to send email: {}", e)))?;

        Ok(result.message_id().to_string())
    }
}
