//! Delivery of queued invitation messages.
//!
//! A record without a recipient is skipped; it would fail the same way on
//! every redelivery. All remaining deliveries are attempted, and the batch
//! fails if any of them did, so SQS redelivers it (and eventually
//! dead-letters it).

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::invites::{INVITE_SUBJECT, INVITE_TTL_DAYS};
use crate::mailer::{Mailer, OutgoingEmail};
use crate::models::InviteMessage;
use crate::{Error, Result};

/// SQS event wrapper
#[derive(Debug, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SqsRecord {
    #[serde(rename = "messageId", default)]
    pub message_id: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct DispatchReport {
    pub emails_sent: u32,
    pub skipped: u32,
}

/// Text of the invitation email.
pub fn render_invite_email(message: &InviteMessage, to: &str) -> OutgoingEmail {
    let intro = message
        .message
        .as_deref()
        .unwrap_or("You have been invited to join a campaign!");
    let link = message.accept.as_deref().unwrap_or_default();

    let text = format!(
        "{intro}\n\n\
         To accept this invitation, click the following link:\n\
         {link}\n\n\
         This invitation will expire in {INVITE_TTL_DAYS} days.\n\n\
         If you have any questions, please contact the campaign Game Master."
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: message
            .subject
            .clone()
            .unwrap_or_else(|| INVITE_SUBJECT.to_string()),
        text,
    }
}

fn parse_record(record: &SqsRecord) -> Option<OutgoingEmail> {
    let message: InviteMessage = match serde_json::from_str(record.body.as_deref().unwrap_or("{}")) {
        Ok(m) => m,
        Err(e) => {
            error!(message_id = %record.message_id, error = %e, "Failed to parse invite message");
            return None;
        }
    };

    match message.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(to) => Some(render_invite_email(&message, to)),
        None => {
            warn!(message_id = %record.message_id, "Skipping message without email");
            None
        }
    }
}

/// Deliver every well-formed record of the batch.
pub async fn dispatch_batch<M>(mailer: &M, event: &SqsEvent) -> Result<DispatchReport>
where
    M: Mailer + ?Sized,
{
    let emails: Vec<OutgoingEmail> = event.records.iter().filter_map(parse_record).collect();
    let skipped = (event.records.len() - emails.len()) as u32;

    let results = join_all(emails.iter().map(|email| mailer.send(email))).await;

    let mut failures = 0u32;
    for (email, result) in emails.iter().zip(&results) {
        match result {
            Ok(message_id) => info!(message_id = %message_id, "Sent invite email"),
            Err(e) => {
                failures += 1;
                error!(error = %e, recipient_domain = email.to.split('@').nth(1).unwrap_or(""), "Failed to send invite email");
            }
        }
    }

    if failures > 0 {
        return Err(Error::Aws(format!(
            "{} of {} invite emails failed",
            failures,
            emails.len()
        )));
    }

    let report = DispatchReport {
        emails_sent: emails.len() as u32,
        skipped,
    };
    info!(sent = report.emails_sent, skipped = report.skipped, "Invite batch delivered");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMailer {
        attempts: Mutex<Vec<OutgoingEmail>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<String> {
            self.attempts.lock().unwrap().push(email.clone());
            if self.reject.as_deref() == Some(email.to.as_str()) {
                return Err(Error::Aws("MessageRejected".into()));
            }
            Ok(format!("msg-{}", email.to))
        }
    }

    fn record(id: &str, body: serde_json::Value) -> SqsRecord {
        SqsRecord {
            message_id: id.to_string(),
            body: Some(body.to_string()),
        }
    }

    fn invite(email: &str) -> serde_json::Value {
        json!({
            "email": email,
            "campaignId": "c1",
            "token": "ab12",
            "accept": "/v1/invites/ab12/accept",
            "subject": "Campaign Invite",
            "message": "You are invited. Use the acceptance link.",
        })
    }

    #[test]
    fn test_sqs_event_shape() {
        let event: SqsEvent = serde_json::from_value(json!({
            "Records": [{ "messageId": "m-1", "body": "{}", "receiptHandle": "r", "eventSource": "aws:sqs" }]
        }))
        .unwrap();
        assert_eq!(event.records[0].message_id, "m-1");
    }

    #[test]
    fn test_rendered_email_carries_link_and_expiry() {
        let message: InviteMessage = serde_json::from_value(invite("p@example.com")).unwrap();
        let email = render_invite_email(&message, "p@example.com");
        assert_eq!(email.subject, "Campaign Invite");
        assert!(email.text.starts_with("You are invited."));
        assert!(email.text.contains("/v1/invites/ab12/accept"));
        assert!(email.text.contains("expire in 7 days"));

        let bare: InviteMessage = serde_json::from_value(json!({ "email": "p@example.com" })).unwrap();
        let email = render_invite_email(&bare, "p@example.com");
        assert_eq!(email.subject, INVITE_SUBJECT);
        assert!(email.text.starts_with("You have been invited"));
    }

    #[tokio::test]
    async fn test_missing_email_skipped_others_sent() {
        let mailer = FakeMailer::default();
        let mut no_email = invite("x@example.com");
        no_email.as_object_mut().unwrap().remove("email");
        let event = SqsEvent {
            records: vec![
                record("m-1", invite("a@example.com")),
                record("m-2", no_email),
                record("m-3", invite("b@example.com")),
            ],
        };

        let report = dispatch_batch(&mailer, &event).await.unwrap();

        assert_eq!(report.emails_sent, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(mailer.attempts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_skipped() {
        let mailer = FakeMailer::default();
        let event = SqsEvent {
            records: vec![
                SqsRecord {
                    message_id: "m-1".into(),
                    body: Some("not json".into()),
                },
                record("m-2", invite("a@example.com")),
            ],
        };

        let report = dispatch_batch(&mailer, &event).await.unwrap();
        assert_eq!(report.emails_sent, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_one_failure_still_attempts_all_then_fails_batch() {
        let mailer = FakeMailer {
            reject: Some("a@example.com".into()),
            ..Default::default()
        };
        let event = SqsEvent {
            records: vec![
                record("m-1", invite("a@example.com")),
                record("m-2", invite("b@example.com")),
                record("m-3", invite("c@example.com")),
            ],
        };

        let result = dispatch_batch(&mailer, &event).await;

        assert!(result.is_err());
        assert_eq!(mailer.attempts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = dispatch_batch(&FakeMailer::default(), &SqsEvent { records: vec![] })
            .await
            .unwrap();
        assert_eq!(report.emails_sent, 0);
    }
}
