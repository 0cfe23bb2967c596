//! Invitation delivery queue (SQS).

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use tracing::debug;

use crate::models::InviteMessage;
use crate::{Error, Result};

/// Hands invitation messages to the delivery queue.
#[async_trait]
pub trait InvitePublisher: Send + Sync {
    async fn publish(&self, message: &InviteMessage) -> Result<()>;
}

/// Publisher backed by an SQS standard queue.
pub struct SqsPublisher {
    client: SqsClient,
    queue_url: Option<String>,
}

impl SqsPublisher {
    /// A missing queue URL is reported on each publish.
    pub fn new(client: SqsClient, queue_url: Option<String>) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl InvitePublisher for SqsPublisher {
    async fn publish(&self, message: &InviteMessage) -> Result<()> {
        let queue_url = self
            .queue_url
            .as_deref()
            .ok_or_else(|| Error::Config("INVITE_QUEUE_URL not set".to_string()))?;

        let body = serde_json::to_string(message)?;

        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to enqueue invite: {}", e)))?;

        debug!(message_id = ?output.message_id(), "Invite enqueued");
        Ok(())
    }
}
