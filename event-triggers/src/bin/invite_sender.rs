//! Invite Sender Lambda - Delivers queued invitation emails.
//!
//! This Lambda is triggered by the invite SQS queue and:
//! 1. Parses each record body as an invitation message
//! 2. Skips records that are malformed or have no recipient
//! 3. Sends the rest through SES concurrently
//! 4. Fails the invocation if any send failed, so the batch is redelivered

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::dispatch::{dispatch_batch, DispatchReport, SqsEvent};
use shared::mailer::SesMailer;
use shared::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct AppState {
    mailer: SesMailer,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        info!(from_email = %config.from_email, region = %config.aws_region, "Invite sender configured");

        Ok(Self {
            mailer: SesMailer::new(aws_sdk_ses::Client::new(&aws), config.from_email),
        })
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<SqsEvent>) -> Result<DispatchReport, Error> {
    let (batch, context) = event.into_parts();
    info!(
        request_id = %context.request_id,
        records = batch.records.len(),
        "Processing invite batch"
    );

    Ok(dispatch_batch(&state.mailer, &batch).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
