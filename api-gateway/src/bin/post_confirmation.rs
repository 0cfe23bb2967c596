//! Post Confirmation Lambda - Cognito Post-Confirmation Trigger
//!
//! Adds every newly confirmed user to the default group. Failures are logged
//! and never block sign-up; Cognito always receives the event back unchanged.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Deserialize;
use serde_json::Value;
use shared::directory::{CognitoDirectory, UserDirectory};
use shared::Config;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// The fields of the trigger event this function reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CognitoTriggerEvent {
    #[serde(default)]
    trigger_source: Option<String>,
    #[serde(default)]
    user_pool_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
}

struct AppState {
    config: Config,
    cognito: aws_sdk_cognitoidentityprovider::Client,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        Ok(Self {
            cognito: aws_sdk_cognitoidentityprovider::Client::new(&aws),
            config,
        })
    }
}

/// Add the confirmed user to `group`, logging rather than failing.
async fn assign_default_group<D>(directory: &D, username: &str, group: &str)
where
    D: UserDirectory + ?Sized,
{
    match directory.add_to_group(username, group).await {
        Ok(()) => info!(group = %group, "Added confirmed user to default group"),
        Err(e) => error!(group = %group, error = %e, "Failed to add user to default group"),
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, _context) = event.into_parts();

    let trigger: CognitoTriggerEvent = match serde_json::from_value(payload.clone()) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "Unrecognized trigger payload");
            return Ok(payload);
        }
    };

    info!(trigger_source = ?trigger.trigger_source, "Processing post confirmation");

    let pool_id = trigger
        .user_pool_id
        .as_deref()
        .or(state.config.user_pool_id.as_deref());

    match (pool_id, trigger.user_name.as_deref()) {
        (Some(pool), Some(username)) if !pool.is_empty() && !username.is_empty() => {
            let directory = CognitoDirectory::new(state.cognito.clone(), pool);
            assign_default_group(&directory, username, &state.config.default_group).await;
        }
        _ => warn!("Trigger event without user pool or username"),
    }

    // Response must echo the input for Cognito triggers
    Ok(payload)
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
