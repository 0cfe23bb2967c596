//! Invite Lambda - Redeems invitation secrets.
//!
//! Endpoints:
//! - POST /v1/invites/{token}/accept - Join the invitation's campaign as a player

use chrono::Utc;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::http::{error_response, request_id, respond, route_path};
use shared::invites::redeem_invite;
use shared::{Config, PgStore, Principal};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

struct AppState {
    config: Config,
    store: PgStore,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let pool = shared::db::connect(&config, &aws).await?;

        Ok(Self {
            store: PgStore::new(pool),
            config,
        })
    }
}

#[derive(Debug, Serialize)]
struct Accepted {
    ok: bool,
    campaign_id: Uuid,
}

/// Token segment of `/v1/invites/{token}/accept`.
fn accept_token<'a>(method: &str, path: &'a str) -> Option<&'a str> {
    if method != "POST" {
        return None;
    }
    path.strip_prefix("/v1/invites/")?
        .strip_suffix("/accept")
        .filter(|token| !token.contains('/'))
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request_id = request_id(&event);
    let path = route_path(event.uri().path()).to_string();
    let verbose = state.config.debug;

    info!(request_id = %request_id, method = %event.method(), path = %path, "Received request");

    let Some(token) = accept_token(event.method().as_str(), &path) else {
        return error_response(&shared::Error::NotFound("Not found".into()), &request_id, verbose);
    };

    let principal = match Principal::from_request(&event) {
        Ok(p) => p,
        Err(e) => return error_response(&e, &request_id, verbose),
    };

    let outcome = redeem_invite(&state.store, &principal, token, Utc::now())
        .await
        .map(|redeemed| {
            (
                200,
                Accepted {
                    ok: true,
                    campaign_id: redeemed.campaign_id,
                },
            )
        });

    respond(outcome, &request_id, verbose)
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
