//! Session Lambda - Schedules play sessions for a campaign.
//!
//! Endpoints:
//! - POST /v1/campaigns/{id}/sessions - Schedule a session
//! - GET /v1/campaigns/{id}/sessions - List sessions, latest first
//! - DELETE /v1/campaigns/{id}/sessions/{sessionId} - Cancel a session

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde_json::{json, Value};
use shared::http::{error_response, parse_id, parse_json_body, request_id, respond, route_path};
use shared::models::CreateSessionRequest;
use shared::{sessions, Config, PgStore, Principal};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

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

/// Path segments after `/v1/campaigns`, or `None` for foreign paths.
fn segments(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix("/v1/campaigns")?;
    Some(rest.split('/').filter(|p| !p.is_empty()).collect())
}

async fn dispatch(
    state: &AppState,
    event: &Request,
    principal: &Principal,
    parts: &[&str],
) -> shared::Result<(u16, Value)> {
    let store = &state.store;

    match (event.method().as_str(), parts) {
        ("POST", [_, "sessions"]) => {
            let campaign = parse_id(parts, 0, "campaign id")?;
            let request: CreateSessionRequest = parse_json_body(event.body())?;
            let id = sessions::create_session(store, principal, campaign, &request).await?;
            Ok((201, json!({ "id": id })))
        }

        ("GET", [_, "sessions"]) => {
            let campaign = parse_id(parts, 0, "campaign id")?;
            let items = sessions::list_sessions(store, principal, campaign).await?;
            Ok((200, json!({ "items": items })))
        }

        ("DELETE", [_, "sessions", _]) => {
            let campaign = parse_id(parts, 0, "campaign id")?;
            let session = parse_id(parts, 2, "session id")?;
            sessions::delete_session(store, principal, campaign, session).await?;
            Ok((200, json!({ "ok": true })))
        }

        _ => Err(shared::Error::NotFound("Not found".to_string())),
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request_id = request_id(&event);
    let path = route_path(event.uri().path()).to_string();
    let verbose = state.config.debug;

    info!(request_id = %request_id, method = %event.method(), path = %path, "Received request");

    let principal = match Principal::from_request(&event) {
        Ok(p) => p,
        Err(e) => return error_response(&e, &request_id, verbose),
    };

    let parts = segments(&path).unwrap_or_default();
    let outcome = dispatch(&state, &event, &principal, &parts).await;
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
