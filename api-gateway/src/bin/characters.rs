//! Character Lambda - The caller's own character sheet.
//!
//! Endpoints:
//! - GET /v1/characters/me?campaign_id={id}
//! - PUT /v1/characters/me - Create or replace the character

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde_json::{json, Value};
use shared::http::{error_response, parse_json_body, request_id, respond, route_path};
use shared::models::PutCharacterRequest;
use shared::{characters, Config, PgStore, Principal};
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

async fn dispatch(
    state: &AppState,
    event: &Request,
    principal: &Principal,
    path: &str,
) -> shared::Result<(u16, Value)> {
    let store = &state.store;

    match (event.method().as_str(), path) {
        ("GET", "/v1/characters/me") => {
            let params = event.query_string_parameters();
            let character =
                characters::get_my_character(store, principal, params.first("campaign_id")).await?;
            Ok((200, serde_json::to_value(character)?))
        }

        ("PUT", "/v1/characters/me") => {
            let request: PutCharacterRequest = parse_json_body(event.body())?;
            let id = characters::put_my_character(store, principal, &request).await?;
            Ok((200, json!({ "id": id })))
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

    let outcome = dispatch(&state, &event, &principal, &path).await;
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
