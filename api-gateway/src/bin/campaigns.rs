//! Campaign Lambda - Handles campaign CRUD and invitation issuance.
//!
//! Endpoints:
//! - POST /v1/campaigns - Create a campaign
//! - GET /v1/campaigns - List campaigns owned or joined by the caller
//! - GET /v1/campaigns/{id} - Get campaign details (members only)
//! - DELETE /v1/campaigns/{id} - Delete a campaign (owner only)
//! - GET /v1/campaigns/{id}/members - List members (members only)
//! - POST /v1/campaigns/{id}/invites - Invite a player by email (owner only)

use chrono::Utc;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde_json::{json, Value};
use shared::http::{error_response, parse_json_body, request_id, respond, route_path};
use shared::invites::{issue_invite, InviteSettings};
use shared::models::{CreateCampaignRequest, CreateInviteRequest};
use shared::queue::SqsPublisher;
use shared::{campaigns, Config, PgStore, Principal};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

/// Application state
struct AppState {
    config: Config,
    store: PgStore,
    publisher: SqsPublisher,
    invite_settings: InviteSettings,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let pool = shared::db::connect(&config, &aws).await?;
        let publisher = SqsPublisher::new(
            aws_sdk_sqs::Client::new(&aws),
            config.invite_queue_url.clone(),
        );

        Ok(Self {
            invite_settings: InviteSettings::from_config(&config),
            store: PgStore::new(pool),
            publisher,
            config,
        })
    }
}

#[derive(Debug, PartialEq)]
enum Route<'a> {
    Create,
    List,
    Get(&'a str),
    Delete(&'a str),
    Members(&'a str),
    Invite(&'a str),
    NotFound,
}

fn route<'a>(method: &str, path: &'a str) -> Route<'a> {
    let Some(rest) = path.strip_prefix("/v1/campaigns") else {
        return Route::NotFound;
    };
    let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();

    match (method, parts.as_slice()) {
        ("POST", []) => Route::Create,
        ("GET", []) => Route::List,
        ("GET", [id]) => Route::Get(*id),
        ("DELETE", [id]) => Route::Delete(*id),
        ("GET", [id, "members"]) => Route::Members(*id),
        ("POST", [id, "invites"]) => Route::Invite(*id),
        _ => Route::NotFound,
    }
}

fn campaign_id(raw: &str) -> shared::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| shared::Error::bad_request("invalid campaign id"))
}

async fn dispatch(
    state: &AppState,
    event: &Request,
    principal: &Principal,
    route: Route<'_>,
) -> shared::Result<(u16, Value)> {
    let store = &state.store;

    match route {
        Route::Create => {
            let request: CreateCampaignRequest = parse_json_body(event.body())?;
            let id = campaigns::create_campaign(store, principal, &request).await?;
            Ok((201, json!({ "id": id })))
        }

        Route::List => {
            let items = campaigns::list_campaigns(store, principal).await?;
            Ok((200, json!({ "items": items })))
        }

        Route::Get(id) => {
            let campaign = campaigns::get_campaign(store, principal, campaign_id(id)?).await?;
            Ok((200, serde_json::to_value(campaign)?))
        }

        Route::Delete(id) => {
            campaigns::delete_campaign(store, principal, campaign_id(id)?).await?;
            Ok((200, json!({ "ok": true })))
        }

        Route::Members(id) => {
            let items = campaigns::list_members(store, principal, campaign_id(id)?).await?;
            Ok((200, json!({ "items": items })))
        }

        Route::Invite(id) => {
            let request: CreateInviteRequest = parse_json_body(event.body())?;
            if request.email.trim().is_empty() {
                return Err(shared::Error::bad_request("email required"));
            }
            request.validate()?;

            issue_invite(
                store,
                &state.publisher,
                &state.invite_settings,
                principal,
                id,
                &request.email,
                Utc::now(),
            )
            .await?;
            Ok((202, json!({ "ok": true })))
        }

        Route::NotFound => Err(shared::Error::NotFound("Not found".to_string())),
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request_id = request_id(&event);
    let path = route_path(event.uri().path()).to_string();
    let method = event.method().as_str();
    let verbose = state.config.debug;

    info!(request_id = %request_id, method = %method, path = %path, "Received request");

    let principal = match Principal::from_request(&event) {
        Ok(p) => p,
        Err(e) => return error_response(&e, &request_id, verbose),
    };

    let outcome = dispatch(&state, &event, &principal, route(method, &path)).await;
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
