//! Admin Users Lambda - User directory administration.
//!
//! Endpoints:
//! - GET /v1/admin/users - List every user in the pool
//! - DELETE /v1/admin/users/{username} - Remove a user from the pool
//!
//! Callers must belong to the `admin` group.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde_json::{json, Value};
use shared::directory::{CognitoDirectory, UserDirectory};
use shared::http::{error_response, request_id, respond, route_path};
use shared::{Config, Principal};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct AppState {
    config: Config,
    directory: CognitoDirectory,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let directory = CognitoDirectory::new(
            aws_sdk_cognitoidentityprovider::Client::new(&aws),
            config.user_pool_id()?,
        );

        Ok(Self { config, directory })
    }
}

#[derive(Debug, PartialEq)]
enum Route {
    List,
    Delete(String),
    NotFound,
}

fn route(method: &str, path: &str) -> shared::Result<Route> {
    let Some(rest) = path.strip_prefix("/v1/admin/users") else {
        return Ok(Route::NotFound);
    };

    match (method, rest.trim_start_matches('/')) {
        ("GET", "") => Ok(Route::List),
        ("DELETE", raw) if !raw.is_empty() && !raw.contains('/') => {
            let username = urlencoding::decode(raw)
                .map_err(|_| shared::Error::bad_request("invalid username"))?;
            Ok(Route::Delete(username.into_owned()))
        }
        _ => Ok(Route::NotFound),
    }
}

async fn dispatch<D>(directory: &D, principal: &Principal, route: Route) -> shared::Result<(u16, Value)>
where
    D: UserDirectory + ?Sized,
{
    principal.require_admin()?;

    match route {
        Route::List => {
            let users = directory.list_users().await?;
            Ok((200, json!({ "users": users })))
        }

        Route::Delete(username) => {
            if !directory.delete_user(&username).await? {
                return Err(shared::Error::NotFound("user not found".to_string()));
            }
            info!(deleted_by = %principal.subject, "Deleted user");
            Ok((200, json!({ "ok": true })))
        }

        Route::NotFound => Err(shared::Error::NotFound("Not found".to_string())),
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

    let outcome = match route(event.method().as_str(), &path) {
        Ok(route) => dispatch(&state.directory, &principal, route).await,
        Err(e) => Err(e),
    };
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
