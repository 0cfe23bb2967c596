//! Ping Lambda - Unauthenticated liveness check.
//!
//! Endpoints:
//! - GET /v1/ping

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::http::{json_response, request_id};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct Pong {
    ok: bool,
    message: &'static str,
}

async fn handler(event: Request) -> Result<Response<Body>, Error> {
    let request_id = request_id(&event);
    info!(request_id = %request_id, "Ping");

    json_response(
        200,
        &Pong {
            ok: true,
            message: "pong",
        },
        &request_id,
    )
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pong_without_claims() {
        let event = lambda_http::http::Request::builder()
            .uri("/v1/ping")
            .body(Body::Empty)
            .unwrap();

        let response = handler(event).await.unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = serde_json::from_slice(response.body().as_ref()).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["message"], "pong");
    }
}
