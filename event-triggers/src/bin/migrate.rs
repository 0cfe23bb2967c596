//! Migrate Lambda - Applies pending schema migrations.
//!
//! Invoked by the deployment after the database is reachable. Running it
//! again once the schema is current is a no-op.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use shared::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
    info!(request_id = %event.context.request_id, "Running migrations");

    let config = Config::from_env()?;
    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let pool = shared::db::connect(&config, &aws).await?;

    shared::db::migrate(&pool).await?;
    pool.close().await;

    info!("Migrations complete");
    Ok(json!({ "statusCode": 200, "body": "migrated" }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(handler)).await
}
