//! Database connection management.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::secrets::{get_database_credentials, DatabaseCredentials};
use crate::{Config, Result};

/// Create a database connection pool.
pub async fn create_pool(config: &DatabaseConfig, credentials: &DatabaseCredentials) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&credentials.username)
        .password(&credentials.password)
        .ssl_mode(PgSslMode::Require);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Fetch credentials from Secrets Manager and open a pool.
pub async fn connect(config: &Config, aws: &aws_config::SdkConfig) -> Result<PgPool> {
    let db = config.database()?;
    let secrets_client = aws_sdk_secretsmanager::Client::new(aws);
    let credentials = get_database_credentials(&secrets_client, &db.secret_arn).await?;

    let pool = create_pool(db, &credentials).await?;
    info!(host = %db.host, database = %db.name, "Connected to database");
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::Error::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}
