//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

/// Connection settings for the campaign database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub name: String,
    /// ARN of the secret containing database credentials
    pub secret_arn: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Present when both DB_HOST and DB_SECRET_ARN are set
    pub database: Option<DatabaseConfig>,
    /// SQS queue receiving invitation delivery messages
    pub invite_queue_url: Option<String>,
    /// SES sender address for invitation emails
    pub from_email: String,
    /// Web origin used to build acceptance links
    pub app_base_url: Option<String>,
    /// Cognito user pool for admin and trigger functions
    pub user_pool_id: Option<String>,
    /// Group every confirmed user is added to
    pub default_group: String,
    /// Verbose error messages in responses
    pub debug: bool,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match (get("DB_HOST"), get("DB_SECRET_ARN")) {
            (Some(host), Some(secret_arn)) => {
                let port = match get("DB_PORT") {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| Error::Config(format!("DB_PORT is not a port: {}", raw)))?,
                    None => 5432,
                };
                Some(DatabaseConfig {
                    host,
                    port,
                    name: get("DB_NAME").unwrap_or_else(|| "appdb".to_string()),
                    secret_arn,
                })
            }
            _ => None,
        };

        Ok(Self {
            database,
            invite_queue_url: get("INVITE_QUEUE_URL"),
            from_email: get("FROM_EMAIL").unwrap_or_else(|| "noreply@yourdomain.com".to_string()),
            app_base_url: get("APP_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            user_pool_id: get("USER_POOL_ID"),
            default_group: get("DEFAULT_GROUP").unwrap_or_else(|| "player".to_string()),
            debug: get("DEBUG")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            aws_region: get("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        })
    }

    /// Database settings, or a configuration error naming what is missing.
    pub fn database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .ok_or_else(|| Error::Config("DB_HOST and DB_SECRET_ARN must be set".to_string()))
    }

    /// Cognito user pool id, required by directory operations.
    pub fn user_pool_id(&self) -> Result<&str> {
        self.user_pool_id
            .as_deref()
            .ok_or_else(|| Error::Config("USER_POOL_ID not set".to_string()))
    }
}
