//! Identity-provider user administration (Cognito).

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::UserType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use serde::Serialize;

use crate::{Error, Result};

/// Attribute pair, in the shape the web client renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAttribute {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryUser {
    pub username: String,
    pub status: Option<String>,
    pub enabled: bool,
    pub attributes: Vec<UserAttribute>,
}

impl From<&UserType> for DirectoryUser {
    fn from(user: &UserType) -> Self {
        Self {
            username: user.username().unwrap_or_default().to_string(),
            status: user.user_status().map(|s| s.as_str().to_string()),
            enabled: user.enabled(),
            attributes: user
                .attributes()
                .iter()
                .map(|a| UserAttribute {
                    name: a.name().to_string(),
                    value: a.value().unwrap_or_default().to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>>;

    /// Returns `false` when no such user exists.
    async fn delete_user(&self, username: &str) -> Result<bool>;

    async fn add_to_group(&self, username: &str, group: &str) -> Result<()>;
}

pub struct CognitoDirectory {
    client: CognitoClient,
    user_pool_id: String,
}

impl CognitoDirectory {
    pub fn new(client: CognitoClient, user_pool_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
        }
    }
}

#[async_trait]
impl UserDirectory for CognitoDirectory {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        let mut users = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_users()
                .user_pool_id(&self.user_pool_id)
                .limit(60)
                .set_pagination_token(token.take())
                .send()
                .await
                .map_err(|e| Error::Aws(format!("Failed to list users: {}", e)))?;

            users.extend(page.users().iter().map(DirectoryUser::from));

            match page.pagination_token() {
                Some(next) if !next.is_empty() => token = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(users)
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        let result = self
            .client
            .admin_delete_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_user_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(Error::Aws(format!("Failed to delete user: {}", e)))
                }
            }
        }
    }

    async fn add_to_group(&self, username: &str, group: &str) -> Result<()> {
        self.client
            .admin_add_user_to_group()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to add user to group: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cognitoidentityprovider::types::{AttributeType, UserStatusType};

    #[test]
    fn test_directory_user_from_cognito() {
        let user = UserType::builder()
            .username("gm")
            .enabled(true)
            .user_status(UserStatusType::Confirmed)
            .attributes(
                AttributeType::builder()
                    .name("email")
                    .value("gm@example.com")
                    .build()
                    .unwrap(),
            )
            .build();

        let entry = DirectoryUser::from(&user);
        assert_eq!(entry.username, "gm");
        assert!(entry.enabled);
        assert_eq!(entry.status.as_deref(), Some("CONFIRMED"));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["attributes"][0]["Name"], "email");
        assert_eq!(value["attributes"][0]["Value"], "gm@example.com");
    }
}
