//! Shared data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role of a user within one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Player,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Player => "player",
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "player" => Ok(MemberRole::Player),
            other => Err(crate::Error::Internal(format!("unknown member role: {}", other))),
        }
    }
}

/// A user row about to be inserted on first sight.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub subject: String,
    pub email: String,
    pub username: String,
}

/// Campaign as returned to members.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub gm_id: Uuid,
}

/// Member listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Stored invitation. The secret itself is never persisted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Invitation {
    pub campaign_id: Uuid,
    pub email: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub accepted_at: Option<DateTime<Utc>>,
    /// Set when an expired invitation is replaced by a new one
    pub superseded_at: Option<DateTime<Utc>>,
}

/// Scheduled play session.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
}

/// A session about to be created.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub campaign_id: Uuid,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

/// A player's character within one campaign.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub class: String,
    pub level: i32,
}

/// Create campaign request
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Invite player request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInviteRequest {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
}

/// Create session request
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
    pub scheduled_at: Option<String>,
    pub duration_minutes: Option<i32>,
}

/// Upsert character request
#[derive(Debug, Deserialize)]
pub struct PutCharacterRequest {
    pub campaign_id: Option<String>,
    pub name: Option<String>,
    pub class: Option<String>,
    pub level: Option<i32>,
}

/// Queue message from the issuer to the delivery dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteMessage {
    pub email: Option<String>,
    #[serde(rename = "campaignId")]
    pub campaign_id: Option<String>,
    pub token: Option<String>,
    pub accept: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}
