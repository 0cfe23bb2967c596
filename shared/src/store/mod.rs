//! Persistence seams.
//!
//! Handlers hold no state between invocations; every read and write goes
//! through these traits. `PgStore` is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Campaign, Character, Invitation, Member, NewSession, NewUser, Session};
use crate::Result;

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Internal id of the user linked to an external subject.
    async fn find_user_id(&self, subject: &str) -> Result<Option<Uuid>>;

    /// Insert a user unless one already exists for the subject. Returns
    /// `None` when the subject was taken.
    async fn insert_user(&self, user: &NewUser) -> Result<Option<Uuid>>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Create a campaign and its owner membership.
    async fn create_campaign(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Uuid>;

    /// Campaigns owned or joined by the user, newest first.
    async fn campaigns_for_user(&self, user: Uuid) -> Result<Vec<Campaign>>;

    /// The campaign, if the user owns or has joined it.
    async fn campaign_for_member(&self, campaign: Uuid, user: Uuid) -> Result<Option<Campaign>>;

    async fn is_owner(&self, campaign: Uuid, user: Uuid) -> Result<bool>;

    async fn is_member(&self, campaign: Uuid, user: Uuid) -> Result<bool>;

    /// Delete the campaign if `owner` owns it. Dependents cascade.
    async fn delete_owned_campaign(&self, campaign: Uuid, owner: Uuid) -> Result<bool>;

    async fn members(&self, campaign: Uuid) -> Result<Vec<Member>>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Whether an unaccepted, unexpired invitation exists for the campaign
    /// and email at `now`.
    async fn pending_invitation_exists(
        &self,
        campaign: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Insert unless a pending invitation already holds the (campaign, email)
    /// slot. Pending invitations that expired by `now` are superseded first
    /// and give up the slot. Returns `false` when the slot stays taken.
    async fn insert_invitation(&self, invitation: &Invitation, now: DateTime<Utc>) -> Result<bool>;

    async fn find_invitation(&self, token_hash: &str) -> Result<Option<Invitation>>;

    /// Stamp the invitation accepted and add the user as a player, as one
    /// unit. Returns the campaign id, or `None` when the invitation was no
    /// longer pending and unexpired at `now`.
    async fn accept_invitation(
        &self,
        token_hash: &str,
        user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &NewSession) -> Result<Uuid>;

    /// Sessions of a campaign, latest scheduled first.
    async fn sessions(&self, campaign: Uuid) -> Result<Vec<Session>>;

    /// Delete a session belonging to the campaign.
    async fn delete_session(&self, campaign: Uuid, session: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn character(&self, campaign: Uuid, user: Uuid) -> Result<Option<Character>>;

    /// Create or replace the user's character in the campaign.
    async fn upsert_character(
        &self,
        campaign: Uuid,
        user: Uuid,
        name: &str,
        class: &str,
        level: i32,
    ) -> Result<Uuid>;
}
