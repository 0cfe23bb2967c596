use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CampaignStore, CharacterStore, InvitationStore, SessionStore, UserStore};
use crate::models::{
    Campaign, Character, Invitation, Member, MemberRole, NewSession, NewUser, Session,
};
use crate::Result;

/// Postgres-backed store over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_id(&self, subject: &str) -> Result<Option<Uuid>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE cognito_user_id = $1")
                .bind(subject)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, username, cognito_user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (cognito_user_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    async fn create_campaign(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO campaigns (name, description, gm_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO campaign_players (campaign_id, user_id, role) VALUES ($1, $2, 'owner')",
        )
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn campaigns_for_user(&self, user: Uuid) -> Result<Vec<Campaign>> {
        let campaigns: Vec<Campaign> = sqlx::query_as(
            r#"
            SELECT c.id, c.name, c.description, c.status, c.gm_id
            FROM campaigns c
            WHERE c.gm_id = $1
               OR EXISTS (
                   SELECT 1 FROM campaign_players cp
                   WHERE cp.campaign_id = c.id AND cp.user_id = $1
               )
            ORDER BY c.created_at DESC
            LIMIT 50
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(campaigns)
    }

    async fn campaign_for_member(&self, campaign: Uuid, user: Uuid) -> Result<Option<Campaign>> {
        let row: Option<Campaign> = sqlx::query_as(
            r#"
            SELECT c.id, c.name, c.description, c.status, c.gm_id
            FROM campaigns c
            WHERE c.id = $1
              AND (c.gm_id = $2 OR EXISTS (
                   SELECT 1 FROM campaign_players cp
                   WHERE cp.campaign_id = c.id AND cp.user_id = $2
              ))
            "#,
        )
        .bind(campaign)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn is_owner(&self, campaign: Uuid, user: Uuid) -> Result<bool> {
        let owns: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM campaigns WHERE id = $1 AND gm_id = $2)",
        )
        .bind(campaign)
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(owns)
    }

    async fn is_member(&self, campaign: Uuid, user: Uuid) -> Result<bool> {
        let member: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM campaigns c
                WHERE c.id = $1
                  AND (c.gm_id = $2 OR EXISTS (
                       SELECT 1 FROM campaign_players cp
                       WHERE cp.campaign_id = c.id AND cp.user_id = $2
                  ))
            )
            "#,
        )
        .bind(campaign)
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    async fn delete_owned_campaign(&self, campaign: Uuid, owner: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND gm_id = $2")
            .bind(campaign)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn members(&self, campaign: Uuid) -> Result<Vec<Member>> {
        let rows: Vec<(Uuid, String, String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.email, cp.role, cp.joined_at
            FROM campaign_players cp
            JOIN users u ON u.id = cp.user_id
            WHERE cp.campaign_id = $1
            ORDER BY cp.role = 'owner' DESC, cp.joined_at
            "#,
        )
        .bind(campaign)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, username, email, role, joined_at)| {
                Ok(Member {
                    user_id,
                    username,
                    email,
                    role: role.parse::<MemberRole>()?,
                    joined_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl InvitationStore for PgStore {
    async fn pending_invitation_exists(
        &self,
        campaign: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM invitations
                WHERE campaign_id = $1
                  AND lower(email) = lower($2)
                  AND accepted_at IS NULL
                  AND superseded_at IS NULL
                  AND expires_at > $3
            )
            "#,
        )
        .bind(campaign)
        .bind(email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_invitation(&self, invitation: &Invitation, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE invitations
            SET superseded_at = $3
            WHERE campaign_id = $1
              AND lower(email) = lower($2)
              AND accepted_at IS NULL
              AND superseded_at IS NULL
              AND expires_at <= $3
            "#,
        )
        .bind(invitation.campaign_id)
        .bind(&invitation.email)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO invitations (campaign_id, email, token_hash, expires_at, created_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (campaign_id, lower(email))
                WHERE accepted_at IS NULL AND superseded_at IS NULL
                DO NOTHING
            "#,
        )
        .bind(invitation.campaign_id)
        .bind(&invitation.email)
        .bind(&invitation.token_hash)
        .bind(invitation.expires_at)
        .bind(invitation.created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_invitation(&self, token_hash: &str) -> Result<Option<Invitation>> {
        let invitation: Option<Invitation> = sqlx::query_as(
            r#"
            SELECT campaign_id, email, token_hash, expires_at, created_by, accepted_at, superseded_at
            FROM invitations
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    async fn accept_invitation(
        &self,
        token_hash: &str,
        user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let campaign: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE invitations
            SET accepted_at = $2
            WHERE token_hash = $1
              AND accepted_at IS NULL
              AND superseded_at IS NULL
              AND expires_at > $2
            RETURNING campaign_id
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(campaign_id) = campaign else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO campaign_players (campaign_id, user_id, role)
            VALUES ($1, $2, 'player')
            ON CONFLICT (campaign_id, user_id) DO NOTHING
            "#,
        )
        .bind(campaign_id)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(campaign_id))
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: &NewSession) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO sessions (campaign_id, title, scheduled_at, duration_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(session.campaign_id)
        .bind(&session.title)
        .bind(session.scheduled_at)
        .bind(session.duration_minutes)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn sessions(&self, campaign: Uuid) -> Result<Vec<Session>> {
        let sessions: Vec<Session> = sqlx::query_as(
            r#"
            SELECT id, campaign_id, title, scheduled_at, duration_minutes, status
            FROM sessions
            WHERE campaign_id = $1
            ORDER BY scheduled_at DESC
            LIMIT 100
            "#,
        )
        .bind(campaign)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn delete_session(&self, campaign: Uuid, session: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND campaign_id = $2")
            .bind(session)
            .bind(campaign)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CharacterStore for PgStore {
    async fn character(&self, campaign: Uuid, user: Uuid) -> Result<Option<Character>> {
        let character: Option<Character> = sqlx::query_as(
            "SELECT id, name, class, level FROM characters WHERE campaign_id = $1 AND user_id = $2",
        )
        .bind(campaign)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;
        Ok(character)
    }

    async fn upsert_character(
        &self,
        campaign: Uuid,
        user: Uuid,
        name: &str,
        class: &str,
        level: i32,
    ) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO characters (campaign_id, user_id, name, class, level)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (campaign_id, user_id) DO UPDATE SET
                name = EXCLUDED.name,
                class = EXCLUDED.class,
                level = EXCLUDED.level,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(campaign)
        .bind(user)
        .bind(name)
        .bind(class)
        .bind(level)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
