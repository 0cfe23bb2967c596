//! Play session scheduling.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::Principal;
use crate::campaigns::require_member;
use crate::models::{CreateSessionRequest, NewSession, Session};
use crate::store::{CampaignStore, SessionStore, UserStore};
use crate::{Error, Result};

pub const DEFAULT_DURATION_MINUTES: i32 = 180;

fn new_session(campaign: Uuid, request: &CreateSessionRequest) -> Result<NewSession> {
    let title = request.title.as_deref().map(str::trim).unwrap_or_default();
    let scheduled_at = request.scheduled_at.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() || scheduled_at.is_empty() {
        return Err(Error::bad_request("title and scheduled_at required"));
    }

    let scheduled_at = DateTime::parse_from_rfc3339(scheduled_at)
        .map_err(|_| Error::bad_request("scheduled_at must be an RFC 3339 timestamp"))?
        .with_timezone(&Utc);

    let duration_minutes = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    if duration_minutes <= 0 {
        return Err(Error::bad_request("duration_minutes must be positive"));
    }

    Ok(NewSession {
        campaign_id: campaign,
        title: title.to_string(),
        scheduled_at,
        duration_minutes,
    })
}

pub async fn create_session<S>(
    store: &S,
    principal: &Principal,
    campaign: Uuid,
    request: &CreateSessionRequest,
) -> Result<Uuid>
where
    S: UserStore + CampaignStore + SessionStore + ?Sized,
{
    let session = new_session(campaign, request)?;
    let user_id = require_member(store, principal, campaign).await?;

    let id = store.create_session(&session).await?;
    info!(campaign_id = %campaign, session_id = %id, created_by = %user_id, "Scheduled session");
    Ok(id)
}

pub async fn list_sessions<S>(store: &S, principal: &Principal, campaign: Uuid) -> Result<Vec<Session>>
where
    S: UserStore + CampaignStore + SessionStore + ?Sized,
{
    require_member(store, principal, campaign).await?;
    store.sessions(campaign).await
}

pub async fn delete_session<S>(
    store: &S,
    principal: &Principal,
    campaign: Uuid,
    session: Uuid,
) -> Result<()>
where
    S: UserStore + CampaignStore + SessionStore + ?Sized,
{
    require_member(store, principal, campaign).await?;
    if !store.delete_session(campaign, session).await? {
        return Err(Error::NotFound("session not found".to_string()));
    }
    info!(campaign_id = %campaign, session_id = %session, "Deleted session");
    Ok(())
}
