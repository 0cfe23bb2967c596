//! Invitation issuance and redemption.
//!
//! An invitation moves `issued -> accepted | expired | invalid`. Only the
//! SHA-256 of the secret is stored; the plaintext travels once, inside the
//! queued delivery message. Issuance is a conditional insert guarded by a
//! partial unique index on pending invitations, so two racing issuers of
//! the same (campaign, email) cannot both succeed.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::identity::resolve_user;
use crate::models::{Invitation, InviteMessage};
use crate::queue::InvitePublisher;
use crate::store::{CampaignStore, InvitationStore, UserStore};
use crate::{Config, Error, Result};

/// How long an invitation stays redeemable.
pub const INVITE_TTL_DAYS: i64 = 7;

pub const INVITE_SUBJECT: &str = "Campaign Invite";
pub const INVITE_MESSAGE: &str = "You are invited. Use the acceptance link.";

/// Random secret of 32 bytes, hex encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 of the secret, as stored in `invitations.token_hash`.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Settings for building acceptance links.
#[derive(Debug, Clone, Default)]
pub struct InviteSettings {
    /// Web origin; when unset, links point at the API route
    pub accept_base_url: Option<String>,
}

impl InviteSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            accept_base_url: config.app_base_url.clone(),
        }
    }

    pub fn accept_url(&self, secret: &str) -> String {
        match &self.accept_base_url {
            Some(base) => format!("{}/accept?token={}", base, secret),
            None => format!("/v1/invites/{}/accept", secret),
        }
    }
}

/// Outcome of a successful issuance.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvite {
    pub campaign_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    /// Whether the delivery message reached the queue
    pub queued: bool,
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemedInvite {
    pub campaign_id: Uuid,
    pub user_id: Uuid,
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(Error::bad_request("email required"));
    }
    Ok(email)
}

/// Issue an invitation to `email` for a campaign the caller owns.
pub async fn issue_invite<S, P>(
    store: &S,
    publisher: &P,
    settings: &InviteSettings,
    principal: &Principal,
    campaign_id: &str,
    email: &str,
    now: DateTime<Utc>,
) -> Result<IssuedInvite>
where
    S: UserStore + CampaignStore + InvitationStore + ?Sized,
    P: InvitePublisher + ?Sized,
{
    let campaign_id =
        Uuid::parse_str(campaign_id).map_err(|_| Error::bad_request("invalid campaign id"))?;
    let email = normalize_email(email)?;

    let user_id = resolve_user(store, principal).await?;

    // Same answer for "not yours" and "does not exist".
    if !store.is_owner(campaign_id, user_id).await? {
        return Err(Error::forbidden());
    }

    if store.pending_invitation_exists(campaign_id, &email, now).await? {
        return Err(Error::DuplicateInvite);
    }

    let secret = generate_secret();
    let expires_at = now + Duration::days(INVITE_TTL_DAYS);
    let invitation = Invitation {
        campaign_id,
        email: email.clone(),
        token_hash: hash_secret(&secret),
        expires_at,
        created_by: user_id,
        accepted_at: None,
        superseded_at: None,
    };

    if !store.insert_invitation(&invitation, now).await? {
        return Err(Error::DuplicateInvite);
    }

    info!(campaign_id = %campaign_id, invited_by = %user_id, "Invitation issued");

    let message = InviteMessage {
        email: Some(email.clone()),
        campaign_id: Some(campaign_id.to_string()),
        accept: Some(settings.accept_url(&secret)),
        token: Some(secret),
        subject: Some(INVITE_SUBJECT.to_string()),
        message: Some(INVITE_MESSAGE.to_string()),
    };

    // The invitation stands even when delivery cannot be queued.
    let queued = match publisher.publish(&message).await {
        Ok(()) => true,
        Err(e) => {
            warn!(campaign_id = %campaign_id, error = %e, "Failed to queue invitation email");
            false
        }
    };

    Ok(IssuedInvite {
        campaign_id,
        email,
        expires_at,
        queued,
    })
}

fn reject_state(invitation: &Invitation, now: DateTime<Utc>) -> Option<Error> {
    if invitation.accepted_at.is_some() {
        Some(Error::AlreadyAccepted)
    } else if invitation.superseded_at.is_some() || invitation.expires_at <= now {
        Some(Error::Expired)
    } else {
        None
    }
}

/// Redeem the secret for the caller, joining them to the campaign as a
/// player.
pub async fn redeem_invite<S>(
    store: &S,
    principal: &Principal,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<RedeemedInvite>
where
    S: UserStore + InvitationStore + ?Sized,
{
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(Error::InvalidToken);
    }
    let token_hash = hash_secret(secret);

    let invitation = store
        .find_invitation(&token_hash)
        .await?
        .ok_or(Error::InvalidToken)?;

    if let Some(err) = reject_state(&invitation, now) {
        return Err(err);
    }

    let user_id = resolve_user(store, principal).await?;

    match store.accept_invitation(&token_hash, user_id, now).await? {
        Some(campaign_id) => {
            info!(campaign_id = %campaign_id, user_id = %user_id, "Invitation accepted");
            Ok(RedeemedInvite {
                campaign_id,
                user_id,
            })
        }
        None => {
            // Another redemption won between the read and the update.
            let current = store
                .find_invitation(&token_hash)
                .await?
                .ok_or(Error::InvalidToken)?;
            Err(reject_state(&current, now).unwrap_or(Error::AlreadyAccepted))
        }
    }
}
