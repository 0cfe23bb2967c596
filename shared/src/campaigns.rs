//! Campaign operations.

use tracing::info;
use uuid::Uuid;

use crate::auth::Principal;
use crate::identity::resolve_user;
use crate::models::{Campaign, CreateCampaignRequest, Member};
use crate::store::{CampaignStore, UserStore};
use crate::{Error, Result};

fn required(value: Option<&str>, field: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::bad_request(format!("{} required", field)))
}

pub async fn create_campaign<S>(
    store: &S,
    principal: &Principal,
    request: &CreateCampaignRequest,
) -> Result<Uuid>
where
    S: UserStore + CampaignStore + ?Sized,
{
    let name = required(request.name.as_deref(), "name")?;
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let user_id = resolve_user(store, principal).await?;
    let id = store.create_campaign(user_id, &name, description).await?;

    info!(campaign_id = %id, owner = %user_id, "Created campaign");
    Ok(id)
}

pub async fn list_campaigns<S>(store: &S, principal: &Principal) -> Result<Vec<Campaign>>
where
    S: UserStore + CampaignStore + ?Sized,
{
    let user_id = resolve_user(store, principal).await?;
    store.campaigns_for_user(user_id).await
}

pub async fn get_campaign<S>(store: &S, principal: &Principal, campaign: Uuid) -> Result<Campaign>
where
    S: UserStore + CampaignStore + ?Sized,
{
    let user_id = resolve_user(store, principal).await?;
    store
        .campaign_for_member(campaign, user_id)
        .await?
        .ok_or_else(Error::forbidden)
}

/// Delete a campaign. Only its owner may; everyone else gets `forbidden`
/// whether or not the campaign exists.
pub async fn delete_campaign<S>(store: &S, principal: &Principal, campaign: Uuid) -> Result<()>
where
    S: UserStore + CampaignStore + ?Sized,
{
    let user_id = resolve_user(store, principal).await?;
    if !store.delete_owned_campaign(campaign, user_id).await? {
        return Err(Error::forbidden());
    }
    info!(campaign_id = %campaign, owner = %user_id, "Deleted campaign");
    Ok(())
}

/// Ensure the caller belongs to the campaign, returning their user id.
pub async fn require_member<S>(store: &S, principal: &Principal, campaign: Uuid) -> Result<Uuid>
where
    S: UserStore + CampaignStore + ?Sized,
{
    let user_id = resolve_user(store, principal).await?;
    if !store.is_member(campaign, user_id).await? {
        return Err(Error::forbidden());
    }
    Ok(user_id)
}

pub async fn list_members<S>(store: &S, principal: &Principal, campaign: Uuid) -> Result<Vec<Member>>
where
    S: UserStore + CampaignStore + ?Sized,
{
    require_member(store, principal, campaign).await?;
    store.members(campaign).await
}
