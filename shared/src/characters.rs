//! The caller's character in a campaign. One per (campaign, user).

use uuid::Uuid;

use crate::auth::Principal;
use crate::campaigns::require_member;
use crate::models::{Character, PutCharacterRequest};
use crate::store::{CampaignStore, CharacterStore, UserStore};
use crate::{Error, Result};

fn campaign_id(raw: Option<&str>) -> Result<Uuid> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::bad_request("campaign_id required"))?;
    Uuid::parse_str(raw).map_err(|_| Error::bad_request("invalid campaign_id"))
}

pub async fn get_my_character<S>(
    store: &S,
    principal: &Principal,
    campaign: Option<&str>,
) -> Result<Character>
where
    S: UserStore + CampaignStore + CharacterStore + ?Sized,
{
    let campaign = campaign_id(campaign)?;
    let user_id = require_member(store, principal, campaign).await?;
    store
        .character(campaign, user_id)
        .await?
        .ok_or_else(|| Error::NotFound("not found".to_string()))
}

pub async fn put_my_character<S>(
    store: &S,
    principal: &Principal,
    request: &PutCharacterRequest,
) -> Result<Uuid>
where
    S: UserStore + CampaignStore + CharacterStore + ?Sized,
{
    let name = request.name.as_deref().map(str::trim).unwrap_or_default();
    let class = request.class.as_deref().map(str::trim).unwrap_or_default();
    if request.campaign_id.is_none() || name.is_empty() || class.is_empty() {
        return Err(Error::bad_request("campaign_id, name, class required"));
    }
    let campaign = campaign_id(request.campaign_id.as_deref())?;

    let level = request.level.unwrap_or(1);
    if level < 1 {
        return Err(Error::bad_request("level must be at least 1"));
    }

    let user_id = require_member(store, principal, campaign).await?;
    store
        .upsert_character(campaign, user_id, name, class, level)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleSet;
    use crate::identity::resolve_user;
    use crate::store::memory::MemoryStore;

    fn principal(subject: &str) -> Principal {
        Principal {
            subject: subject.to_string(),
            email: None,
            username: None,
            roles: RoleSet::default(),
        }
    }

    fn put(campaign: Uuid, name: &str, level: Option<i32>) -> PutCharacterRequest {
        PutCharacterRequest {
            campaign_id: Some(campaign.to_string()),
            name: Some(name.to_string()),
            class: Some("Wizard".to_string()),
            level,
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_character() {
        let store = MemoryStore::new();
        let gm = principal("gm");
        let gm_id = resolve_user(&store, &gm).await.unwrap();
        let campaign = store.create_campaign(gm_id, "C1", None).await.unwrap();
        let campaign_param = campaign.to_string();

        let err = get_my_character(&store, &gm, Some(campaign_param.as_str())).await.unwrap_err();
        assert_eq!(err.code(), "not_found");

        let first = put_my_character(&store, &gm, &put(campaign, "Elminster", None)).await.unwrap();
        let second = put_my_character(&store, &gm, &put(campaign, "Elminster Aumar", Some(5)))
            .await
            .unwrap();
        assert_eq!(first, second);

        let character = get_my_character(&store, &gm, Some(campaign_param.as_str())).await.unwrap();
        assert_eq!(character.name, "Elminster Aumar");
        assert_eq!(character.level, 5);
    }

    #[tokio::test]
    async fn test_validation_and_membership() {
        let store = MemoryStore::new();
        let gm = principal("gm");
        let gm_id = resolve_user(&store, &gm).await.unwrap();
        let campaign = store.create_campaign(gm_id, "C1", None).await.unwrap();

        assert_eq!(get_my_character(&store, &gm, None).await.unwrap_err().code(), "bad_request");
        assert_eq!(
            get_my_character(&store, &gm, Some("c1")).await.unwrap_err().code(),
            "bad_request"
        );

        let mut missing_class = put(campaign, "Elminster", None);
        missing_class.class = None;
        assert!(put_my_character(&store, &gm, &missing_class).await.is_err());
        assert!(put_my_character(&store, &gm, &put(campaign, "E", Some(0))).await.is_err());

        let outsider = principal("outsider");
        let err = put_my_character(&store, &outsider, &put(campaign, "Thief", None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");
    }
}
