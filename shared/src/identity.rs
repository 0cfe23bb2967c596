//! Maps an authenticated principal to an internal user, creating the user
//! on first sight.

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Principal;
use crate::models::NewUser;
use crate::store::UserStore;
use crate::{Error, Result};

/// The row inserted for a principal seen for the first time.
pub fn provisioned_user(principal: &Principal) -> NewUser {
    let email = principal
        .email
        .clone()
        .unwrap_or_else(|| format!("{}@example.com", principal.subject));

    let username = principal
        .email
        .as_deref()
        .and_then(|e| e.split('@').next())
        .filter(|local| !local.is_empty())
        .map(String::from)
        .unwrap_or_else(|| {
            let prefix: String = principal.subject.chars().take(8).collect();
            format!("user-{}", prefix)
        });

    NewUser {
        subject: principal.subject.clone(),
        email,
        username,
    }
}

/// Resolve the caller's internal user id.
///
/// Two first requests for the same subject may race; the insert is
/// conflict-tolerant and the loser re-reads the winner's row.
pub async fn resolve_user<S>(store: &S, principal: &Principal) -> Result<Uuid>
where
    S: UserStore + ?Sized,
{
    if let Some(id) = store.find_user_id(&principal.subject).await? {
        return Ok(id);
    }

    let new_user = provisioned_user(principal);
    match store.insert_user(&new_user).await {
        Ok(Some(id)) => {
            info!(user_id = %id, "Provisioned user on first request");
            return Ok(id);
        }
        Ok(None) => debug!("User inserted concurrently, re-reading"),
        Err(Error::UniqueViolation(detail)) => {
            debug!(detail = %detail, "Unique violation provisioning user, re-reading")
        }
        Err(e) => return Err(e),
    }

    store
        .find_user_id(&principal.subject)
        .await?
        .ok_or_else(|| Error::Internal("user vanished after conflicting insert".to_string()))
}
