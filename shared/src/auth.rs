//! Principal extraction from Cognito authorizer claims.
//!
//! API Gateway validates the bearer token before the Lambda runs; the handler
//! only reads the claims the authorizer attached to the request context.

use lambda_http::{Request, RequestExt};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::{Error, Result};

/// Claims forwarded by the Cognito user pool authorizer.
#[derive(Debug, Deserialize)]
pub struct CognitoClaims {
    /// Subject (user id)
    #[serde(default)]
    pub sub: Option<String>,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Cognito username
    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,
    /// Group membership; a delimited string through REST authorizers, an
    /// array in raw ID tokens
    #[serde(rename = "cognito:groups", default)]
    pub groups: Option<serde_json::Value>,
}

/// A group the identity provider placed the caller in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Admin,
    GameMaster,
    Player,
    Other(String),
}

impl Role {
    fn from_group(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "admin" | "admins" => Role::Admin,
            "gm" | "game_master" | "gamemaster" => Role::GameMaster,
            "player" | "players" => Role::Player,
            _ => Role::Other(name.to_string()),
        }
    }
}

/// The caller's groups, parsed once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Parse a group claim: `admin,player`, `admin player`, `[admin, player]`
    /// or a JSON array literal.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(names) = serde_json::from_str::<Vec<String>>(trimmed) {
            return Self::from_names(names.iter().map(String::as_str));
        }

        let inner = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);

        Self::from_names(
            inner
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(|s| s.trim_matches('"')),
        )
    }

    fn from_names<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        Self(
            names
                .filter(|n| !n.is_empty())
                .map(Role::from_group)
                .collect(),
        )
    }

    fn from_claim(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Array(items) => {
                Self::from_names(items.iter().filter_map(|v| v.as_str()))
            }
            _ => Self::default(),
        }
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(&Role::Admin)
    }
}

/// The authenticated caller, as asserted by the identity provider.
#[derive(Debug, Clone)]
pub struct Principal {
    /// External subject; the stable key for user resolution
    pub subject: String,
    /// Email claim, when the token carries one
    pub email: Option<String>,
    /// Cognito username
    pub username: Option<String>,
    pub roles: RoleSet,
}

impl TryFrom<CognitoClaims> for Principal {
    type Error = Error;

    fn try_from(claims: CognitoClaims) -> Result<Self> {
        let subject = claims
            .sub
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| claims.cognito_username.clone().filter(|s| !s.is_empty()))
            .ok_or_else(|| Error::Auth("Missing sub claim".to_string()))?;

        let roles = claims
            .groups
            .as_ref()
            .map(RoleSet::from_claim)
            .unwrap_or_default();

        Ok(Self {
            subject,
            email: claims.email.filter(|e| !e.is_empty()),
            username: claims.cognito_username,
            roles,
        })
    }
}

impl Principal {
    /// Build a principal from the authorizer's claims object.
    pub fn from_claims(claims: &serde_json::Value) -> Result<Self> {
        let claims: CognitoClaims = serde_json::from_value(claims.clone())
            .map_err(|e| Error::Auth(format!("Malformed claims: {}", e)))?;
        Self::try_from(claims)
    }

    /// Extract the principal from API Gateway request context.
    pub fn from_request(event: &Request) -> Result<Self> {
        let context = event
            .request_context_ref()
            .ok_or_else(|| Error::Auth("Missing request context".to_string()))?;

        let claims = context
            .authorizer()
            .and_then(|a| a.fields.get("claims"))
            .ok_or_else(|| Error::Auth("Missing claims in authorizer context".to_string()))?;

        Self::from_claims(claims)
    }

    /// Fail with `forbidden` unless the caller is in the admin group.
    pub fn require_admin(&self) -> Result<()> {
        if self.roles.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_group_claim_shapes() {
        for raw in ["admin,player", "admin player", "[admin, player]", r#"["admin","player"]"#] {
            let roles = RoleSet::parse(raw);
            assert!(roles.is_admin(), "{raw}");
            assert!(roles.contains(&Role::Player), "{raw}");
        }
    }

    #[test]
    fn test_unknown_groups_are_kept() {
        let roles = RoleSet::parse("beta-testers");
        assert!(roles.contains(&Role::Other("beta-testers".to_string())));
        assert!(!roles.is_admin());
        assert_eq!(RoleSet::parse("  "), RoleSet::default());
    }

    #[test]
    fn test_principal_from_claims() {
        let principal = Principal::from_claims(&json!({
            "sub": "3f1c-42",
            "email": "gm@example.com",
            "cognito:username": "gm",
            "cognito:groups": "admin",
        }))
        .unwrap();

        assert_eq!(principal.subject, "3f1c-42");
        assert_eq!(principal.email.as_deref(), Some("gm@example.com"));
        assert!(principal.require_admin().is_ok());
    }

    #[test]
    fn test_subject_falls_back_to_username() {
        let principal = Principal::from_claims(&json!({ "cognito:username": "player1" })).unwrap();
        assert_eq!(principal.subject, "player1");
        assert!(matches!(principal.require_admin(), Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_empty_sub_falls_back_to_username() {
        let principal =
            Principal::from_claims(&json!({ "sub": "", "cognito:username": "player1" })).unwrap();
        assert_eq!(principal.subject, "player1");

        let err = Principal::from_claims(&json!({ "sub": "", "cognito:username": "" })).unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }

    #[test]
    fn test_missing_subject_is_auth_error() {
        let err = Principal::from_claims(&json!({ "email": "x@example.com" })).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }
}
