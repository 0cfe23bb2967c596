//! In-memory store for tests. Enforces the same uniqueness rules as the
//! schema: one user per subject, one membership per (campaign, user), one
//! character per (campaign, user), one pending invitation per
//! (campaign, lower(email)).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{CampaignStore, CharacterStore, InvitationStore, SessionStore, UserStore};
use crate::models::{
    Campaign, Character, Invitation, Member, MemberRole, NewSession, NewUser, Session,
};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub subject: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub campaign_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: Vec<UserRow>,
    campaigns: Vec<Campaign>,
    memberships: Vec<MembershipRow>,
    invitations: Vec<Invitation>,
    sessions: Vec<Session>,
    characters: Vec<(Uuid, Uuid, Character)>,
}

impl State {
    fn is_member(&self, campaign: Uuid, user: Uuid) -> bool {
        self.campaigns.iter().any(|c| c.id == campaign && c.gm_id == user)
            || self
                .memberships
                .iter()
                .any(|m| m.campaign_id == campaign && m.user_id == user)
    }

    fn add_member(&mut self, campaign: Uuid, user: Uuid, role: MemberRole) {
        let exists = self
            .memberships
            .iter()
            .any(|m| m.campaign_id == campaign && m.user_id == user);
        if !exists {
            self.memberships.push(MembershipRow {
                campaign_id: campaign,
                user_id: user,
                role,
                joined_at: Utc::now(),
            });
        }
    }
}

/// Mirrors the predicate of `invitations_pending_idx`.
fn holds_slot(invitation: &Invitation) -> bool {
    invitation.accepted_at.is_none() && invitation.superseded_at.is_none()
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Subject lookups that report "absent" regardless of contents, to
    /// replay a concurrent first-use race.
    stale_lookups: AtomicUsize,
    /// Next user insert fails with a unique violation, as a concurrent
    /// insert of the same subject would.
    reject_next_user_insert: AtomicBool,
    /// Next redemption finds the invitation already taken by another
    /// caller between its read and its update.
    lose_next_accept: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` subject lookups miss.
    pub fn miss_next_lookups(&self, n: usize) {
        self.stale_lookups.store(n, Ordering::SeqCst);
    }

    /// Make the next user insert fail with a unique violation.
    pub fn reject_next_user_insert(&self) {
        self.reject_next_user_insert.store(true, Ordering::SeqCst);
    }

    /// Let another caller accept the invitation just before the next
    /// redemption's update.
    pub fn lose_next_accept(&self) {
        self.lose_next_accept.store(true, Ordering::SeqCst);
    }

    pub fn seed_user(&self, subject: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().users.push(UserRow {
            id,
            subject: subject.to_string(),
            email: format!("{}@example.com", subject),
            username: subject.to_string(),
        });
        id
    }

    pub fn users(&self) -> Vec<UserRow> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn invitations(&self) -> Vec<Invitation> {
        self.state.lock().unwrap().invitations.clone()
    }

    pub fn campaign_exists(&self, campaign: Uuid) -> bool {
        self.state.lock().unwrap().campaigns.iter().any(|c| c.id == campaign)
    }

    /// Move an invitation's expiry, as if it had been issued earlier.
    pub fn set_expiry(&self, token_hash: &str, expires_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        for invitation in state.invitations.iter_mut().filter(|i| i.token_hash == token_hash) {
            invitation.expires_at = expires_at;
        }
    }

    pub fn add_player(&self, campaign: Uuid, user: Uuid) {
        self.state
            .lock()
            .unwrap()
            .add_member(campaign, user, MemberRole::Player);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_id(&self, subject: &str) -> Result<Option<Uuid>> {
        let stale = self
            .stale_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.subject == subject).map(|u| u.id))
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Option<Uuid>> {
        if self.reject_next_user_insert.swap(false, Ordering::SeqCst) {
            return Err(Error::UniqueViolation(
                "duplicate key value violates unique constraint \"users_cognito_user_id_key\"".into(),
            ));
        }
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.subject == user.subject) {
            return Ok(None);
        }
        let id = Uuid::new_v4();
        state.users.push(UserRow {
            id,
            subject: user.subject.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        });
        Ok(Some(id))
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn create_campaign(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Uuid> {
        let mut state = self.state.lock().unwrap();
        let id = Uuid::new_v4();
        // newest first, like ORDER BY created_at DESC
        state.campaigns.insert(
            0,
            Campaign {
                id,
                name: name.to_string(),
                description: description.map(String::from),
                status: "active".to_string(),
                gm_id: owner,
            },
        );
        state.add_member(id, owner, MemberRole::Owner);
        Ok(id)
    }

    async fn campaigns_for_user(&self, user: Uuid) -> Result<Vec<Campaign>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .campaigns
            .iter()
            .filter(|c| state.is_member(c.id, user))
            .take(50)
            .cloned()
            .collect())
    }

    async fn campaign_for_member(&self, campaign: Uuid, user: Uuid) -> Result<Option<Campaign>> {
        let state = self.state.lock().unwrap();
        if !state.is_member(campaign, user) {
            return Ok(None);
        }
        Ok(state.campaigns.iter().find(|c| c.id == campaign).cloned())
    }

    async fn is_owner(&self, campaign: Uuid, user: Uuid) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.campaigns.iter().any(|c| c.id == campaign && c.gm_id == user))
    }

    async fn is_member(&self, campaign: Uuid, user: Uuid) -> Result<bool> {
        Ok(self.state.lock().unwrap().is_member(campaign, user))
    }

    async fn delete_owned_campaign(&self, campaign: Uuid, owner: Uuid) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.campaigns.len();
        state.campaigns.retain(|c| !(c.id == campaign && c.gm_id == owner));
        if state.campaigns.len() == before {
            return Ok(false);
        }
        state.memberships.retain(|m| m.campaign_id != campaign);
        state.invitations.retain(|i| i.campaign_id != campaign);
        state.sessions.retain(|s| s.campaign_id != campaign);
        state.characters.retain(|(c, _, _)| *c != campaign);
        Ok(true)
    }

    async fn members(&self, campaign: Uuid) -> Result<Vec<Member>> {
        let state = self.state.lock().unwrap();
        let mut members: Vec<Member> = state
            .memberships
            .iter()
            .filter(|m| m.campaign_id == campaign)
            .filter_map(|m| {
                state.users.iter().find(|u| u.id == m.user_id).map(|u| Member {
                    user_id: u.id,
                    username: u.username.clone(),
                    email: u.email.clone(),
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        // owner first, then by join time
        members.sort_by_key(|m| (m.role != MemberRole::Owner, m.joined_at));
        Ok(members)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn pending_invitation_exists(
        &self,
        campaign: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.invitations.iter().any(|i| {
            i.campaign_id == campaign
                && i.email.eq_ignore_ascii_case(email)
                && holds_slot(i)
                && i.expires_at > now
        }))
    }

    async fn insert_invitation(&self, invitation: &Invitation, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        for stale in state.invitations.iter_mut().filter(|i| {
            i.campaign_id == invitation.campaign_id
                && i.email.eq_ignore_ascii_case(&invitation.email)
                && holds_slot(i)
                && i.expires_at <= now
        }) {
            stale.superseded_at = Some(now);
        }

        let slot_taken = state.invitations.iter().any(|i| {
            i.campaign_id == invitation.campaign_id
                && i.email.eq_ignore_ascii_case(&invitation.email)
                && holds_slot(i)
        });
        if slot_taken {
            return Ok(false);
        }
        state.invitations.push(invitation.clone());
        Ok(true)
    }

    async fn find_invitation(&self, token_hash: &str) -> Result<Option<Invitation>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invitations
            .iter()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn accept_invitation(
        &self,
        token_hash: &str,
        user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let mut state = self.state.lock().unwrap();
        if self.lose_next_accept.swap(false, Ordering::SeqCst) {
            for taken in state.invitations.iter_mut().filter(|i| i.token_hash == token_hash) {
                taken.accepted_at = Some(now);
            }
        }
        let Some(invitation) = state
            .invitations
            .iter_mut()
            .find(|i| i.token_hash == token_hash && holds_slot(i) && i.expires_at > now)
        else {
            return Ok(None);
        };
        invitation.accepted_at = Some(now);
        let campaign_id = invitation.campaign_id;
        state.add_member(campaign_id, user, MemberRole::Player);
        Ok(Some(campaign_id))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &NewSession) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().sessions.push(Session {
            id,
            campaign_id: session.campaign_id,
            title: session.title.clone(),
            scheduled_at: session.scheduled_at,
            duration_minutes: session.duration_minutes,
            status: "scheduled".to_string(),
        });
        Ok(id)
    }

    async fn sessions(&self, campaign: Uuid) -> Result<Vec<Session>> {
        let state = self.state.lock().unwrap();
        let mut sessions: Vec<Session> = state
            .sessions
            .iter()
            .filter(|s| s.campaign_id == campaign)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        sessions.truncate(100);
        Ok(sessions)
    }

    async fn delete_session(&self, campaign: Uuid, session: Uuid) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.sessions.len();
        state
            .sessions
            .retain(|s| !(s.id == session && s.campaign_id == campaign));
        Ok(state.sessions.len() < before)
    }
}

#[async_trait]
impl CharacterStore for MemoryStore {
    async fn character(&self, campaign: Uuid, user: Uuid) -> Result<Option<Character>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .characters
            .iter()
            .find(|(c, u, _)| *c == campaign && *u == user)
            .map(|(_, _, character)| character.clone()))
    }

    async fn upsert_character(
        &self,
        campaign: Uuid,
        user: Uuid,
        name: &str,
        class: &str,
        level: i32,
    ) -> Result<Uuid> {
        let mut state = self.state.lock().unwrap();
        if let Some((_, _, existing)) = state
            .characters
            .iter_mut()
            .find(|(c, u, _)| *c == campaign && *u == user)
        {
            existing.name = name.to_string();
            existing.class = class.to_string();
            existing.level = level;
            return Ok(existing.id);
        }
        let id = Uuid::new_v4();
        state.characters.push((
            campaign,
            user,
            Character {
                id,
                name: name.to_string(),
                class: class.to_string(),
                level,
            },
        ));
        Ok(id)
    }
}
