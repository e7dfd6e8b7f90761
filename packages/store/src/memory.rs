use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::{AuthUser, NewNote, Note, Session, UserProfile};
use crate::repo::{OAuthProvider, OnConflict, SessionStore};

const AUTHORIZE_BASE: &str = "http://localhost:54321/auth/v1/authorize";
const SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Default)]
struct Inner {
    identities: HashMap<Uuid, AuthUser>,
    sessions: HashMap<String, Uuid>,
    codes: HashMap<String, String>,
    users: HashMap<Uuid, UserProfile>,
    /// Notes with their insertion sequence, used to order equal timestamps.
    notes: Vec<(u64, Note)>,
    seq: u64,
    table_failure: Option<String>,
}

impl Inner {
    fn identity_by_email(&self, email: &str) -> Option<&AuthUser> {
        self.identities
            .values()
            .find(|u| u.email.as_deref() == Some(email))
    }

    fn open_session(&mut self, user: AuthUser) -> Session {
        let token = random_token();
        self.sessions.insert(token.clone(), user.id);
        Session {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: Some(SESSION_TTL_SECS),
            refresh_token: Some(random_token()),
            user,
        }
    }

    /// Empty token means the project key; anything else must be a live session.
    fn check_table_access(&self, access_token: &str) -> Result<()> {
        if let Some(message) = &self.table_failure {
            return Err(StoreError::Api {
                status: 400,
                message: message.clone(),
            });
        }
        if access_token.is_empty() || self.sessions.contains_key(access_token) {
            Ok(())
        } else {
            Err(StoreError::Unauthorized("JWT expired".to_string()))
        }
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

fn random_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// In-memory SessionStore for tests and local development.
///
/// Emails are never sent: the last code issued for an address is available
/// through [`MemoryStore::last_otp`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last one-time code issued for `email`.
    pub fn last_otp(&self, email: &str) -> Option<String> {
        self.lock().codes.get(email).cloned()
    }

    /// Open a session for an email identity, creating it if needed.
    pub fn issue_session(&self, email: &str) -> Session {
        let mut inner = self.lock();
        let user = match inner.identity_by_email(email) {
            Some(user) => user.clone(),
            None => {
                let mut user = AuthUser::new(Uuid::new_v4(), email);
                user.app_metadata = json!({ "provider": "email" });
                inner.identities.insert(user.id, user.clone());
                user
            }
        };
        inner.open_session(user)
    }

    /// Open a session as if the user had come back from a Google sign-in.
    pub fn issue_oauth_session(&self, email: &str, full_name: Option<&str>) -> Session {
        let mut inner = self.lock();
        let id = inner
            .identity_by_email(email)
            .map(|u| u.id)
            .unwrap_or_else(Uuid::new_v4);
        let mut user = AuthUser::new(id, email);
        user.app_metadata = json!({ "provider": "google" });
        if let Some(name) = full_name {
            user.user_metadata = json!({ "full_name": name });
        }
        inner.identities.insert(id, user.clone());
        inner.open_session(user)
    }

    /// Make every table operation fail with `message` until cleared.
    pub fn fail_tables(&self, message: Option<&str>) {
        self.lock().table_failure = message.map(str::to_string);
    }

    pub fn users(&self) -> Vec<UserProfile> {
        self.lock().users.values().cloned().collect()
    }

    pub fn note_count(&self) -> usize {
        self.lock().notes.len()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let inner = self.lock();
        inner
            .sessions
            .get(access_token)
            .and_then(|id| inner.identities.get(id))
            .cloned()
            .ok_or_else(|| {
                StoreError::Unauthorized("invalid JWT: unable to parse or verify signature".into())
            })
    }

    async fn send_otp(&self, email: &str, create_user: bool) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Api {
                status: 400,
                message: "Unable to validate email address: invalid format".into(),
            });
        }
        let mut inner = self.lock();
        if !create_user && inner.identity_by_email(email).is_none() {
            return Err(StoreError::Api {
                status: 422,
                message: "Signups not allowed for otp".into(),
            });
        }
        let code = random_code();
        tracing::debug!(%email, "issued one-time code");
        inner.codes.insert(email.to_string(), code);
        Ok(())
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<Session> {
        let email = email.trim();
        let mut inner = self.lock();
        let valid = inner.codes.get(email).is_some_and(|code| code == token.trim());
        if !valid {
            return Err(StoreError::Unauthorized(
                "Token has expired or is invalid".into(),
            ));
        }
        inner.codes.remove(email);
        let user = match inner.identity_by_email(email) {
            Some(user) => user.clone(),
            None => {
                let mut user = AuthUser::new(Uuid::new_v4(), email);
                user.app_metadata = json!({ "provider": "email" });
                inner.identities.insert(user.id, user.clone());
                user
            }
        };
        Ok(inner.open_session(user))
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String> {
        let mut url = Url::parse(AUTHORIZE_BASE).map_err(|e| StoreError::Decode(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url.to_string())
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.lock().sessions.remove(access_token);
        Ok(())
    }

    async fn upsert_user(
        &self,
        access_token: &str,
        profile: &UserProfile,
        on_conflict: OnConflict,
    ) -> Result<UserProfile> {
        let mut inner = self.lock();
        inner.check_table_access(access_token)?;
        let stored = match (inner.users.get(&profile.id).cloned(), on_conflict) {
            (Some(existing), OnConflict::Ignore) => existing,
            (Some(existing), OnConflict::Merge) => UserProfile {
                created_at: existing.created_at,
                ..profile.clone()
            },
            (None, _) => profile.clone(),
        };
        inner.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_user_by_id(&self, access_token: &str, id: Uuid) -> Result<Option<UserProfile>> {
        let inner = self.lock();
        inner.check_table_access(access_token)?;
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        access_token: &str,
        email: &str,
    ) -> Result<Option<UserProfile>> {
        let inner = self.lock();
        inner.check_table_access(access_token)?;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_note(&self, access_token: &str, note: &NewNote) -> Result<Note> {
        let mut inner = self.lock();
        inner.check_table_access(access_token)?;
        let stored = Note {
            id: Uuid::new_v4(),
            user_id: note.user_id,
            content: note.content.clone(),
            user_name: note.user_name.clone(),
            created_at: Utc::now(),
        };
        inner.seq += 1;
        let seq = inner.seq;
        inner.notes.push((seq, stored.clone()));
        Ok(stored)
    }

    async fn list_notes(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Note>> {
        let inner = self.lock();
        inner.check_table_access(access_token)?;
        let mut owned: Vec<&(u64, Note)> = inner
            .notes
            .iter()
            .filter(|(_, note)| note.user_id == user_id)
            .collect();
        owned.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        Ok(owned.into_iter().map(|(_, note)| note.clone()).collect())
    }

    async fn delete_note(&self, access_token: &str, id: Uuid, user_id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        inner.check_table_access(access_token)?;
        inner
            .notes
            .retain(|(_, note)| !(note.id == id && note.user_id == user_id));
        Ok(())
    }
}
