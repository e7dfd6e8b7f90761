//! # Repository: the Session Store seen as one async interface
//!
//! [`SessionStore`] covers both halves of the hosted backend: the auth API
//! (OTP, OAuth, user lookup, sign-out) and the two tables this application reads
//! and writes (`users` and `notes`). Implementations live in sibling modules
//! ([`crate::hosted`] for the real service, [`crate::memory`] for tests and local
//! development), so the gateway and the client application are written once.
//!
//! ## Auth path
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`get_user`](SessionStore::get_user) | Resolves an access token to its [`AuthUser`]. |
//! | [`send_otp`](SessionStore::send_otp) | Asks the store to email a one-time code. |
//! | [`verify_otp`](SessionStore::verify_otp) | Exchanges email + code for a [`Session`]. |
//! | [`authorize_url`](SessionStore::authorize_url) | Builds the hosted OAuth entry point for a provider. |
//! | [`sign_out`](SessionStore::sign_out) | Revokes an access token. |
//!
//! ## Table path
//!
//! Every note read and delete carries the owner filter (`user_id = caller`).
//! Deleting a note that does not match is not an error.
//!
//! ## Ensuring a user row
//!
//! [`ensure_user`] replaces the select-then-insert dance with one upsert keyed on
//! the identity id, so two overlapping sign-ins cannot create duplicate rows.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuthUser, NewNote, Note, Session, SignupDetails, UserProfile, FALLBACK_NAME,
};

/// OAuth providers the hosted auth service is configured for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }
}

/// What an upsert does when a row with the same id already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnConflict {
    /// Overwrite the existing row with the new values.
    Merge,
    /// Keep the existing row untouched.
    Ignore,
}

/// Async interface to the hosted auth service and its tables.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the identity behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser>;

    /// Send a one-time code to `email`. `create_user` allows sign-up.
    async fn send_otp(&self, email: &str, create_user: bool) -> Result<()>;

    /// Verify an emailed code and open a session.
    async fn verify_otp(&self, email: &str, token: &str) -> Result<Session>;

    /// URL the browser must visit to start an OAuth sign-in.
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Insert a `users` row keyed on its id, resolving an existing row per
    /// `on_conflict`. Returns the row as stored.
    async fn upsert_user(
        &self,
        access_token: &str,
        profile: &UserProfile,
        on_conflict: OnConflict,
    ) -> Result<UserProfile>;

    async fn find_user_by_id(&self, access_token: &str, id: Uuid) -> Result<Option<UserProfile>>;

    async fn find_user_by_email(
        &self,
        access_token: &str,
        email: &str,
    ) -> Result<Option<UserProfile>>;

    /// Insert a note and return the stored row.
    async fn insert_note(&self, access_token: &str, note: &NewNote) -> Result<Note>;

    /// Notes owned by `user_id`, newest first.
    async fn list_notes(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Note>>;

    /// Delete the note with `id` if it is owned by `user_id`.
    async fn delete_note(&self, access_token: &str, id: Uuid, user_id: Uuid) -> Result<()>;
}

/// Build the `users` row that mirrors `user`.
///
/// Signup details win; otherwise the provider's full name is used, then
/// [`FALLBACK_NAME`]. OAuth identities have no date of birth.
pub fn profile_for(user: &AuthUser, details: Option<&SignupDetails>) -> UserProfile {
    let name = details
        .map(|d| d.name.trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| user.full_name().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    UserProfile {
        id: user.id,
        name,
        email: user.email.clone().unwrap_or_default(),
        dob: details.and_then(|d| d.dob),
        created_at: Utc::now(),
    }
}

/// Make sure a `users` row exists for an authenticated identity.
///
/// A signup overwrites whatever row exists; a plain sign-in only creates the
/// row when it is missing, so an OAuth login never wipes a stored date of birth.
pub async fn ensure_user<S>(
    store: &S,
    access_token: &str,
    user: &AuthUser,
    details: Option<&SignupDetails>,
) -> Result<UserProfile>
where
    S: SessionStore + ?Sized,
{
    let profile = profile_for(user, details);
    tracing::debug!(user_id = %profile.id, "ensuring user row");
    let on_conflict = if details.is_some() {
        OnConflict::Merge
    } else {
        OnConflict::Ignore
    };
    store.upsert_user(access_token, &profile, on_conflict).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_profile_prefers_signup_details() {
        let mut user = AuthUser::new(Uuid::new_v4(), "a@x.com");
        user.user_metadata = json!({ "full_name": "Provider Name" });
        let details = SignupDetails {
            name: "A".to_string(),
            dob: NaiveDate::from_ymd_opt(2000, 1, 1),
        };

        let profile = profile_for(&user, Some(&details));
        assert_eq!(profile.name, "A");
        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.dob, NaiveDate::from_ymd_opt(2000, 1, 1));
        assert_eq!(profile.id, user.id);
    }

    #[test]
    fn test_profile_uses_provider_name() {
        let mut user = AuthUser::new(Uuid::new_v4(), "g@x.com");
        user.user_metadata = json!({ "full_name": "Grace" });

        let profile = profile_for(&user, None);
        assert_eq!(profile.name, "Grace");
        assert!(profile.dob.is_none());
    }

    #[test]
    fn test_profile_falls_back_to_google_user() {
        let user = AuthUser::new(Uuid::new_v4(), "g@x.com");
        let blank = SignupDetails {
            name: "   ".to_string(),
            dob: None,
        };

        assert_eq!(profile_for(&user, None).name, FALLBACK_NAME);
        assert_eq!(profile_for(&user, Some(&blank)).name, FALLBACK_NAME);
    }
}
