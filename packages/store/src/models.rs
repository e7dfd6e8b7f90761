//! # Domain models for identities, profiles and notes
//!
//! These are the shapes the Session Store speaks. They are `Serialize + Deserialize`
//! so they travel unchanged between the hosted auth/table APIs, the gateway's JSON
//! responses and the client application.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`AuthUser`] | An identity owned by the auth service. Carries the id, the email and the two free-form metadata bags (`user_metadata`, `app_metadata`). |
//! | [`Session`] | The result of a successful OTP verification or OAuth sign-in: an access token plus the [`AuthUser`] it belongs to. |
//! | [`UserProfile`] | A row of the `users` table mirroring an identity with a display name and an optional date of birth. |
//! | [`Note`] | A row of the `notes` table. |
//! | [`NewNote`] | The insert payload for a note; the store fills in `id` and `created_at`. |
//! | [`SignupDetails`] | Name and date of birth collected by the signup form. |
//!
//! ## Helper functions
//!
//! - [`AuthUser::full_name`] reads `user_metadata.full_name` (set by Google).
//! - [`AuthUser::provider`] reads `app_metadata.provider` (`"email"`, `"google"`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name used for OAuth identities that do not expose a full name.
pub const FALLBACK_NAME: &str = "Google User";

/// Identity as reported by the Session Store's user-lookup call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
}

impl AuthUser {
    /// Create an identity with empty metadata.
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            user_metadata: serde_json::Value::Null,
            app_metadata: serde_json::Value::Null,
        }
    }

    /// Full name supplied by the identity provider, if any.
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Provider that authenticated this identity (`"email"`, `"google"`).
    pub fn provider(&self) -> Option<&str> {
        self.app_metadata.get("provider").and_then(|v| v.as_str())
    }
}

/// An authenticated session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// A row of the `users` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Date of birth, `YYYY-MM-DD`. Unknown for OAuth sign-ups.
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Details captured by the signup form.
#[derive(Clone, Debug, PartialEq)]
pub struct SignupDetails {
    pub name: String,
    pub dob: Option<NaiveDate>,
}

/// A row of the `notes` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    /// Author name denormalised by the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `notes` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub user_id: Uuid,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl NewNote {
    pub fn new(user_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            user_id,
            content: content.into(),
            user_name: None,
        }
    }

    /// Builder method to record the author's display name.
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_user_metadata_helpers() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "6f1c1d4e-5f0b-4a57-9a39-0b7f0c0a9d11",
            "email": "g@x.com",
            "user_metadata": { "full_name": "Grace Hopper" },
            "app_metadata": { "provider": "google" }
        }))
        .unwrap();

        assert_eq!(user.full_name(), Some("Grace Hopper"));
        assert_eq!(user.provider(), Some("google"));
    }

    #[test]
    fn test_auth_user_without_metadata() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "6f1c1d4e-5f0b-4a57-9a39-0b7f0c0a9d11"
        }))
        .unwrap();

        assert!(user.email.is_none());
        assert!(user.full_name().is_none());
        assert!(user.provider().is_none());
    }

    #[test]
    fn test_profile_dob_is_iso_date() {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            dob: NaiveDate::from_ymd_opt(2000, 1, 1),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["dob"], "2000-01-01");
    }

    #[test]
    fn test_new_note_omits_missing_user_name() {
        let note = NewNote::new(Uuid::new_v4(), "buy milk");
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("user_name").is_none());
        assert_eq!(value["content"], "buy milk");
    }
}
