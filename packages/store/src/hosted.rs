//! # HostedStore: the real Session Store over HTTP
//!
//! Talks to the two APIs a hosted backend-as-a-service project exposes:
//!
//! - the auth API under `/auth/v1/` (`user`, `otp`, `verify`, `authorize`, `logout`);
//! - the table API under `/rest/v1/` (PostgREST filters built by [`TableQuery`]).
//!
//! Every request carries the project's `apikey` header. Table requests are
//! authorised with the caller's access token so row-level policies see the real
//! user; when no token is at hand the API key doubles as the bearer.
//!
//! Error bodies come in a few shapes depending on the endpoint (`message`, `msg`,
//! `error_description`, `error`). [`error_message`] picks whichever is present
//! and the text is surfaced verbatim.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{AuthUser, NewNote, Note, Session, UserProfile};
use crate::postgrest::TableQuery;
use crate::repo::{OAuthProvider, OnConflict, SessionStore};

const USERS: &str = "users";
const NOTES: &str = "notes";

/// `users` row as written by an upsert. `created_at` is left to the column default.
#[derive(Serialize)]
struct UserRow<'a> {
    id: Uuid,
    name: &'a str,
    email: &'a str,
    dob: Option<chrono::NaiveDate>,
}

/// HTTP client for a hosted Session Store project.
#[derive(Clone, Debug)]
pub struct HostedStore {
    http: Client,
    base: Url,
    api_key: String,
}

impl HostedStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: &StoreConfig, http: Client) -> Result<Self> {
        Ok(Self {
            http,
            base: config.base_url()?,
            api_key: config.key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(&format!("auth/v1/{path}"))
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn table_url(&self, query: &TableQuery) -> Result<Url> {
        query
            .url(&self.base)
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Attach the project key and a bearer token.
    fn authorize(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        let bearer = if access_token.is_empty() {
            self.api_key.as_str()
        } else {
            access_token
        };
        request.header("apikey", &self.api_key).bearer_auth(bearer)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!(status = status.as_u16(), %message, "session store request failed");
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized(message));
        }
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        access_token: &str,
        query: TableQuery,
    ) -> Result<Option<T>> {
        let url = self.table_url(&query.limit(1))?;
        let rows: Vec<T> = self
            .json(self.authorize(self.http.get(url), access_token))
            .await?;
        Ok(rows.into_iter().next())
    }
}

/// Extract the human readable message from a failed response body.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Session store error")
        .to_string()
}

#[async_trait]
impl SessionStore for HostedStore {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        if access_token.is_empty() {
            return Err(StoreError::Unauthorized("missing access token".into()));
        }
        let url = self.auth_url("user")?;
        self.json(self.authorize(self.http.get(url), access_token))
            .await
    }

    async fn send_otp(&self, email: &str, create_user: bool) -> Result<()> {
        let url = self.auth_url("otp")?;
        let body = json!({ "email": email, "create_user": create_user });
        debug!(%email, create_user, "requesting one-time code");
        self.send(self.authorize(self.http.post(url), "").json(&body))
            .await?;
        Ok(())
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<Session> {
        let url = self.auth_url("verify")?;
        let body = json!({ "type": "email", "email": email, "token": token });
        self.json(self.authorize(self.http.post(url), "").json(&body))
            .await
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String> {
        let mut url = self.auth_url("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url.to_string())
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.auth_url("logout")?;
        self.send(self.authorize(self.http.post(url), access_token))
            .await?;
        Ok(())
    }

    async fn upsert_user(
        &self,
        access_token: &str,
        profile: &UserProfile,
        on_conflict: OnConflict,
    ) -> Result<UserProfile> {
        let url = self.table_url(&TableQuery::table(USERS).on_conflict("id"))?;
        let resolution = match on_conflict {
            OnConflict::Merge => "merge-duplicates",
            OnConflict::Ignore => "ignore-duplicates",
        };
        let row = UserRow {
            id: profile.id,
            name: &profile.name,
            email: &profile.email,
            dob: profile.dob,
        };
        let request = self
            .authorize(self.http.post(url), access_token)
            .header(
                "Prefer",
                format!("resolution={resolution},return=representation"),
            )
            .json(&[row]);
        let rows: Vec<UserProfile> = self.json(request).await?;

        match rows.into_iter().next() {
            Some(stored) => Ok(stored),
            // An ignored duplicate returns no representation.
            None => self
                .find_user_by_id(access_token, profile.id)
                .await?
                .ok_or(StoreError::NotFound("user")),
        }
    }

    async fn find_user_by_id(&self, access_token: &str, id: Uuid) -> Result<Option<UserProfile>> {
        let query = TableQuery::table(USERS).select("*").eq("id", id);
        self.select_one(access_token, query).await
    }

    async fn find_user_by_email(
        &self,
        access_token: &str,
        email: &str,
    ) -> Result<Option<UserProfile>> {
        let query = TableQuery::table(USERS).select("*").eq("email", email);
        self.select_one(access_token, query).await
    }

    async fn insert_note(&self, access_token: &str, note: &NewNote) -> Result<Note> {
        let url = self.table_url(&TableQuery::table(NOTES))?;
        let request = self
            .authorize(self.http.post(url), access_token)
            .header("Prefer", "return=representation")
            .json(&[note]);
        let rows: Vec<Note> = self.json(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".into()))
    }

    async fn list_notes(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Note>> {
        let query = TableQuery::table(NOTES)
            .select("*")
            .eq("user_id", user_id)
            .order_desc("created_at");
        let url = self.table_url(&query)?;
        self.json(self.authorize(self.http.get(url), access_token))
            .await
    }

    async fn delete_note(&self, access_token: &str, id: Uuid, user_id: Uuid) -> Result<()> {
        let query = TableQuery::table(NOTES)
            .eq("id", id)
            .eq("user_id", user_id);
        let url = self.table_url(&query)?;
        self.send(self.authorize(self.http.delete(url), access_token))
            .await?;
        Ok(())
    }
}
