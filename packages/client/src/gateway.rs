//! Typed HTTP client for the Auth Gateway.

use api::models::{CreateNoteRequest, ErrorResponse, LoginRequest, LoginResponse, MessageResponse};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use store::{Note, UserProfile};
use url::Url;
use uuid::Uuid;

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl GatewayClient {
    /// Client for the gateway at `base`, e.g. `http://localhost:5000`.
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            token: None,
        })
    }

    /// Use an application token obtained earlier.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        Err(ClientError::Gateway {
            status: status.as_u16(),
            message,
        })
    }

    /// Exchange a Session Store access token for an application token and keep it.
    pub async fn login(&mut self, supabase_token: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint("api/login")?)
            .json(&LoginRequest::new(supabase_token))
            .send()
            .await?;
        let LoginResponse { token } = Self::parse(response).await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>, ClientError> {
        let request = self.http.get(self.endpoint("api/notes")?);
        Self::parse(self.authorized(request).send().await?).await
    }

    pub async fn create_note(&self, content: &str) -> Result<Note, ClientError> {
        let request = self
            .http
            .post(self.endpoint("api/notes")?)
            .json(&CreateNoteRequest::new(content));
        let notes: Vec<Note> = Self::parse(self.authorized(request).send().await?).await?;
        notes.into_iter().next().ok_or_else(|| ClientError::Gateway {
            status: 200,
            message: "Empty response".into(),
        })
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<String, ClientError> {
        let request = self.http.delete(self.endpoint(&format!("api/notes/{id}"))?);
        let MessageResponse { message } =
            Self::parse(self.authorized(request).send().await?).await?;
        Ok(message)
    }

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let request = self.http.get(self.endpoint("api/me")?);
        Self::parse(self.authorized(request).send().await?).await
    }
}
