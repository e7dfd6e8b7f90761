//! HTTP handlers of the gateway.
//!
//! Table calls are made with the project key (empty access token); the owner
//! filter is always the `id` claim of the caller's application token.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Redirect,
    Json,
};
use store::{NewNote, Note, OAuthProvider, StoreError, UserProfile};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::models::{CreateNoteRequest, LoginRequest, LoginResponse, MessageResponse};
use crate::state::AppState;

const PROJECT_KEY: &str = "";

/// Exchange a Session Store access token for an application token.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    // An unreadable body carries no usable token.
    let request = body.map(|Json(request)| request).unwrap_or_else(|rejection| {
        debug!(error = %rejection.body_text(), "unreadable login body");
        LoginRequest::default()
    });
    let token = request
        .supabase_token
        .filter(|t| !t.trim().is_empty())
        .ok_or(ApiError::InvalidSessionToken)?;

    let user = match state.store.get_user(&token).await {
        Ok(user) => user,
        Err(StoreError::Http(e)) => {
            error!(error = %e, "session store unreachable during login");
            return Err(ApiError::LoginFailed);
        }
        Err(e) => {
            debug!(error = %e, "session store rejected token");
            return Err(ApiError::InvalidSessionToken);
        }
    };

    let token = state.tokens.issue(user.id, user.email.clone()).map_err(|e| {
        error!(error = %e, "failed to sign application token");
        ApiError::LoginFailed
    })?;

    info!(user_id = %user.id, "issued application token");
    Ok(Json(LoginResponse { token }))
}

/// Create a note owned by the caller.
pub async fn create_note(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    body: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let content = request
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Note content is required".into()))?;

    let note = state
        .store
        .insert_note(PROJECT_KEY, &NewNote::new(claims.id, content))
        .await?;

    debug!(user_id = %claims.id, note_id = %note.id, "created note");
    Ok(Json(vec![note]))
}

/// All notes of the caller, newest first.
pub async fn list_notes(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.store.list_notes(PROJECT_KEY, claims.id).await?;
    Ok(Json(notes))
}

/// Delete one of the caller's notes.
///
/// Succeeds even when nothing matched.
pub async fn delete_note(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| {
        ApiError::Validation(format!("invalid input syntax for type uuid: \"{id}\""))
    })?;

    state.store.delete_note(PROJECT_KEY, id, claims.id).await?;

    debug!(user_id = %claims.id, note_id = %id, "deleted note");
    Ok(Json(MessageResponse {
        message: "Note deleted".into(),
    }))
}

/// The caller's row in the `users` table.
pub async fn me(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .store
        .find_user_by_id(PROJECT_KEY, claims.id)
        .await?
        .map(Json)
        .ok_or(ApiError::UserNotFound)
}

/// Send the browser to the Session Store's Google sign-in page.
pub async fn google_login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state
        .store
        .authorize_url(OAuthProvider::Google, &state.auth_redirect)?;
    Ok(Redirect::to(&url))
}
