//! Dashboard page model: the signed-in user's profile and notes.
//!
//! The local list only changes after the store has confirmed an operation.
//! Two tabs editing at once are not reconciled; the last list loaded wins.

use std::sync::Arc;

use store::{NewNote, Note, SessionStore, StoreError, UserProfile};
use tracing::error;
use uuid::Uuid;

use crate::error::ClientError;
use crate::route::Route;
use crate::session::{AuthEvent, SessionObserver, SessionState};

/// Outcome of [`Dashboard::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    /// The session check has not finished; show a placeholder and load again later.
    Checking,
    /// No usable session: go to this page instead.
    Redirect(Route),
}

pub struct Dashboard {
    store: Arc<dyn SessionStore>,
    observer: SessionObserver,
    user: Option<UserProfile>,
    notes: Vec<Note>,
    error: Option<String>,
    loading: bool,
}

impl Dashboard {
    pub fn new(store: Arc<dyn SessionStore>, observer: SessionObserver) -> Self {
        Self {
            store,
            observer,
            user: None,
            notes: Vec::new(),
            error: None,
            loading: true,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Notes, newest first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn access_token(&self) -> Result<String, ClientError> {
        self.observer
            .session()
            .map(|s| s.access_token)
            .ok_or(ClientError::NotSignedIn)
    }

    fn record(&mut self, err: ClientError) -> ClientError {
        error!(error = %err, "dashboard error");
        self.error = Some(err.to_string());
        err
    }

    /// Resolve the user, their `users` row and their notes.
    pub async fn load(&mut self) -> Result<LoadOutcome, ClientError> {
        self.loading = true;
        let result = self.load_inner().await;
        self.loading = matches!(result, Ok(LoadOutcome::Checking));
        result
    }

    fn leave(&self) -> LoadOutcome {
        let target = self.observer.redirect(Route::Dashboard).unwrap_or(Route::SignIn);
        LoadOutcome::Redirect(target)
    }

    async fn load_inner(&mut self) -> Result<LoadOutcome, ClientError> {
        let token = match self.observer.state() {
            SessionState::Authenticated(session) => session.access_token,
            SessionState::Authenticating => return Ok(LoadOutcome::Checking),
            SessionState::Anonymous => return Ok(self.leave()),
        };

        let auth_user = match self.store.get_user(&token).await {
            Ok(user) => user,
            Err(StoreError::Unauthorized(_)) => {
                self.observer.apply(AuthEvent::SignedOut);
                return Ok(self.leave());
            }
            Err(e) => return Err(self.record(e.into())),
        };

        let Some(email) = auth_user.email.as_deref() else {
            return Err(self.record(ClientError::MissingProfile));
        };
        let profile = match self.store.find_user_by_email(&token, email).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(self.record(ClientError::MissingProfile)),
            Err(e) => return Err(self.record(e.into())),
        };

        let notes = match self.store.list_notes(&token, profile.id).await {
            Ok(notes) => notes,
            Err(e) => return Err(self.record(e.into())),
        };

        self.user = Some(profile);
        self.notes = notes;
        self.error = None;
        Ok(LoadOutcome::Ready)
    }

    /// Add a note. Blank input is ignored.
    pub async fn add_note(&mut self, content: &str) -> Result<Option<Note>, ClientError> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        let token = self.access_token()?;
        let user = self.user.as_ref().ok_or(ClientError::NotSignedIn)?;
        let note = NewNote::new(user.id, content).with_user_name(user.name.clone());

        match self.store.insert_note(&token, &note).await {
            Ok(stored) => {
                self.notes.insert(0, stored.clone());
                Ok(Some(stored))
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    /// Delete one of the user's notes.
    pub async fn delete_note(&mut self, id: Uuid) -> Result<(), ClientError> {
        let token = self.access_token()?;
        let user_id = self.user.as_ref().ok_or(ClientError::NotSignedIn)?.id;

        match self.store.delete_note(&token, id, user_id).await {
            Ok(()) => {
                self.notes.retain(|n| n.id != id);
                Ok(())
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    /// Sign out and return the page to show next.
    pub async fn sign_out(&mut self) -> Route {
        if let Ok(token) = self.access_token() {
            if let Err(e) = self.store.sign_out(&token).await {
                error!(error = %e, "sign out failed");
            }
        }
        self.observer.apply(AuthEvent::SignedOut);
        self.user = None;
        self.notes.clear();
        Route::SignIn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{ensure_user, MemoryStore};

    async fn signed_in(store: &MemoryStore, email: &str) -> SessionObserver {
        let session = store.issue_session(email);
        ensure_user(store, &session.access_token, &session.user, None)
            .await
            .unwrap();
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::SignedIn(session));
        observer
    }

    fn dashboard(store: &MemoryStore, observer: &SessionObserver) -> Dashboard {
        Dashboard::new(Arc::new(store.clone()), observer.clone())
    }

    #[tokio::test]
    async fn test_load_without_session_redirects() {
        let store = MemoryStore::new();
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::InitialSession(None));

        let mut page = dashboard(&store, &observer);
        assert_eq!(page.load().await.unwrap(), LoadOutcome::Redirect(Route::SignIn));
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn test_load_waits_for_session_check() {
        let store = MemoryStore::new();
        let stored = store.issue_session("a@x.com");
        ensure_user(&store, "", &stored.user, None).await.unwrap();
        let observer = SessionObserver::new();

        let mut page = dashboard(&store, &observer);
        assert_eq!(observer.redirect(Route::Dashboard), None);
        assert_eq!(page.load().await.unwrap(), LoadOutcome::Checking);
        assert!(page.is_loading());
        assert!(page.user().is_none());

        observer.restore(&store, Some(stored)).await;
        assert_eq!(page.load().await.unwrap(), LoadOutcome::Ready);
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn test_load_with_revoked_session_signs_out() {
        let store = MemoryStore::new();
        let observer = signed_in(&store, "a@x.com").await;
        store
            .sign_out(&observer.session().unwrap().access_token)
            .await
            .unwrap();

        let mut page = dashboard(&store, &observer);
        assert_eq!(page.load().await.unwrap(), LoadOutcome::Redirect(Route::SignIn));
        assert!(!observer.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_load_reports_missing_profile() {
        let store = MemoryStore::new();
        let session = store.issue_session("a@x.com");
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::SignedIn(session));

        let mut page = dashboard(&store, &observer);
        assert!(matches!(page.load().await, Err(ClientError::MissingProfile)));
        assert_eq!(page.error(), Some("User not found in database"));
    }

    #[tokio::test]
    async fn test_add_and_delete_update_list_after_store() {
        let store = MemoryStore::new();
        let observer = signed_in(&store, "a@x.com").await;
        let mut page = dashboard(&store, &observer);
        page.load().await.unwrap();
        assert!(page.notes().is_empty());

        assert!(page.add_note("   ").await.unwrap().is_none());
        let first = page.add_note("buy milk").await.unwrap().unwrap();
        page.add_note("call mum").await.unwrap();

        let contents: Vec<&str> = page.notes().iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["call mum", "buy milk"]);
        assert_eq!(first.user_name.as_deref(), Some("Google User"));

        page.delete_note(first.id).await.unwrap();
        assert_eq!(page.notes().len(), 1);
        assert_eq!(store.note_count(), 1);

        // A fresh load sees the same thing
        let mut reloaded = dashboard(&store, &observer);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.notes(), page.notes());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_list_untouched() {
        let store = MemoryStore::new();
        let observer = signed_in(&store, "a@x.com").await;
        let mut page = dashboard(&store, &observer);
        page.load().await.unwrap();

        store.fail_tables(Some("value too long for type character varying(500)"));
        let err = page.add_note("x").await.unwrap_err();

        assert_eq!(err.to_string(), "value too long for type character varying(500)");
        assert!(page.notes().is_empty());
        assert_eq!(page.error(), Some("value too long for type character varying(500)"));
    }

    #[tokio::test]
    async fn test_sign_out() {
        let store = MemoryStore::new();
        let observer = signed_in(&store, "a@x.com").await;
        let token = observer.session().unwrap().access_token;
        let mut page = dashboard(&store, &observer);
        page.load().await.unwrap();

        assert_eq!(page.sign_out().await, Route::SignIn);
        assert!(page.user().is_none());
        assert!(store.get_user(&token).await.is_err());
        assert_eq!(observer.redirect(Route::Dashboard), Some(Route::SignIn));
    }
}
