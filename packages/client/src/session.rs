//! # Session observer: the one place that knows whether we are signed in
//!
//! Every page of the client used to watch auth events on its own and decide where
//! to send the browser. [`SessionObserver`] replaces all of that with a single
//! state machine and a single redirect rule.
//!
//! ## States
//!
//! | State | Meaning |
//! |-------|---------|
//! | [`SessionState::Authenticating`] | Start-up: the stored session has not been checked yet, or a sign-in is in flight. |
//! | [`SessionState::Anonymous`] | No session. |
//! | [`SessionState::Authenticated`] | A live session; its `users` row has been ensured. |
//!
//! ## Events
//!
//! [`AuthEvent`] mirrors the notifications the hosted auth SDK emits
//! (`INITIAL_SESSION`, `SIGNED_IN`, `TOKEN_REFRESHED`, `SIGNED_OUT`) plus the two
//! edges of our own sign-in attempts. [`SessionObserver::restore`] produces the
//! initial one from a session kept by a previous visit.
//!
//! ## Redirects
//!
//! [`redirect_for`] is the only redirect rule: signed-in users leave the auth
//! pages for the dashboard, anonymous users leave the dashboard for sign-in, and
//! nobody is redirected while a check is pending or onto the page they are on.
//!
//! State is published on a `tokio::sync::watch` channel so any number of views can
//! follow it.

use std::sync::Arc;

use store::{Session, SessionStore, StoreError};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::route::Route;

/// Authentication state of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Auth notifications fed into the observer.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Result of checking the stored session on start-up.
    InitialSession(Option<Session>),
    SignInStarted,
    SignInFailed,
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// Where to send the browser, if anywhere, given the state and current page.
pub fn redirect_for(state: &SessionState, current: Route) -> Option<Route> {
    let target = match state {
        SessionState::Authenticating => return None,
        SessionState::Authenticated(_) => match current {
            Route::SignIn | Route::SignUp => Route::Dashboard,
            Route::Dashboard => return None,
        },
        SessionState::Anonymous if current.is_protected() => Route::SignIn,
        SessionState::Anonymous => return None,
    };
    (target != current).then_some(target)
}

fn transition(state: &SessionState, event: AuthEvent) -> SessionState {
    match (state, event) {
        (_, AuthEvent::InitialSession(Some(session))) => SessionState::Authenticated(session),
        (_, AuthEvent::InitialSession(None)) => SessionState::Anonymous,
        (SessionState::Anonymous, AuthEvent::SignInStarted) => SessionState::Authenticating,
        (SessionState::Authenticating, AuthEvent::SignInFailed) => SessionState::Anonymous,
        (_, AuthEvent::SignedIn(session)) => SessionState::Authenticated(session),
        (SessionState::Authenticated(_), AuthEvent::TokenRefreshed(session)) => {
            SessionState::Authenticated(session)
        }
        (_, AuthEvent::SignedOut) => SessionState::Anonymous,
        (current, _) => current.clone(),
    }
}

/// Process-wide holder of the [`SessionState`].
#[derive(Debug, Clone)]
pub struct SessionObserver {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver {
    /// A fresh observer, waiting for the initial session check.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Authenticating);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.tx.borrow().session().cloned()
    }

    /// Feed an event and return the resulting state.
    pub fn apply(&self, event: AuthEvent) -> SessionState {
        let mut next = SessionState::Anonymous;
        self.tx.send_if_modified(|state| {
            next = transition(state, event);
            if *state == next {
                return false;
            }
            debug!(
                from = discriminant(state),
                to = discriminant(&next),
                "session state changed"
            );
            *state = next.clone();
            true
        });
        next
    }

    /// Check a session kept from an earlier visit and publish the initial state.
    ///
    /// The stored token is only trusted once the store resolves it to a user.
    /// A rejected token, or a store that cannot be reached, starts the app
    /// signed out.
    pub async fn restore(
        &self,
        store: &dyn SessionStore,
        stored: Option<Session>,
    ) -> SessionState {
        let Some(session) = stored else {
            return self.apply(AuthEvent::InitialSession(None));
        };
        match store.get_user(&session.access_token).await {
            Ok(user) => {
                let session = Session { user, ..session };
                self.apply(AuthEvent::InitialSession(Some(session)))
            }
            Err(StoreError::Unauthorized(message)) => {
                debug!(%message, "stored session rejected");
                self.apply(AuthEvent::InitialSession(None))
            }
            Err(e) => {
                warn!(error = %e, "could not check stored session");
                self.apply(AuthEvent::InitialSession(None))
            }
        }
    }

    /// Redirect for the page the user is currently on.
    pub fn redirect(&self, current: Route) -> Option<Route> {
        redirect_for(&self.tx.borrow(), current)
    }
}

fn discriminant(state: &SessionState) -> &'static str {
    match state {
        SessionState::Anonymous => "anonymous",
        SessionState::Authenticating => "authenticating",
        SessionState::Authenticated(_) => "authenticated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{AuthUser, MemoryStore};
    use uuid::Uuid;

    fn session(token: &str) -> Session {
        Session {
            access_token: token.to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: None,
            user: AuthUser::new(Uuid::nil(), "a@x.com"),
        }
    }

    #[test]
    fn test_starts_checking_and_never_redirects_while_checking() {
        let observer = SessionObserver::new();
        assert_eq!(observer.state(), SessionState::Authenticating);
        for route in [Route::SignIn, Route::SignUp, Route::Dashboard] {
            assert_eq!(observer.redirect(route), None);
        }
    }

    #[test]
    fn test_signed_in_users_leave_auth_pages() {
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::SignedIn(session("t")));

        assert_eq!(observer.redirect(Route::SignIn), Some(Route::Dashboard));
        assert_eq!(observer.redirect(Route::SignUp), Some(Route::Dashboard));
        assert_eq!(observer.redirect(Route::Dashboard), None);
    }

    #[test]
    fn test_anonymous_users_leave_dashboard_only() {
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::InitialSession(None));

        assert_eq!(observer.redirect(Route::Dashboard), Some(Route::SignIn));
        assert_eq!(observer.redirect(Route::SignIn), None);
        assert_eq!(observer.redirect(Route::SignUp), None);
    }

    #[test]
    fn test_failed_sign_in_returns_to_anonymous() {
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::InitialSession(None));

        assert_eq!(observer.apply(AuthEvent::SignInStarted), SessionState::Authenticating);
        assert_eq!(observer.apply(AuthEvent::SignInFailed), SessionState::Anonymous);
    }

    #[test]
    fn test_refresh_only_applies_to_live_sessions() {
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::InitialSession(None));
        let refreshed = observer.apply(AuthEvent::TokenRefreshed(session("t2")));
        assert_eq!(refreshed, SessionState::Anonymous);

        observer.apply(AuthEvent::SignedIn(session("t1")));
        observer.apply(AuthEvent::TokenRefreshed(session("t2")));
        assert_eq!(observer.session().unwrap().access_token, "t2");
    }

    #[test]
    fn test_sign_in_started_does_not_drop_live_session() {
        let observer = SessionObserver::new();
        observer.apply(AuthEvent::SignedIn(session("t")));
        assert!(observer.apply(AuthEvent::SignInStarted).is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_accepts_live_session() {
        let store = MemoryStore::new();
        let stored = store.issue_session("a@x.com");
        let observer = SessionObserver::new();

        let state = observer.restore(&store, Some(stored.clone())).await;

        assert_eq!(state, SessionState::Authenticated(stored));
        assert_eq!(observer.redirect(Route::SignIn), Some(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_restore_drops_rejected_session() {
        let store = MemoryStore::new();
        let stored = store.issue_session("a@x.com");
        store.sign_out(&stored.access_token).await.unwrap();
        let observer = SessionObserver::new();

        assert_eq!(observer.restore(&store, Some(stored)).await, SessionState::Anonymous);
        assert_eq!(observer.redirect(Route::Dashboard), Some(Route::SignIn));
    }

    #[tokio::test]
    async fn test_restore_without_stored_session() {
        let observer = SessionObserver::new();
        let state = observer.restore(&MemoryStore::new(), None).await;
        assert_eq!(state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let observer = SessionObserver::new();
        let mut rx = observer.subscribe();

        observer.apply(AuthEvent::SignedIn(session("t")));
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated());

        observer.apply(AuthEvent::SignedOut);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Anonymous);
    }
}
