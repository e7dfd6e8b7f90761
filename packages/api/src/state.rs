use std::sync::Arc;

use store::{HostedStore, SessionStore};

use super::auth::TokenKeys;
use super::settings::Settings;

/// Shared, immutable gateway state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub tokens: TokenKeys,
    /// Where the Session Store sends the browser after an OAuth sign-in.
    pub auth_redirect: String,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, tokens: TokenKeys) -> Self {
        Self {
            store,
            tokens,
            auth_redirect: "http://localhost:5173/".into(),
        }
    }

    pub fn with_auth_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.auth_redirect = redirect.into();
        self
    }

    /// State backed by the hosted Session Store described in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, store::StoreError> {
        let store = HostedStore::new(&settings.store)?;
        let tokens = TokenKeys::new(&settings.auth.jwt_secret, settings.auth.token_ttl_secs);
        Ok(Self::new(Arc::new(store), tokens).with_auth_redirect(&settings.auth.redirect))
    }
}
