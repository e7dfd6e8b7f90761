//! # Connection settings for the hosted Session Store
//!
//! [`StoreConfig`] is the `[store]` section of the gateway settings and the
//! client's configuration. It carries the project URL and the public API key that
//! every request must present in its `apikey` header.
//!
//! ```toml
//! [store]
//! url = "https://xyzcompany.supabase.co"
//! key = "public-anon-key"
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;

/// Location and credentials of the hosted Session Store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Public API key sent as `apikey`.
    #[serde(default)]
    pub key: String,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }

    /// Parse the project URL, normalised to end with `/` so relative joins
    /// land under it.
    pub fn base_url(&self) -> Result<Url, StoreError> {
        let mut raw = self.url.trim().to_string();
        if raw.is_empty() {
            return Err(StoreError::Decode("store url is not configured".into()));
        }
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| StoreError::Decode(format!("invalid store url: {e}")))
    }
}
