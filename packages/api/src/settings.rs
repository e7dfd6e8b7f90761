use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;
use store::StoreConfig;

#[derive(Debug, Clone, Deserialize)]
#[allow(unused)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[allow(unused)]
pub struct Auth {
    /// Shared secret used to sign application tokens.
    pub jwt_secret: String,
    /// Lifetime of an application token in seconds.
    pub token_ttl_secs: u64,
    /// Where the hosted OAuth flow sends the browser back to.
    pub redirect: String,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 3600,
            redirect: "http://localhost:5173/".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(unused)]
pub struct Settings {
    pub server: Server,
    pub auth: Auth,
    pub store: StoreConfig,
}

impl Settings {
    /// Load settings from defaults, an optional `config.toml`, `APP_*` variables
    /// and finally the conventional deployment variables (`PORT`, `JWT_SECRET`,
    /// `SUPABASE_URL`, `SUPABASE_KEY`, `TOKEN_TTL_SECS`, `AUTH_REDIRECT`).
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    /// Same as [`Settings::new`], reading variables from `vars` instead of the
    /// process environment.
    pub(crate) fn from_vars(vars: Map<String, String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| vars.get(key).cloned();
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("auth.redirect", "http://localhost:5173/")?
            .set_default("store.url", "")?
            .set_default("store.key", "")?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(vars.clone())),
            )
            .set_override_option("server.port", lookup("PORT"))?
            .set_override_option("auth.jwt_secret", lookup("JWT_SECRET"))?
            .set_override_option("auth.token_ttl_secs", lookup("TOKEN_TTL_SECS"))?
            .set_override_option("auth.redirect", lookup("AUTH_REDIRECT"))?
            .set_override_option("store.url", lookup("SUPABASE_URL"))?
            .set_override_option("store.key", lookup("SUPABASE_KEY"))?
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Message("JWT_SECRET is not set".into()));
        }
        if self.store.url.is_empty() {
            return Err(ConfigError::Message("SUPABASE_URL is not set".into()));
        }
        if self.store.key.is_empty() {
            return Err(ConfigError::Message("SUPABASE_KEY is not set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_vars(vars(&[])).unwrap();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.auth.token_ttl_secs, 3600);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_from_deployment_variables() {
        let settings = Settings::from_vars(vars(&[
            ("PORT", "8080"),
            ("JWT_SECRET", "s3cret"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(settings.server.address(), "0.0.0.0:8080");
        assert_eq!(settings.auth.jwt_secret, "s3cret");
        assert_eq!(settings.store.url, "https://abc.supabase.co");
        assert_eq!(settings.store.key, "anon");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_prefixed_variables_come_from_given_source() {
        let settings = Settings::from_vars(vars(&[
            ("APP_SERVER__HOST", "127.0.0.1"),
            ("APP_AUTH__TOKEN_TTL_SECS", "60"),
            ("TOKEN_TTL_SECS", "120"),
        ]))
        .unwrap();

        assert_eq!(settings.server.address(), "127.0.0.1:5000");
        // Deployment variables win over prefixed ones
        assert_eq!(settings.auth.token_ttl_secs, 120);

        let empty = Settings::from_vars(Map::new()).unwrap();
        assert_eq!(empty.server.host, "0.0.0.0");
        assert_eq!(empty.auth.token_ttl_secs, 3600);
    }
}
