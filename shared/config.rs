use std::env;

use crate::error::ConfigError;

/// Issuer host Firebase uses for ID tokens.
pub const DEFAULT_ISSUER_BASE: &str = "https://securetoken.google.com";

/// Published key set for Firebase ID tokens.
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Subject handed to dev-mode callers that do not send `X-User-Id`.
pub const DEFAULT_DEV_USER_ID: &str = "dev-user";

/// Token verification and dev bypass settings.
///
/// Resolved once per process. Nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub project_id: Option<String>,
    pub issuer_base: String,
    pub jwks_url: String,
    pub dev_mode_enabled: bool,
    pub dev_shared_secret: Option<String>,
    pub dev_default_user_id: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            issuer_base: DEFAULT_ISSUER_BASE.to_string(),
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            dev_mode_enabled: false,
            dev_shared_secret: None,
            dev_default_user_id: DEFAULT_DEV_USER_ID.to_string(),
        }
    }
}

impl VerificationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            project_id: non_empty_var("FIREBASE_PROJECT_ID"),
            issuer_base: non_empty_var("AUTH_ISSUER_BASE")
                .unwrap_or_else(|| DEFAULT_ISSUER_BASE.to_string()),
            jwks_url: non_empty_var("AUTH_JWKS_URL")
                .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()),
            dev_mode_enabled: env::var("DEV_AUTH").unwrap_or_default() == "true",
            dev_shared_secret: non_empty_var("DEV_API_KEY"),
            dev_default_user_id: non_empty_var("DEV_USER_ID")
                .unwrap_or_else(|| DEFAULT_DEV_USER_ID.to_string()),
        }
    }

    /// Project configuration for a given tenant, everything else default.
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    /// Enable the dev bypass with the given shared secret.
    pub fn with_dev_secret(mut self, secret: impl Into<String>) -> Self {
        self.dev_mode_enabled = true;
        self.dev_shared_secret = Some(secret.into());
        self
    }

    fn project(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingProjectId)
    }

    /// Expected `iss` claim: `<issuer_base>/<project_id>`.
    pub fn issuer(&self) -> Result<String, ConfigError> {
        let project = self.project()?;
        Ok(format!("{}/{}", self.issuer_base.trim_end_matches('/'), project))
    }

    /// Expected `aud` claim: the project id itself.
    pub fn audience(&self) -> Result<String, ConfigError> {
        self.project().map(str::to_string)
    }

    /// The dev bypass is usable only when enabled and a secret is present.
    pub fn dev_bypass_armed(&self) -> bool {
        self.dev_mode_enabled
            && self
                .dev_shared_secret
                .as_deref()
                .is_some_and(|secret| !secret.is_empty())
    }
}

/// Record store (Supabase PostgREST) connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub supabase_url: String,
    pub supabase_key: String,
}

impl DatabaseConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url = non_empty_var("SUPABASE_URL").ok_or(ConfigError::MissingDatabase)?;
        let supabase_key = non_empty_var("SUPABASE_KEY").ok_or(ConfigError::MissingDatabase)?;
        Ok(Self {
            supabase_url,
            supabase_key,
        })
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub verification: VerificationConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            verification: VerificationConfig::from_env(),
            database: DatabaseConfig::from_env()?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
