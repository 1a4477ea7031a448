use serde::{Deserialize, Serialize};

/// Deployment misconfiguration. Fatal: the process refuses to serve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing project/tenant identifier (FIREBASE_PROJECT_ID)")]
    MissingProjectId,

    #[error("missing SUPABASE_URL or SUPABASE_KEY")]
    MissingDatabase,
}

/// Why a credential was not accepted.
///
/// Never shown to callers: the authorization gate turns every variant into
/// the same 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("key set fetch failed: {0}")]
    KeyFetch(String),

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(err.to_string())
    }
}

/// Record store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Transport(String),

    #[error("record store returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        details: Option<String>,
    },

    #[error("failed to decode record store response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StoreError {
    /// Message surfaced to clients in the `error` field.
    pub fn client_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// JSON error body returned by every function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
