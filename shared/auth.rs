use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use vercel_runtime::Request;

use crate::config::VerificationConfig;
use crate::verifier::TokenVerifier;

/// Header carrying the dev shared secret.
pub const DEV_KEY_HEADER: &str = "x-dev-key";

/// Header naming the dev-mode caller.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, built fresh for each request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    subject: String,
    email: Option<String>,
    claims: Option<Map<String, Value>>,
    is_dev_mode_identity: bool,
}

impl Identity {
    /// Identity backed by a cryptographically verified token.
    pub fn verified(subject: String, email: Option<String>, claims: Map<String, Value>) -> Self {
        Self {
            subject,
            email,
            claims: Some(claims),
            is_dev_mode_identity: false,
        }
    }

    /// Identity granted by the dev bypass.
    pub fn dev(subject: String) -> Self {
        Self {
            subject,
            email: None,
            claims: None,
            is_dev_mode_identity: true,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn claims(&self) -> Option<&Map<String, Value>> {
        self.claims.as_ref()
    }

    pub fn is_dev_mode_identity(&self) -> bool {
        self.is_dev_mode_identity
    }
}

/// Extract bearer token from the `Authorization` header.
///
/// Header names are case-insensitive; the value must start with the exact
/// literal `Bearer `.
pub fn extract_bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn header_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}

/// One way of turning a request into an [`Identity`].
///
/// Implementations return `None` on any non-match and never fail loudly.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn try_authenticate(&self, req: &Request) -> Option<Identity>;
}

/// Shared-secret shortcut for local and integration testing.
///
/// Fail-closed: disabled unless dev mode is on and a non-empty secret is
/// configured, whatever headers the request carries.
#[derive(Debug, Clone)]
pub struct DevBypass {
    enabled: bool,
    secret: Option<String>,
    default_user_id: String,
}

impl DevBypass {
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            enabled: config.dev_mode_enabled,
            secret: config.dev_shared_secret.clone(),
            default_user_id: config.dev_default_user_id.clone(),
        }
    }

    pub fn try_bypass(&self, req: &Request) -> Option<Identity> {
        if !self.enabled {
            return None;
        }
        let secret = self.secret.as_deref().filter(|secret| !secret.is_empty())?;
        let presented = header_str(req, DEV_KEY_HEADER)?;
        if presented != secret {
            return None;
        }

        let subject = header_str(req, USER_ID_HEADER)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.default_user_id);
        Some(Identity::dev(subject.to_string()))
    }
}

#[async_trait]
impl Authenticator for DevBypass {
    fn name(&self) -> &'static str {
        "dev_bypass"
    }

    async fn try_authenticate(&self, req: &Request) -> Option<Identity> {
        self.try_bypass(req)
    }
}

/// Verifies `Authorization: Bearer <token>` with the provider's key set.
pub struct BearerTokenAuth {
    verifier: Arc<TokenVerifier>,
}

impl BearerTokenAuth {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuth {
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    async fn try_authenticate(&self, req: &Request) -> Option<Identity> {
        let token = extract_bearer_token(req)?;
        match self.verifier.verify(&token).await {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::debug!(error = %err, "token verification failed");
                None
            }
        }
    }
}
