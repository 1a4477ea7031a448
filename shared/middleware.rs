use std::sync::Arc;

use vercel_runtime::{Body, Error, Request, Response};

use crate::auth::{Authenticator, BearerTokenAuth, DevBypass, Identity};
use crate::config::VerificationConfig;
use crate::error::{ApiError, ConfigError};
use crate::http::{cors_headers, json_response};
use crate::verifier::TokenVerifier;

/// Outcome of authorizing a request. Exactly one of the two.
#[derive(Debug)]
pub enum AuthDecision {
    Authenticated(Identity),
    Rejected(Rejection),
}

impl AuthDecision {
    pub fn into_result(self) -> Result<Identity, Rejection> {
        match self {
            Self::Authenticated(identity) => Ok(identity),
            Self::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Descriptor of the uniform 401 response.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    status: u16,
    body: ApiError,
}

impl Rejection {
    pub fn unauthorized() -> Self {
        Self {
            status: 401,
            body: ApiError::new("Unauthorized"),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> [(&'static str, &'static str); 4] {
        cors_headers()
    }

    pub fn body(&self) -> &ApiError {
        &self.body
    }

    pub fn into_response(self) -> Result<Response<Body>, Error> {
        json_response(self.status, &self.body)
    }
}

/// Resolves a request to an [`Identity`] by trying each strategy in order.
pub struct AuthGate {
    strategies: Vec<Box<dyn Authenticator>>,
}

impl AuthGate {
    pub fn new(strategies: Vec<Box<dyn Authenticator>>) -> Self {
        Self { strategies }
    }

    /// Production wiring: bearer tokens verified against the remote key set,
    /// preceded by the dev bypass when it is armed.
    pub fn from_config(config: &VerificationConfig) -> Result<Self, ConfigError> {
        let verifier = TokenVerifier::from_config(config)?;
        Ok(Self::with_verifier(config, Arc::new(verifier)))
    }

    pub fn with_verifier(config: &VerificationConfig, verifier: Arc<TokenVerifier>) -> Self {
        let mut strategies: Vec<Box<dyn Authenticator>> = Vec::with_capacity(2);
        if config.dev_bypass_armed() {
            tracing::warn!("dev auth bypass is enabled; do not use in production");
            strategies.push(Box::new(DevBypass::from_config(config)));
        }
        strategies.push(Box::new(BearerTokenAuth::new(verifier)));
        Self::new(strategies)
    }

    /// Names of the configured strategies, in evaluation order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First identity any strategy produces, or `None`.
    pub async fn resolve_identity(&self, req: &Request) -> Option<Identity> {
        for strategy in &self.strategies {
            if let Some(identity) = strategy.try_authenticate(req).await {
                tracing::debug!(
                    strategy = strategy.name(),
                    subject = identity.subject(),
                    "request authenticated"
                );
                return Some(identity);
            }
        }
        None
    }

    pub async fn require_identity(&self, req: &Request) -> AuthDecision {
        match self.resolve_identity(req).await {
            Some(identity) => AuthDecision::Authenticated(identity),
            None => AuthDecision::Rejected(Rejection::unauthorized()),
        }
    }
}
