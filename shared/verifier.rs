use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};

use crate::auth::Identity;
use crate::config::VerificationConfig;
use crate::error::{AuthError, ConfigError};
use crate::jwks::{HttpKeySource, KeyCache, KeySource};

/// Verifies provider-issued ID tokens against the remote key set.
///
/// Each call re-verifies; the key set is the only state shared across
/// requests.
pub struct TokenVerifier {
    keys: KeyCache,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    /// Build a verifier backed by the configured HTTPS key set endpoint.
    pub fn from_config(config: &VerificationConfig) -> Result<Self, ConfigError> {
        Self::with_source(config, Arc::new(HttpKeySource::new(config.jwks_url.clone())))
    }

    /// Build a verifier with a custom key source.
    ///
    /// Fails when the project identifier is missing, so a verifier that
    /// exists always has an issuer and audience to check.
    pub fn with_source(
        config: &VerificationConfig,
        source: Arc<dyn KeySource>,
    ) -> Result<Self, ConfigError> {
        Self::with_cache(config, KeyCache::new(source))
    }

    pub fn with_cache(config: &VerificationConfig, keys: KeyCache) -> Result<Self, ConfigError> {
        Ok(Self {
            keys,
            issuer: config.issuer()?,
            audience: config.audience()?,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Validate signature, issuer, audience and temporal claims, then build
    /// an [`Identity`] from the verified claims.
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing kid in header".to_string()))?;

        let key = self.keys.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.validate_nbf = true;

        let claims = decode::<Map<String, Value>>(token, &key, &validation)?.claims;

        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("empty sub claim".to_string()))?
            .to_string();
        let email = claims
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Identity::verified(subject, email, claims))
    }
}
