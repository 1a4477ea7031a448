//! Shared authentication, data access and handlers for the storefront API
//!
//! Every Vercel function under `api/` is a thin entry point into this crate.
//!
//! ## Authentication
//!
//! Protected routes go through a single [`AuthGate`] that tries an ordered
//! list of [`Authenticator`] strategies:
//!
//! 1. **Dev bypass** (only wired in when `DEV_AUTH=true` and `DEV_API_KEY` is
//!    set): `X-Dev-Key: <secret>` plus an optional `X-User-Id`.
//! 2. **Bearer token**: `Authorization: Bearer <firebase id token>`, verified
//!    against Google's published key set for `FIREBASE_PROJECT_ID`.
//!
//! The gate answers with an explicit [`AuthDecision`]: either the caller's
//! [`Identity`] or a uniform 401 [`Rejection`]. Verification failures never
//! escape it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shared::{services, AuthDecision};
//!
//! pub async fn handler(req: Request) -> Result<Response<Body>, Error> {
//!     let services = services()?;
//!     let identity = match services.gate.require_identity(&req).await {
//!         AuthDecision::Authenticated(identity) => identity,
//!         AuthDecision::Rejected(rejection) => return rejection.into_response(),
//!     };
//!     // ... rest of handler
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod jwks;
pub mod middleware;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod verifier;

use vercel_runtime::{Body, Error, Request, Response};

// Re-export commonly used types and functions
pub use auth::{extract_bearer_token, Authenticator, BearerTokenAuth, DevBypass, Identity};
pub use config::{Config, DatabaseConfig, VerificationConfig};
pub use error::{ApiError, AuthError, ConfigError, StoreError};
pub use jwks::{HttpKeySource, KeyCache, KeySource};
pub use middleware::{AuthDecision, AuthGate, Rejection};
pub use services::{services, Services};
pub use store::RecordStore;
pub use verifier::TokenVerifier;

/// Run `handle` with the process-wide services.
///
/// A configuration error becomes a 500, never a 401.
pub async fn dispatch<F, Fut>(req: Request, handle: F) -> Result<Response<Body>, Error>
where
    F: FnOnce(Request, &'static Services) -> Fut,
    Fut: std::future::Future<Output = Result<Response<Body>, Error>>,
{
    match services() {
        Ok(services) => handle(req, services).await,
        Err(_) => http::error_response(500, "Service misconfigured"),
    }
}
