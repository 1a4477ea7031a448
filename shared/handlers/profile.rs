use chrono::Utc;
use serde_json::json;
use vercel_runtime::{Body, Error, Request, Response};

use super::store_failure;
use crate::auth::Identity;
use crate::http::{error_response, json_response, method_not_allowed, preflight};
use crate::services::Services;

/// Username for a new profile: the local part of the email, or `User`.
pub fn default_username(email: Option<&str>) -> String {
    email
        .and_then(|email| email.split('@').next())
        .filter(|local| !local.is_empty())
        .unwrap_or("User")
        .to_string()
}

/// `/profile`: the caller's profile, created on first read.
pub async fn handle(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    match req.method().as_str() {
        "OPTIONS" => return preflight(),
        "GET" => {}
        _ => return method_not_allowed(),
    }
    let identity = match services.gate.require_identity(&req).await.into_result() {
        Ok(identity) => identity,
        Err(rejection) => return rejection.into_response(),
    };

    let query = services
        .store
        .table("user_profiles")
        .select("*")
        .eq("user_id", identity.subject());

    match services.store.fetch_optional(query).await {
        Ok(Some(profile)) => json_response(200, &profile),
        Ok(None) => create_profile(services, &identity).await,
        Err(err) => store_failure(err),
    }
}

async fn create_profile(services: &Services, identity: &Identity) -> Result<Response<Body>, Error> {
    let record = json!({
        "user_id": identity.subject(),
        "username": default_username(identity.email()),
        "email": identity.email(),
        "joined_date": Utc::now().format("%Y-%m-%d").to_string(),
    });

    let query = services
        .store
        .table("user_profiles")
        .insert(record.to_string());

    match services.store.fetch_optional(query).await {
        Ok(Some(profile)) => {
            tracing::info!(subject = identity.subject(), "created user profile");
            json_response(200, &profile)
        }
        Ok(None) => error_response(500, "Profile insert returned no row"),
        Err(err) => store_failure(err),
    }
}
