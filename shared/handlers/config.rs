use serde_json::{json, Value};
use vercel_runtime::{Body, Error, Request, Response};

use super::{present, store_failure, truthy};
use crate::http::{
    bad_request, error_response, json_body, json_response, method_not_allowed, not_found,
    preflight, query_param,
};
use crate::services::Services;

/// `/config`: public reads, authenticated upserts.
pub async fn handle(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    match req.method().as_str() {
        "OPTIONS" => preflight(),
        "GET" => match query_param(&req, "key") {
            Some(key) => get_entry(services, &key).await,
            None => list_entries(services).await,
        },
        "POST" | "PUT" => {
            if let Err(rejection) = services.gate.require_identity(&req).await.into_result() {
                return rejection.into_response();
            }
            let status = if req.method() == "POST" { 201 } else { 200 };
            upsert_entry(&req, services, status).await
        }
        _ => method_not_allowed(),
    }
}

async fn list_entries(services: &Services) -> Result<Response<Body>, Error> {
    let query = services.store.table("config").select("key,value");
    match services.store.fetch_all(query).await {
        Ok(entries) => json_response(200, &entries),
        Err(err) => store_failure(err),
    }
}

async fn get_entry(services: &Services, key: &str) -> Result<Response<Body>, Error> {
    let query = services
        .store
        .table("config")
        .select("value")
        .eq("key", key);

    match services.store.fetch_optional(query).await {
        Ok(Some(entry)) => json_response(200, &json!({ "key": key, "value": entry["value"] })),
        Ok(None) => not_found("Not found"),
        Err(err) => store_failure(err),
    }
}

async fn upsert_entry(
    req: &Request,
    services: &Services,
    status: u16,
) -> Result<Response<Body>, Error> {
    let Some(payload) = json_body(req) else {
        return bad_request("Invalid JSON");
    };
    let key = payload.get("key");
    let value = payload.get("value");
    if !truthy(key) || !present(value) {
        return bad_request("Missing key or value");
    }

    let record = json!({
        "key": key.cloned().unwrap_or(Value::Null),
        "value": value.cloned().unwrap_or(Value::Null),
    });
    let query = services
        .store
        .table("config")
        .upsert(record.to_string())
        .on_conflict("key");

    match services.store.fetch_optional(query).await {
        Ok(Some(entry)) => json_response(status, &entry),
        Ok(None) => error_response(500, "Config upsert returned no row"),
        Err(err) => store_failure(err),
    }
}
