//! Per-user shopping cart. Carts belong to the authenticated subject; a
//! client-supplied user id is never trusted for scoping.

use serde_json::{json, Value};
use vercel_runtime::{Body, Error, Request, Response};

use super::{present, store_failure, truthy};
use crate::auth::Identity;
use crate::error::StoreError;
use crate::http::{
    bad_request, empty_response, error_response, json_body, json_response, last_path_segment,
    method_not_allowed, not_found, preflight, query_param,
};
use crate::services::Services;

/// `/cart`
pub async fn handle(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    if req.method() == "OPTIONS" {
        return preflight();
    }
    if !matches!(req.method().as_str(), "GET" | "POST" | "PUT" | "DELETE") {
        return method_not_allowed();
    }
    let identity = match services.gate.require_identity(&req).await.into_result() {
        Ok(identity) => identity,
        Err(rejection) => return rejection.into_response(),
    };

    let cart_id = query_param(&req, "id");
    match (req.method().as_str(), cart_id) {
        ("POST", _) => create_cart(services, &identity).await,
        ("GET", Some(cart_id)) => list_items(services, &identity, &cart_id).await,
        ("GET", None) => find_cart(services, identity.subject()).await,
        ("PUT", Some(cart_id)) => set_item(&req, services, &identity, &cart_id).await,
        ("DELETE", Some(cart_id)) => remove_item(&req, services, &identity, &cart_id).await,
        _ => bad_request("Missing cartId (use ?id=)"),
    }
}

/// `/cart/{id}`
pub async fn handle_items(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    if req.method() == "OPTIONS" {
        return preflight();
    }
    if !matches!(req.method().as_str(), "GET" | "PUT") {
        return method_not_allowed();
    }
    let identity = match services.gate.require_identity(&req).await.into_result() {
        Ok(identity) => identity,
        Err(rejection) => return rejection.into_response(),
    };
    let Some(cart_id) = last_path_segment(&req) else {
        return bad_request("Missing cartId");
    };

    if req.method() == "GET" {
        list_items(services, &identity, &cart_id).await
    } else {
        set_item(&req, services, &identity, &cart_id).await
    }
}

/// `/cart/user/{userId}`
pub async fn handle_user(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    match req.method().as_str() {
        "OPTIONS" => return preflight(),
        "GET" => {}
        _ => return method_not_allowed(),
    }
    let identity = match services.gate.require_identity(&req).await.into_result() {
        Ok(identity) => identity,
        Err(rejection) => return rejection.into_response(),
    };
    let Some(user_id) = last_path_segment(&req) else {
        return bad_request("Missing userId");
    };
    if user_id != identity.subject() {
        return error_response(403, "Forbidden");
    }

    find_cart(services, &user_id).await
}

/// Return the caller's cart, creating it on first use. 200 when it already
/// existed, 201 when inserted.
async fn create_cart(services: &Services, identity: &Identity) -> Result<Response<Body>, Error> {
    match caller_cart(services, identity.subject()).await {
        Ok(Some(cart)) => return json_response(200, &json!({ "cartId": cart["id"] })),
        Ok(None) => {}
        Err(err) => return store_failure(err),
    }

    let query = services
        .store
        .table("carts")
        .insert(json!({ "user_id": identity.subject() }).to_string());

    match services.store.fetch_optional(query).await {
        Ok(Some(cart)) => json_response(201, &json!({ "cartId": cart["id"] })),
        Ok(None) => error_response(500, "Cart insert returned no row"),
        Err(err) => store_failure(err),
    }
}

async fn find_cart(services: &Services, user_id: &str) -> Result<Response<Body>, Error> {
    match caller_cart(services, user_id).await {
        Ok(Some(cart)) => json_response(200, &json!({ "cartId": cart["id"] })),
        Ok(None) => not_found("Cart not found for user"),
        Err(err) => store_failure(err),
    }
}

/// Oldest cart of `user_id`. Rows created before carts were reused may leave
/// a user with several.
async fn caller_cart(services: &Services, user_id: &str) -> Result<Option<Value>, StoreError> {
    let query = services
        .store
        .table("carts")
        .select("id")
        .eq("user_id", user_id)
        .order("id.asc");
    services.store.fetch_first(query).await
}

/// Whether `cart_id` exists and belongs to the caller.
async fn owns_cart(
    services: &Services,
    identity: &Identity,
    cart_id: &str,
) -> Result<bool, StoreError> {
    let query = services
        .store
        .table("carts")
        .select("id")
        .eq("id", cart_id)
        .eq("user_id", identity.subject());
    Ok(services.store.fetch_optional(query).await?.is_some())
}

async fn list_items(
    services: &Services,
    identity: &Identity,
    cart_id: &str,
) -> Result<Response<Body>, Error> {
    match owns_cart(services, identity, cart_id).await {
        Ok(true) => {}
        Ok(false) => return not_found("Cart not found"),
        Err(err) => return store_failure(err),
    }

    let query = services
        .store
        .table("cart_items")
        .select("product_id,quantity")
        .eq("cart_id", cart_id);

    match services.store.fetch_all(query).await {
        Ok(items) => json_response(200, &items),
        Err(err) => store_failure(err),
    }
}

async fn set_item(
    req: &Request,
    services: &Services,
    identity: &Identity,
    cart_id: &str,
) -> Result<Response<Body>, Error> {
    let Some(payload) = json_body(req) else {
        return bad_request("Invalid JSON");
    };
    let product_id = payload.get("productId");
    let quantity = payload.get("quantity");
    if !truthy(product_id) || !present(quantity) {
        return bad_request("Missing productId or quantity");
    }
    let product_id = product_id.cloned().unwrap_or(Value::Null);
    let quantity = quantity.cloned().unwrap_or(Value::Null);

    match owns_cart(services, identity, cart_id).await {
        Ok(true) => {}
        Ok(false) => return not_found("Cart not found"),
        Err(err) => return store_failure(err),
    }

    let query = services
        .store
        .table("cart_items")
        .upsert(
            json!({
                "cart_id": cart_id,
                "product_id": product_id,
                "quantity": quantity,
            })
            .to_string(),
        )
        .on_conflict("cart_id,product_id");

    match services.store.execute(query).await {
        Ok(()) => json_response(
            200,
            &json!({ "productId": product_id, "quantity": quantity }),
        ),
        Err(err) => store_failure(err),
    }
}

async fn remove_item(
    req: &Request,
    services: &Services,
    identity: &Identity,
    cart_id: &str,
) -> Result<Response<Body>, Error> {
    let Some(product_id) = query_param(req, "productId") else {
        return bad_request("Missing productId");
    };

    match owns_cart(services, identity, cart_id).await {
        Ok(true) => {}
        Ok(false) => return not_found("Cart not found"),
        Err(err) => return store_failure(err),
    }

    let query = services
        .store
        .table("cart_items")
        .delete()
        .eq("cart_id", cart_id)
        .eq("product_id", product_id);

    match services.store.execute(query).await {
        Ok(()) => empty_response(204),
        Err(err) => store_failure(err),
    }
}
