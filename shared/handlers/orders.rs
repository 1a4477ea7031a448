use serde::Deserialize;
use serde_json::{json, Value};
use vercel_runtime::{Body, Error, Request, Response};

use super::store_failure;
use crate::auth::Identity;
use crate::http::{
    bad_request, error_response, json_body, json_response, method_not_allowed, preflight,
};
use crate::services::Services;

const ORDER_COLUMNS: &str =
    "id,order_number,status,total_amount,item_count,order_date,delivery_date";

/// Status given to every new order.
const INITIAL_STATUS: &str = "processing";

#[derive(Debug, Deserialize)]
struct OrderLine {
    #[serde(default)]
    product_id: Value,
    #[serde(default)]
    quantity: Value,
    #[serde(default)]
    price: Value,
}

/// `/orders`: the caller's order history and checkout.
pub async fn handle(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    match req.method().as_str() {
        "OPTIONS" => return preflight(),
        "GET" | "POST" => {}
        _ => return method_not_allowed(),
    }
    let identity = match services.gate.require_identity(&req).await.into_result() {
        Ok(identity) => identity,
        Err(rejection) => return rejection.into_response(),
    };

    if req.method() == "GET" {
        list_orders(services, &identity).await
    } else {
        create_order(&req, services, &identity).await
    }
}

async fn list_orders(services: &Services, identity: &Identity) -> Result<Response<Body>, Error> {
    let query = services
        .store
        .table("orders")
        .select(ORDER_COLUMNS)
        .eq("user_id", identity.subject())
        .order("order_date.desc");

    match services.store.fetch_all(query).await {
        Ok(orders) => json_response(200, &orders),
        Err(err) => store_failure(err),
    }
}

async fn create_order(
    req: &Request,
    services: &Services,
    identity: &Identity,
) -> Result<Response<Body>, Error> {
    let Some(payload) = json_body(req) else {
        return bad_request("Invalid JSON");
    };

    let lines: Vec<OrderLine> = match payload.get("items") {
        Some(Value::Array(items)) if !items.is_empty() => {
            match serde_json::from_value(Value::Array(items.clone())) {
                Ok(lines) => lines,
                Err(_) => return bad_request("Items are required"),
            }
        }
        _ => return bad_request("Items are required"),
    };

    let total_amount = match payload.get("total_amount").and_then(Value::as_f64) {
        Some(total) if total > 0.0 => payload["total_amount"].clone(),
        _ => return bad_request("Valid total amount is required"),
    };

    let query = services.store.table("orders").insert(
        json!({
            "user_id": identity.subject(),
            "status": INITIAL_STATUS,
            "total_amount": total_amount,
            "item_count": lines.len(),
        })
        .to_string(),
    );
    let order = match services.store.fetch_optional(query).await {
        Ok(Some(order)) => order,
        Ok(None) => return error_response(500, "Order insert returned no row"),
        Err(err) => return store_failure(err),
    };

    let order_id = order["id"].clone();
    let order_items: Vec<Value> = lines
        .into_iter()
        .map(|line| {
            json!({
                "order_id": order_id,
                "product_id": line.product_id,
                "quantity": line.quantity,
                "price": line.price,
            })
        })
        .collect();

    let query = services
        .store
        .table("order_items")
        .insert(Value::Array(order_items).to_string());
    if let Err(err) = services.store.execute(query).await {
        discard_order(services, &order_id).await;
        return store_failure(err);
    }

    tracing::info!(%order_id, subject = identity.subject(), "order created");
    json_response(201, &order)
}

/// Remove an order whose items could not be stored, so it never shows up
/// empty in the history.
async fn discard_order(services: &Services, order_id: &Value) {
    let id = match order_id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    let query = services.store.table("orders").delete().eq("id", id);
    if let Err(err) = services.store.execute(query).await {
        tracing::error!(%order_id, error = %err, "order left without its items");
    }
}
