use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vercel_runtime::{Body, Error, Request, Response};

use super::{present, store_failure, truthy};
use crate::http::{
    bad_request, error_response, json_body, json_response, last_path_segment, method_not_allowed,
    not_found, preflight, query_param,
};
use crate::services::Services;

const LIST_COLUMNS: &str = "id,title,image_path,discounted_price,actual_price,short_description";

/// Columns returned for a single product and accepted on create.
const DETAIL_COLUMNS: [&str; 10] = [
    "title",
    "description",
    "short_description",
    "ratings",
    "review_count",
    "actual_price",
    "discounted_price",
    "discount_percentage",
    "additional_details",
    "image_path",
];

/// Fields a client may never change on update.
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "created_at"];

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: Value,
    #[serde(default)]
    image_path: Value,
    #[serde(default)]
    discounted_price: Value,
    #[serde(default)]
    actual_price: Value,
    #[serde(default)]
    short_description: Value,
}

/// Catalog listing entry, in the shape the storefront renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Value,
    pub name: Value,
    pub image: Value,
    pub price: Value,
    pub actual_price: Value,
    pub short_description: Value,
}

impl From<ProductRow> for ProductSummary {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.title,
            image: row.image_path,
            price: row.discounted_price,
            actual_price: row.actual_price,
            short_description: row.short_description,
        }
    }
}

/// `/products`: public listing and detail, authenticated create and update.
pub async fn handle(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    match req.method().as_str() {
        "OPTIONS" => preflight(),
        "GET" => match query_param(&req, "id") {
            Some(id) => get_product(services, &id).await,
            None => list_products(services).await,
        },
        "POST" | "PUT" | "PATCH" => {
            if let Err(rejection) = services.gate.require_identity(&req).await.into_result() {
                return rejection.into_response();
            }
            if req.method() == "POST" {
                create_product(&req, services).await
            } else {
                update_product(&req, services).await
            }
        }
        _ => method_not_allowed(),
    }
}

/// `/products/{id}`: public detail by path parameter.
pub async fn handle_detail(req: Request, services: &Services) -> Result<Response<Body>, Error> {
    match req.method().as_str() {
        "OPTIONS" => preflight(),
        "GET" => match last_path_segment(&req) {
            Some(id) => get_product(services, &id).await,
            None => bad_request("Missing product id"),
        },
        _ => method_not_allowed(),
    }
}

async fn list_products(services: &Services) -> Result<Response<Body>, Error> {
    let query = services.store.table("products").select(LIST_COLUMNS);
    let rows = match services.store.fetch_all(query).await {
        Ok(rows) => rows,
        Err(err) => return store_failure(err),
    };

    let products = rows
        .into_iter()
        .map(serde_json::from_value::<ProductRow>)
        .map(|row| row.map(ProductSummary::from))
        .collect::<Result<Vec<_>, _>>()?;

    json_response(200, &products)
}

async fn get_product(services: &Services, id: &str) -> Result<Response<Body>, Error> {
    let query = services
        .store
        .table("products")
        .select(DETAIL_COLUMNS.join(","))
        .eq("id", id);

    match services.store.fetch_optional(query).await {
        Ok(Some(product)) => json_response(200, &product),
        Ok(None) => not_found("Product not found"),
        Err(err) => store_failure(err),
    }
}

async fn create_product(req: &Request, services: &Services) -> Result<Response<Body>, Error> {
    let Some(Value::Object(payload)) = json_body(req) else {
        return bad_request("Invalid JSON");
    };

    if !truthy(payload.get("title"))
        || !truthy(payload.get("description"))
        || !present(payload.get("actual_price"))
        || !present(payload.get("discounted_price"))
    {
        return bad_request(
            "Missing required fields: title, description, actual_price, discounted_price",
        );
    }

    let record: Map<String, Value> = DETAIL_COLUMNS
        .iter()
        .filter_map(|column| {
            payload
                .get(*column)
                .map(|value| (column.to_string(), value.clone()))
        })
        .collect();

    let query = services
        .store
        .table("products")
        .insert(Value::Object(record).to_string());

    match services.store.fetch_optional(query).await {
        Ok(Some(product)) => json_response(201, &product),
        Ok(None) => error_response(500, "Product insert returned no row"),
        Err(err) => store_failure(err),
    }
}

async fn update_product(req: &Request, services: &Services) -> Result<Response<Body>, Error> {
    let Some(id) = query_param(req, "id") else {
        return bad_request("Missing product id");
    };
    let Some(Value::Object(mut updates)) = json_body(req) else {
        return bad_request("Invalid JSON");
    };
    for field in IMMUTABLE_FIELDS {
        updates.remove(field);
    }

    let query = services
        .store
        .table("products")
        .update(Value::Object(updates).to_string())
        .eq("id", id);

    match services.store.fetch_optional(query).await {
        Ok(Some(product)) => json_response(200, &product),
        Ok(None) => not_found("Product not found"),
        Err(err) => store_failure(err),
    }
}
