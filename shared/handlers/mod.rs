//! Resource handlers. Each one backs a function binary under `api/`.
//!
//! Catalog and config reads are public. Writes and per-user resources go
//! through the authorization gate first.

pub mod cart;
pub mod config;
pub mod orders;
pub mod products;
pub mod profile;

use serde_json::Value;
use vercel_runtime::{Body, Error, Response};

use crate::error::StoreError;
use crate::http::error_response;

pub(crate) fn store_failure(err: StoreError) -> Result<Response<Body>, Error> {
    tracing::error!(error = %err, "record store request failed");
    error_response(500, err.client_message())
}

/// JavaScript-style truthiness, used for required fields.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Field present and not `null`.
pub(crate) fn present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}
