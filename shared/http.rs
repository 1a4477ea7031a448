//! Response shaping and request parsing shared by every function.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use vercel_runtime::{Body, Error, Request, Response};

use crate::error::ApiError;

/// Headers this system reads from callers.
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Dev-Key, X-User-Id";

/// Methods the resource handlers support.
pub const CORS_ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

/// Headers attached to every JSON response.
pub fn cors_headers() -> [(&'static str, &'static str); 4] {
    [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS),
        ("Access-Control-Allow-Methods", CORS_ALLOW_METHODS),
    ]
}

/// Serialize `body` as JSON with CORS headers.
pub fn json_response<T: Serialize + ?Sized>(status: u16, body: &T) -> Result<Response<Body>, Error> {
    let mut builder = Response::builder().status(status);
    for (name, value) in cors_headers() {
        builder = builder.header(name, value);
    }
    Ok(builder.body(serde_json::to_string(body)?.into())?)
}

pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, Error> {
    json_response(status, &ApiError::new(message))
}

/// Response with CORS headers and no body.
pub fn empty_response(status: u16) -> Result<Response<Body>, Error> {
    let mut builder = Response::builder().status(status);
    for (name, value) in cors_headers() {
        builder = builder.header(name, value);
    }
    Ok(builder.body(Body::Empty)?)
}

/// CORS preflight answer.
pub fn preflight() -> Result<Response<Body>, Error> {
    empty_response(200)
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    error_response(405, "Method Not Allowed")
}

pub fn bad_request(message: impl Into<String>) -> Result<Response<Body>, Error> {
    error_response(400, message)
}

pub fn not_found(message: impl Into<String>) -> Result<Response<Body>, Error> {
    error_response(404, message)
}

/// Decoded query string parameters.
pub fn query_params(req: &Request) -> HashMap<String, String> {
    let query = req.uri().query().unwrap_or("");
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Non-empty query parameter.
pub fn query_param(req: &Request, name: &str) -> Option<String> {
    query_params(req).remove(name).filter(|value| !value.is_empty())
}

/// Final path segment, used as the `{id}` of path-parameter routes.
pub fn last_path_segment(req: &Request) -> Option<String> {
    req.uri()
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Parse the request body as a JSON object. An empty body reads as `{}`.
pub fn json_body(req: &Request) -> Option<Value> {
    let bytes: &[u8] = req.body();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Some(Value::Object(Default::default()));
    }
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .filter(Value::is_object)
}
