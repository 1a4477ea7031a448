//! Test helpers: RSA fixtures, token minting, mock key set endpoint and
//! request builders.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use vercel_runtime::{Body, Request, Response};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use shared::{AuthGate, RecordStore, Services, TokenVerifier, VerificationConfig};

pub const PROJECT_ID: &str = "test-proj";
pub const ISSUER_BASE: &str = "https://issuer";
pub const ISSUER: &str = "https://issuer/test-proj";
pub const KID: &str = "test-key-1";
pub const DEV_SECRET: &str = "s3cr3t";

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

pub fn jwks() -> Value {
    serde_json::from_slice(&fixture("jwks.json")).unwrap()
}

/// Key matching the published `test-key-1`.
pub fn signing_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(&fixture("signing.pem")).unwrap()
}

/// Valid RSA key the provider never published.
pub fn foreign_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(&fixture("foreign.pem")).unwrap()
}

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Claims a well-behaved provider would issue for `sub`.
pub fn valid_claims(sub: &str) -> Value {
    json!({
        "sub": sub,
        "email": "a@b.com",
        "iss": ISSUER,
        "aud": PROJECT_ID,
        "iat": now() - 10,
        "exp": now() + 3600,
    })
}

pub fn sign_with(claims: &Value, kid: Option<&str>, key: &EncodingKey) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, key).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with(claims, Some(KID), &signing_key())
}

/// Mock identity provider serving the fixture key set at `/jwks`.
pub async fn key_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("cache-control", "public, max-age=3600")
                .set_body_json(jwks()),
        )
        .mount(&server)
        .await;
    server
}

pub fn verification_config(key_server: &MockServer) -> VerificationConfig {
    VerificationConfig {
        issuer_base: ISSUER_BASE.to_string(),
        jwks_url: format!("{}/jwks", key_server.uri()),
        ..VerificationConfig::for_project(PROJECT_ID)
    }
}

pub fn verifier(key_server: &MockServer) -> Arc<TokenVerifier> {
    Arc::new(TokenVerifier::from_config(&verification_config(key_server)).unwrap())
}

/// Services with the dev bypass armed and the record store at `store_url`.
pub fn dev_services(key_server: &MockServer, store_url: &str) -> Services {
    let config = verification_config(key_server).with_dev_secret(DEV_SECRET);
    Services::new(
        AuthGate::from_config(&config).unwrap(),
        RecordStore::new(store_url, "test-service-key"),
    )
}

/// Request builder mirroring what the Vercel runtime hands a function.
pub struct TestRequest {
    builder: http::request::Builder,
    body: Body,
}

impl TestRequest {
    pub fn new(method: &str, uri: &str) -> Self {
        Self {
            builder: http::Request::builder().method(method).uri(uri),
            body: Body::Empty,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {token}"))
    }

    pub fn dev_user(self, user_id: &str) -> Self {
        self.header("x-dev-key", DEV_SECRET)
            .header("x-user-id", user_id)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Text(body.to_string());
        self.builder = self.builder.header("content-type", "application/json");
        self
    }

    pub fn raw(mut self, body: &str) -> Self {
        self.body = Body::Text(body.to_string());
        self
    }

    pub fn build(self) -> Request {
        self.builder.body(self.body).unwrap()
    }
}

pub fn body_json(response: &Response<Body>) -> Value {
    let bytes: &[u8] = response.body();
    serde_json::from_slice(bytes).unwrap()
}
