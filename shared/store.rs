//! Thin client over the Supabase PostgREST endpoint.

use postgrest::{Builder, Postgrest};
use serde_json::Value;

use crate::config::DatabaseConfig;
use crate::error::StoreError;

/// Status PostgREST answers with when a single-object request does not match
/// exactly one row.
const NOT_SINGLE_STATUS: u16 = 406;

/// Generic record store the resource handlers query.
#[derive(Clone)]
pub struct RecordStore {
    client: Postgrest,
}

impl RecordStore {
    pub fn new(supabase_url: &str, supabase_key: &str) -> Self {
        let client = Postgrest::new(format!("{}/rest/v1", supabase_url.trim_end_matches('/')))
            .insert_header("apikey", supabase_key)
            .insert_header("Authorization", format!("Bearer {supabase_key}"));
        Self { client }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(&config.supabase_url, &config.supabase_key)
    }

    /// Start a query against `table`.
    pub fn table(&self, table: &str) -> Builder {
        self.client.from(table)
    }

    /// Execute and decode a JSON array of rows.
    pub async fn fetch_all(&self, query: Builder) -> Result<Vec<Value>, StoreError> {
        let body = execute(query).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Execute a single-object request; `None` when no row matched.
    ///
    /// More than one matching row is an error, not a miss.
    pub async fn fetch_optional(&self, query: Builder) -> Result<Option<Value>, StoreError> {
        match execute(query.single()).await {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(StoreError::Status {
                status,
                details: Some(details),
                ..
            }) if status == NOT_SINGLE_STATUS && reports_zero_rows(&details) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// First row of a query that may match several; order the query to make
    /// the choice stable.
    pub async fn fetch_first(&self, query: Builder) -> Result<Option<Value>, StoreError> {
        Ok(self.fetch_all(query.limit(1)).await?.into_iter().next())
    }

    /// Execute a write whose result is ignored.
    pub async fn execute(&self, query: Builder) -> Result<(), StoreError> {
        execute(query).await.map(|_| ())
    }
}

async fn execute(query: Builder) -> Result<String, StoreError> {
    let response = query
        .execute()
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;

    if !status.is_success() {
        let error = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);
        let field = |name: &str| error.get(name).and_then(Value::as_str).map(str::to_string);
        return Err(StoreError::Status {
            status: status.as_u16(),
            message: field("message")
                .unwrap_or_else(|| format!("Database query failed with status {status}")),
            details: field("details"),
        });
    }

    Ok(body)
}

/// Whether a PostgREST `details` string says the result had zero rows, as in
/// "The result contains 0 rows" or "Results contain 0 rows, ...".
fn reports_zero_rows(details: &str) -> bool {
    let words: Vec<&str> = details.split_whitespace().collect();
    words
        .windows(2)
        .any(|pair| pair[0] == "0" && pair[1].starts_with("row"))
}
