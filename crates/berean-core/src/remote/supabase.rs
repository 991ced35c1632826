//! Supabase REST implementation of the remote store

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::util::{is_http_url, normalize_text_option};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote store speaking the Supabase PostgREST dialect.
///
/// Row-level security on the backend scopes every request to the bearer
/// token's user, so the store itself never filters by user id.
#[derive(Clone)]
pub struct SupabaseRestStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SupabaseRestStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseRestStore")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl SupabaseRestStore {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let anon_key = normalize_text_option(Some(anon_key.into())).ok_or_else(|| {
            RemoteError::InvalidConfiguration("anon key must not be empty".to_string())
        })?;
        Ok(Self {
            base_url,
            anon_key,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }
}

#[async_trait::async_trait]
impl RemoteStore for SupabaseRestStore {
    async fn upsert(
        &self,
        access_token: &str,
        table: &str,
        row: &serde_json::Value,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;
        check_status(response).await
    }

    async fn delete(&self, access_token: &str, table: &str, id: &str) -> RemoteResult<()> {
        let response = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> RemoteResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthenticated);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = crate::util::compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
