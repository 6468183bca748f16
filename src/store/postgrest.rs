//! Note store backed by a hosted PostgREST endpoint (`/rest/v1/notes`).
//!
//! Requests carry the project's public `apikey` plus the user's access token,
//! so the table's row-level security policy decides what each user sees.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{InsertRow, NoteStore, StoreScope, UpdateRow};
use crate::config::RemoteConfig;
use crate::error::StoreError;
use crate::models::Note;

const COLUMNS: &str = "id,title,content,summary,created_at,updated_at";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST's code for "single row requested, zero returned".
const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    table_url: Option<Url>,
    api_key: Option<String>,
}

impl PostgrestStore {
    pub fn new(client: Client, config: &RemoteConfig) -> Self {
        let table_url = config
            .url
            .as_ref()
            .and_then(|base| base.join("rest/v1/notes").ok());
        Self {
            client,
            table_url,
            api_key: config.anon_key.clone(),
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        scope: StoreScope<'_>,
    ) -> Result<RequestBuilder, StoreError> {
        let (url, key) = match (&self.table_url, &self.api_key) {
            (Some(url), Some(key)) => (url.clone(), key),
            _ => return Err(StoreError::NotConfigured),
        };

        Ok(self
            .client
            .request(method, url)
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {}", scope.access_token)))
    }

    async fn send_single(&self, request: RequestBuilder) -> Result<Note, StoreError> {
        let response = request.header(ACCEPT, SINGLE_OBJECT).send().await?;
        let response = check_status(response, true).await?;
        response.json::<Note>().await.map_err(decode_error)
    }
}

fn decode_error(e: reqwest::Error) -> StoreError {
    StoreError::Decode(e.to_string())
}

/// Map a non-2xx response to a `StoreError`, keeping PostgREST's message.
async fn check_status(response: Response, single: bool) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&body).ok();

    let code = parsed.as_ref().and_then(|b| b.code.clone());
    if code.as_deref() == Some(NO_ROWS_CODE) || (single && status == StatusCode::NOT_ACCEPTABLE) {
        return Err(StoreError::NotFound);
    }

    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone().or_else(|| b.details.clone()))
        .unwrap_or_else(|| format!("Store request failed with status {}", status.as_u16()));

    Err(StoreError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl NoteStore for PostgrestStore {
    async fn select_all(&self, scope: StoreScope<'_>) -> Result<Vec<Note>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, scope)?
            .query(&[("select", COLUMNS), ("order", "updated_at.desc")])
            .send()
            .await?;
        let response = check_status(response, false).await?;
        response.json::<Vec<Note>>().await.map_err(decode_error)
    }

    async fn select_one(&self, scope: StoreScope<'_>, id: &str) -> Result<Note, StoreError> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(reqwest::Method::GET, scope)?
            .query(&[("select", COLUMNS), ("id", filter.as_str())]);
        self.send_single(request).await
    }

    async fn insert(&self, scope: StoreScope<'_>, row: InsertRow<'_>) -> Result<Note, StoreError> {
        let request = self
            .request(reqwest::Method::POST, scope)?
            .query(&[("select", COLUMNS)])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&[row]);
        self.send_single(request).await
    }

    async fn update(
        &self,
        scope: StoreScope<'_>,
        id: &str,
        row: UpdateRow<'_>,
    ) -> Result<Note, StoreError> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(reqwest::Method::PATCH, scope)?
            .query(&[("select", COLUMNS), ("id", filter.as_str())])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row);
        self.send_single(request).await
    }

    async fn delete(&self, scope: StoreScope<'_>, id: &str) -> Result<(), StoreError> {
        let filter = format!("eq.{}", id);
        let response = self
            .request(reqwest::Method::DELETE, scope)?
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        check_status(response, false).await?;
        Ok(())
    }
}
