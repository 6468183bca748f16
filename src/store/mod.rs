//! Row-level access to the `notes` table.
//!
//! `NoteStore` is the seam between the repository and whatever holds the
//! rows: a hosted PostgREST endpoint or the embedded sled database. Every
//! call carries a `StoreScope` so the store can apply its per-user access
//! policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::models::{Note, Session};

mod postgrest;
mod sled_store;

pub use postgrest::PostgrestStore;
pub use sled_store::SledStore;

/// Identity a store call runs as.
#[derive(Debug, Clone, Copy)]
pub struct StoreScope<'a> {
    pub user_id: &'a str,
    pub access_token: &'a str,
}

impl<'a> From<&'a Session> for StoreScope<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            user_id: session.user_id(),
            access_token: &session.access_token,
        }
    }
}

/// Columns written on insert. The store assigns `id` and both timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct InsertRow<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub summary: Option<&'a str>,
    pub user_id: &'a str,
}

/// Columns written on update. `summary: None` clears the column.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRow<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub summary: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes visible to `scope`, newest `updated_at` first.
    async fn select_all(&self, scope: StoreScope<'_>) -> Result<Vec<Note>, StoreError>;

    /// A single note, or `StoreError::NotFound`.
    async fn select_one(&self, scope: StoreScope<'_>, id: &str) -> Result<Note, StoreError>;

    async fn insert(&self, scope: StoreScope<'_>, row: InsertRow<'_>) -> Result<Note, StoreError>;

    /// Replace a note's fields, or `StoreError::NotFound`.
    async fn update(
        &self,
        scope: StoreScope<'_>,
        id: &str,
        row: UpdateRow<'_>,
    ) -> Result<Note, StoreError>;

    /// Delete a note. Deleting a missing row is not an error.
    async fn delete(&self, scope: StoreScope<'_>, id: &str) -> Result<(), StoreError>;
}
