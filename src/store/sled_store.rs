//! Embedded note store backed by sled.
//!
//! Rows are JSON values in the `notes` tree keyed by note id. Ownership is
//! checked on every call: a row owned by another user behaves exactly like
//! a missing row.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use uuid::Uuid;

use super::{InsertRow, NoteStore, StoreScope, UpdateRow};
use crate::error::StoreError;
use crate::models::Note;

const NOTES_TREE: &str = "notes";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNote {
    id: String,
    user_id: String,
    title: String,
    content: String,
    summary: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoredNote> for Note {
    fn from(row: StoredNote) -> Self {
        Note {
            id: row.id,
            title: row.title,
            content: row.content,
            summary: row.summary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SledStore {
    tree: Tree,
}

impl SledStore {
    pub fn new(db: &Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(NOTES_TREE)?,
        })
    }

    fn load(&self, id: &str) -> Result<Option<StoredNote>, StoreError> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    fn load_owned(&self, scope: StoreScope<'_>, id: &str) -> Result<StoredNote, StoreError> {
        match self.load(id)? {
            Some(row) if row.user_id == scope.user_id => Ok(row),
            _ => Err(StoreError::NotFound),
        }
    }

    fn save(&self, row: &StoredNote) -> Result<(), StoreError> {
        let json = serde_json::to_vec(row).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.tree.insert(row.id.as_bytes(), json)?;
        self.tree.flush()?;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for SledStore {
    async fn select_all(&self, scope: StoreScope<'_>) -> Result<Vec<Note>, StoreError> {
        let mut rows = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let row: StoredNote =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
            if row.user_id == scope.user_id {
                rows.push(row);
            }
        }

        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn select_one(&self, scope: StoreScope<'_>, id: &str) -> Result<Note, StoreError> {
        self.load_owned(scope, id).map(Note::from)
    }

    async fn insert(&self, scope: StoreScope<'_>, row: InsertRow<'_>) -> Result<Note, StoreError> {
        if row.user_id != scope.user_id {
            return Err(StoreError::Api {
                status: 403,
                code: Some("42501".to_string()),
                message: "new row violates row-level security policy for table \"notes\""
                    .to_string(),
            });
        }

        let now = Utc::now();
        let stored = StoredNote {
            id: Uuid::new_v4().to_string(),
            user_id: row.user_id.to_string(),
            title: row.title.to_string(),
            content: row.content.to_string(),
            summary: row.summary.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.save(&stored)?;
        Ok(stored.into())
    }

    async fn update(
        &self,
        scope: StoreScope<'_>,
        id: &str,
        row: UpdateRow<'_>,
    ) -> Result<Note, StoreError> {
        let mut stored = self.load_owned(scope, id)?;

        // Two updates inside one clock tick must still order correctly.
        let updated_at = if row.updated_at > stored.updated_at {
            row.updated_at
        } else {
            stored.updated_at + Duration::microseconds(1)
        };

        stored.title = row.title.to_string();
        stored.content = row.content.to_string();
        stored.summary = row.summary.map(str::to_string);
        stored.updated_at = updated_at;
        self.save(&stored)?;
        Ok(stored.into())
    }

    async fn delete(&self, scope: StoreScope<'_>, id: &str) -> Result<(), StoreError> {
        match self.load(id)? {
            Some(row) if row.user_id == scope.user_id => {
                self.tree.remove(id.as_bytes())?;
                self.tree.flush()?;
                Ok(())
            }
            // Other users' rows are invisible, so there is nothing to delete.
            _ => Ok(()),
        }
    }
}
