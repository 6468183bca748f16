//! The notes repository: validated, session-scoped CRUD over a `NoteStore`.
//!
//! Each successful mutation publishes invalidations on the repository's
//! `ChangeNotifier` after the store has confirmed it. Nothing is published
//! on failure, and nothing is mutated locally.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::cache::{ChangeNotifier, Invalidation, QueryKey};
use crate::error::{RepoError, StoreError};
use crate::models::{Note, NoteDraft, Session};
use crate::store::{InsertRow, NoteStore, StoreScope, UpdateRow};

#[derive(Clone)]
pub struct NotesRepository {
    store: Arc<dyn NoteStore>,
    changes: ChangeNotifier,
}

impl NotesRepository {
    pub fn new(store: Arc<dyn NoteStore>, changes: ChangeNotifier) -> Self {
        Self { store, changes }
    }

    /// Subscribe to "collection changed" notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.changes.subscribe()
    }

    /// All of the user's notes, most recently updated first. Without a
    /// session this is an empty list rather than an error.
    pub async fn list(&self, session: Option<&Session>) -> Result<Vec<Note>, RepoError> {
        let Some(session) = session else {
            return Ok(Vec::new());
        };

        self.store
            .select_all(StoreScope::from(session))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error fetching notes");
                RepoError::Store(e)
            })
    }

    /// A single note, or `None` when no such note is visible.
    pub async fn get(&self, session: Option<&Session>, id: &str) -> Result<Option<Note>, RepoError> {
        let Some(session) = session else {
            return Ok(None);
        };

        match self.store.select_one(StoreScope::from(session), id).await {
            Ok(note) => Ok(Some(note)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => {
                tracing::error!(note_id = id, error = %e, "Error fetching note");
                Err(RepoError::Store(e))
            }
        }
    }

    pub async fn create(&self, session: Option<&Session>, draft: NoteDraft) -> Result<Note, RepoError> {
        let draft = draft.validate()?;
        let session = session.ok_or(RepoError::AuthRequired)?;

        let row = InsertRow {
            title: &draft.title,
            content: &draft.content,
            summary: draft.summary.as_deref(),
            user_id: session.user_id(),
        };

        let note = self
            .store
            .insert(StoreScope::from(session), row)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error creating note");
                RepoError::Create(e)
            })?;

        tracing::info!(note_id = %note.id, user_id = session.user_id(), "Created note");
        self.changes.invalidate(session.user_id(), QueryKey::Notes);
        Ok(note)
    }

    /// Replace title, content and summary, refreshing `updated_at`.
    pub async fn update(
        &self,
        session: Option<&Session>,
        id: &str,
        draft: NoteDraft,
    ) -> Result<Note, RepoError> {
        let draft = draft.validate()?;
        let session = session.ok_or(RepoError::AuthRequired)?;

        let row = UpdateRow {
            title: &draft.title,
            content: &draft.content,
            summary: draft.summary.as_deref(),
            updated_at: Utc::now(),
        };

        let note = self
            .store
            .update(StoreScope::from(session), id, row)
            .await
            .map_err(|e| {
                tracing::error!(note_id = id, error = %e, "Error updating note");
                RepoError::Store(e)
            })?;

        self.changes.invalidate(session.user_id(), QueryKey::Notes);
        self.changes
            .invalidate(session.user_id(), QueryKey::Note(note.id.clone()));
        Ok(note)
    }

    /// Hard-delete a note. A note that is already gone counts as deleted.
    pub async fn delete(&self, session: Option<&Session>, id: &str) -> Result<(), RepoError> {
        let session = session.ok_or(RepoError::AuthRequired)?;

        match self.store.delete(StoreScope::from(session), id).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => {
                tracing::error!(note_id = id, error = %e, "Error deleting note");
                return Err(RepoError::Store(e));
            }
        }

        self.changes.invalidate(session.user_id(), QueryKey::Notes);
        self.changes
            .invalidate(session.user_id(), QueryKey::Note(id.to_string()));
        Ok(())
    }
}
