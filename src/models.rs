//! Data models for the notes application.
//!
//! This module contains the core data structures shared by the store, the
//! repository, the auth providers and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RepoError;

// ============================================================================
// Core Note Types
// ============================================================================

/// A note as seen by clients. The owning `user_id` lives only in store rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full-replace input for creating or updating a note.
///
/// `title` and `content` are required; `summary` is optional and a blank
/// summary is the same as no summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Checks required fields and normalizes the summary.
    pub fn validate(self) -> Result<Self, RepoError> {
        if self.title.trim().is_empty() {
            return Err(RepoError::Validation("Title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(RepoError::Validation("Content is required".to_string()));
        }

        let summary = self.summary.filter(|s| !s.trim().is_empty());

        Ok(Self {
            title: self.title,
            content: self.content,
            summary,
        })
    }
}

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session issued by the auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: User,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Result of a sign-up attempt.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// The account exists but must be confirmed (e.g. by email) first.
    ConfirmationRequired,
}

// ============================================================================
// Summarization
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// JSON error body used by every API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_title() {
        let err = NoteDraft::new("   ", "body").validate().unwrap_err();
        assert!(matches!(err, RepoError::Validation(ref m) if m == "Title is required"));
    }

    #[test]
    fn test_validate_rejects_blank_content() {
        let err = NoteDraft::new("Title", "\n\t").validate().unwrap_err();
        assert!(matches!(err, RepoError::Validation(ref m) if m == "Content is required"));
    }

    #[test]
    fn test_validate_drops_blank_summary() {
        let draft = NoteDraft::new("Title", "Body").with_summary("  ").validate().unwrap();
        assert_eq!(draft.summary, None);

        let draft = NoteDraft::new("Title", "Body").with_summary("Short").validate().unwrap();
        assert_eq!(draft.summary.as_deref(), Some("Short"));
    }

    #[test]
    fn test_note_json_omits_missing_summary() {
        let note = Note {
            id: "n1".to_string(),
            title: "Groceries".to_string(),
            content: "Milk, eggs, bread".to_string(),
            summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("summary").is_none());
        assert_eq!(json["title"], "Groceries");
    }
}
