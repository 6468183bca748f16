//! JSON notes API.
//!
//! Same repository and cache as the dashboard pages. Every failure is an
//! `ApiError`, so clients always get `{"error": message}` bodies.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::CurrentSession;
use crate::error::ApiError;
use crate::models::{Note, NoteDraft};
use crate::AppState;

fn read_draft(body: Result<Json<NoteDraft>, JsonRejection>) -> Result<NoteDraft, ApiError> {
    body.map(|Json(draft)| draft)
        .map_err(|rejection| ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text()))
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.list_notes(current.get()).await?;
    Ok(Json(notes))
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    match state.get_note(current.get(), &id).await? {
        Some(note) => Ok(Json(note)),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "Note not found")),
    }
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    body: Result<Json<NoteDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let draft = read_draft(body)?;
    let note = state.notes.create(current.get(), draft).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<String>,
    body: Result<Json<NoteDraft>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let draft = read_draft(body)?;
    let note = state.notes.update(current.get(), &id, draft).await?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.notes.delete(current.get(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
