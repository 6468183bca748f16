//! Notes library - application state, router and re-exports.
//!
//! The binary in `main.rs` only loads configuration and serves the router
//! built here. Integration tests build the same router around their own
//! state.

use std::sync::Arc;

use anyhow::Context;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod store;
pub mod summarize;
pub mod templates;

use crate::auth::{GoTrueAuth, LocalAuth};
use crate::cache::{ChangeNotifier, QueryCache};
use crate::config::Backend;
use crate::store::{NoteStore, PostgrestStore, SledStore};
use crate::summarize::GeminiClient;

// Re-export commonly used types
pub use auth::{AuthProvider, CurrentSession, SESSION_COOKIE};
pub use config::AppConfig;
pub use error::{ApiError, AuthError, RepoError, StoreError, SummarizeError};
pub use models::{Note, NoteDraft, Session, User};
pub use repository::NotesRepository;
pub use summarize::Summarizer;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: AppConfig,
    pub auth: Arc<dyn AuthProvider>,
    pub notes: NotesRepository,
    pub cache: QueryCache,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    /// Assemble state from already-built collaborators. The read cache is
    /// subscribed to the repository's invalidations.
    pub fn new(
        config: AppConfig,
        auth: Arc<dyn AuthProvider>,
        notes: NotesRepository,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let cache = QueryCache::new(notes.subscribe());
        Self {
            config,
            auth,
            notes,
            cache,
            summarizer,
        }
    }

    /// Build the collaborators named by the configuration.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let (auth, store): (Arc<dyn AuthProvider>, Arc<dyn NoteStore>) = match config.backend {
            Backend::Local => {
                let db = sled::open(&config.db_path).with_context(|| {
                    format!("Failed to open database at {}", config.db_path.display())
                })?;
                let auth = LocalAuth::new(&db, config.session_secret.clone())
                    .context("Failed to open account storage")?;
                let store = SledStore::new(&db).context("Failed to open note storage")?;
                let auth: Arc<dyn AuthProvider> = Arc::new(auth);
                let store: Arc<dyn NoteStore> = Arc::new(store);
                (auth, store)
            }
            Backend::Remote => {
                if config.remote.url.is_none() || config.remote.anon_key.is_none() {
                    tracing::warn!("SUPABASE_URL or SUPABASE_ANON_KEY not set, auth and notes calls will fail");
                }
                let auth: Arc<dyn AuthProvider> =
                    Arc::new(GoTrueAuth::new(reqwest::Client::new(), &config.remote));
                let store: Arc<dyn NoteStore> =
                    Arc::new(PostgrestStore::new(reqwest::Client::new(), &config.remote));
                (auth, store)
            }
        };

        if config.summarizer.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set, summarization requests will fail");
        }
        let summarizer = Arc::new(GeminiClient::new(reqwest::Client::new(), &config.summarizer));

        let notes = NotesRepository::new(store, ChangeNotifier::new());
        Ok(Self::new(config, auth, notes, summarizer))
    }

    /// OAuth sign-in is only offered by the hosted auth backend.
    pub fn oauth_enabled(&self) -> bool {
        self.config.backend == Backend::Remote
    }

    /// The user's notes, served from the cache when it holds a current copy.
    /// The generation is taken before the lookup so a fetch that overlaps a
    /// write is never cached.
    pub async fn list_notes(&self, session: Option<&Session>) -> Result<Vec<Note>, RepoError> {
        let Some(s) = session else {
            return Ok(Vec::new());
        };
        let generation = self.cache.generation();
        if let Some(notes) = self.cache.list(s.user_id()) {
            return Ok(notes);
        }

        let notes = self.notes.list(session).await?;
        self.cache.store_list(s.user_id(), &notes, generation);
        Ok(notes)
    }

    /// A single note, served from the cache when it holds a current copy.
    /// Misses are never cached.
    pub async fn get_note(&self, session: Option<&Session>, id: &str) -> Result<Option<Note>, RepoError> {
        let Some(s) = session else {
            return Ok(None);
        };
        let generation = self.cache.generation();
        if let Some(note) = self.cache.note(s.user_id(), id) {
            return Ok(Some(note));
        }

        let note = self.notes.get(session, id).await?;
        if let Some(note) = &note {
            self.cache.store_note(s.user_id(), note, generation);
        }
        Ok(note)
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/signup", get(handlers::signup_page).post(handlers::signup_submit))
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .route("/auth/oauth/{provider}", get(handlers::oauth_start))
        .route("/auth/callback", get(handlers::oauth_callback))
        .route("/dashboard", get(handlers::dashboard))
        .route("/dashboard/notes", post(handlers::create_note))
        .route("/dashboard/{id}", get(handlers::edit_note_page).post(handlers::update_note))
        .route("/dashboard/{id}/delete", post(handlers::delete_note))
        // JSON API
        .route("/api/notes", get(api::list_notes).post(api::create_note))
        .route(
            "/api/notes/{id}",
            get(api::get_note).put(api::update_note).delete(api::delete_note),
        )
        .route("/api/summarize", post(summarize::summarize))
        .layer(middleware::from_fn_with_state(state.clone(), gate::session_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
