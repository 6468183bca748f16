//! HTTP route handlers for the web pages.
//!
//! Covers the landing page, sign-in/sign-up, OAuth, sign-out and the
//! dashboard forms. The session gate has already run for every request, so
//! handlers read the session from `CurrentSession` instead of the cookie.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::{
    clear_pkce_cookie, clear_session_cookie, pkce_cookie, session_cookie, validate_credentials,
    CurrentSession, Pkce, PKCE_COOKIE,
};
use crate::gate::{DASHBOARD_PATH, LOGIN_PATH};
use crate::models::{NoteDraft, Session, SignUpOutcome};
use crate::templates::{
    auth_page, dashboard_page, landing_page, note_edit_page, not_found_page, AuthPageKind,
    NoteFormValues,
};
use crate::{AppState, RepoError, StoreError};

// ============================================================================
// Landing
// ============================================================================

pub async fn index(current: CurrentSession) -> Html<String> {
    Html(landing_page(current.get()))
}

// ============================================================================
// Sign In / Sign Up
// ============================================================================

#[derive(Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Messages carried through a redirect to the login page.
#[derive(Deserialize, Default)]
pub struct AuthNotice {
    pub error: Option<String>,
    pub message: Option<String>,
}

fn login_redirect(key: &str, text: &str) -> Redirect {
    Redirect::to(&format!("{}?{}={}", LOGIN_PATH, key, urlencoding::encode(text)))
}

/// Set the session cookie and send the browser to the dashboard.
fn signed_in(state: &AppState, session: &Session) -> Response {
    tracing::info!(user_id = session.user_id(), "Signed in");
    (
        [(SET_COOKIE, session_cookie(session, state.config.cookie_secure))],
        Redirect::to(DASHBOARD_PATH),
    )
        .into_response()
}

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(notice): Query<AuthNotice>,
) -> Html<String> {
    Html(auth_page(
        AuthPageKind::Login,
        "",
        notice.error.as_deref(),
        notice.message.as_deref(),
        state.oauth_enabled(),
    ))
}

pub async fn login_submit(State(state): State<Arc<AppState>>, Form(form): Form<AuthForm>) -> Response {
    let render_error = |message: &str| {
        Html(auth_page(
            AuthPageKind::Login,
            &form.email,
            Some(message),
            None,
            state.oauth_enabled(),
        ))
        .into_response()
    };

    if let Err(message) = validate_credentials(&form.email, &form.password) {
        return render_error(&message);
    }

    match state.auth.sign_in_with_password(&form.email, &form.password).await {
        Ok(session) => signed_in(&state, &session),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            render_error(&e.to_string())
        }
    }
}

pub async fn signup_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(auth_page(AuthPageKind::SignUp, "", None, None, state.oauth_enabled()))
}

pub async fn signup_submit(State(state): State<Arc<AppState>>, Form(form): Form<AuthForm>) -> Response {
    let render_error = |message: &str| {
        Html(auth_page(
            AuthPageKind::SignUp,
            &form.email,
            Some(message),
            None,
            state.oauth_enabled(),
        ))
        .into_response()
    };

    if let Err(message) = validate_credentials(&form.email, &form.password) {
        return render_error(&message);
    }

    match state.auth.sign_up(&form.email, &form.password).await {
        Ok(SignUpOutcome::SignedIn(session)) => signed_in(&state, &session),
        Ok(SignUpOutcome::ConfirmationRequired) => login_redirect(
            "message",
            "Check your email to confirm your account, then sign in.",
        )
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            render_error(&e.to_string())
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, current: CurrentSession) -> Response {
    if let Some(session) = current.get() {
        if let Err(e) = state.auth.sign_out(&session.access_token).await {
            tracing::warn!(error = %e, "Sign-out failed, clearing cookie anyway");
        }
    }

    (
        [(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

// ============================================================================
// OAuth
// ============================================================================

pub async fn oauth_start(State(state): State<Arc<AppState>>, Path(provider): Path<String>) -> Response {
    let redirect_to = match state.config.site_url.join("/auth/callback") {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build OAuth callback URL");
            return login_redirect("error", "Could not start sign-in").into_response();
        }
    };

    let pkce = Pkce::generate();
    match state
        .auth
        .oauth_authorize_url(&provider, redirect_to.as_str(), &pkce.challenge)
    {
        Ok(url) => (
            [(SET_COOKIE, pkce_cookie(&pkce.verifier, state.config.cookie_secure))],
            Redirect::to(&url),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "OAuth sign-in unavailable");
            login_redirect("error", &e.to_string()).into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error_description: Option<String>,
}

pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    if let Some(description) = query.error_description {
        return login_redirect("error", &description).into_response();
    }

    let verifier = jar.get(PKCE_COOKIE).map(|c| c.value().to_string());
    let (Some(code), Some(verifier)) = (query.code, verifier) else {
        return login_redirect("error", "Could not authenticate with the provider").into_response();
    };

    let secure = state.config.cookie_secure;
    match state.auth.exchange_code(&code, &verifier).await {
        Ok(session) => {
            tracing::info!(user_id = session.user_id(), "Signed in with OAuth");
            (
                AppendHeaders([
                    (SET_COOKIE, session_cookie(&session, secure)),
                    (SET_COOKIE, clear_pkce_cookie(secure)),
                ]),
                Redirect::to(DASHBOARD_PATH),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            (
                [(SET_COOKIE, clear_pkce_cookie(secure))],
                login_redirect("error", &e.to_string()),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
}

impl NoteForm {
    fn values(&self) -> NoteFormValues {
        NoteFormValues {
            title: self.title.clone(),
            content: self.content.clone(),
            summary: self.summary.clone(),
        }
    }

    fn into_draft(self) -> NoteDraft {
        NoteDraft::new(self.title, self.content).with_summary(self.summary)
    }
}

/// Render the dashboard with the given composer contents and banner. A
/// failure to load the list is shown in the banner too.
async fn render_dashboard(
    state: &AppState,
    session: &Session,
    composer: &NoteFormValues,
    error: Option<String>,
    status: StatusCode,
) -> Response {
    let (notes, error) = match state.list_notes(Some(session)).await {
        Ok(notes) => (notes, error),
        Err(e) => (Vec::new(), error.or_else(|| Some(format!("Error fetching notes: {}", e)))),
    };
    (status, Html(dashboard_page(session, &notes, composer, error.as_deref()))).into_response()
}

pub async fn dashboard(State(state): State<Arc<AppState>>, current: CurrentSession) -> Response {
    let Some(session) = current.get() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };
    render_dashboard(&state, session, &NoteFormValues::default(), None, StatusCode::OK).await
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Form(form): Form<NoteForm>,
) -> Response {
    let Some(session) = current.get() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let values = form.values();
    match state.notes.create(Some(session), form.into_draft()).await {
        Ok(_) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(e) => render_dashboard(&state, session, &values, Some(e.to_string()), e.status()).await,
    }
}

pub async fn edit_note_page(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Response {
    let Some(session) = current.get() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    match state.get_note(Some(session), &id).await {
        Ok(Some(note)) => {
            Html(note_edit_page(session, &id, &NoteFormValues::from(&note), None)).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, Html(not_found_page(Some(session)))).into_response(),
        Err(e) => (
            e.status(),
            Html(note_edit_page(
                session,
                &id,
                &NoteFormValues::default(),
                Some(&e.to_string()),
            )),
        )
            .into_response(),
    }
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<String>,
    Form(form): Form<NoteForm>,
) -> Response {
    let Some(session) = current.get() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let values = form.values();
    match state.notes.update(Some(session), &id, form.into_draft()).await {
        Ok(_) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(RepoError::Store(StoreError::NotFound)) => {
            (StatusCode::NOT_FOUND, Html(not_found_page(Some(session)))).into_response()
        }
        Err(e) => (
            e.status(),
            Html(note_edit_page(session, &id, &values, Some(&e.to_string()))),
        )
            .into_response(),
    }
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Response {
    let Some(session) = current.get() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    match state.notes.delete(Some(session), &id).await {
        Ok(()) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(e) => {
            render_dashboard(
                &state,
                session,
                &NoteFormValues::default(),
                Some(e.to_string()),
                e.status(),
            )
            .await
        }
    }
}
