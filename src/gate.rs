//! Session gate middleware.
//!
//! Runs once per request, before any handler. It resolves the session from
//! the cookie, stores it in request extensions as `CurrentSession`, and
//! redirects:
//!
//! - `/dashboard` and everything under it requires a session (else `/login`)
//! - `/login` and `/signup` require *no* session (else `/dashboard`)
//!
//! All other paths pass through.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::auth::{resolve_session, CurrentSession};
use crate::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

const PROTECTED_PREFIXES: &[&str] = &[DASHBOARD_PATH];
const AUTH_ONLY_PATHS: &[&str] = &[LOGIN_PATH, "/signup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    Public,
}

impl RouteClass {
    pub fn of(path: &str) -> Self {
        let protected = PROTECTED_PREFIXES.iter().any(|prefix| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        if protected {
            RouteClass::Protected
        } else if AUTH_ONLY_PATHS.contains(&path) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(&'static str),
}

impl GateDecision {
    pub fn decide(class: RouteClass, has_session: bool) -> Self {
        match (class, has_session) {
            (RouteClass::Protected, false) => GateDecision::Redirect(LOGIN_PATH),
            (RouteClass::AuthOnly, true) => GateDecision::Redirect(DASHBOARD_PATH),
            _ => GateDecision::Pass,
        }
    }
}

pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = resolve_session(state.auth.as_ref(), &jar).await;
    let class = RouteClass::of(request.uri().path());

    match GateDecision::decide(class, session.is_some()) {
        GateDecision::Redirect(to) => {
            tracing::debug!(path = %request.uri().path(), to, "Session gate redirect");
            Redirect::to(to).into_response()
        }
        GateDecision::Pass => {
            request.extensions_mut().insert(CurrentSession(session));
            next.run(request).await
        }
    }
}
