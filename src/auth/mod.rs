//! Authentication and session management.
//!
//! The application never inspects session tokens itself. It stores the
//! provider's token in the `notes_session` cookie and asks an `AuthProvider`
//! to resolve it. Two providers exist: `GoTrueAuth` for a hosted auth API
//! and `LocalAuth` for the embedded sled backend.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::AuthError;
use crate::models::{Session, SignUpOutcome};

mod gotrue;
mod local;

pub use gotrue::GoTrueAuth;
pub use local::{LocalAuth, LoginRateLimit};

/// Session cookie name
pub const SESSION_COOKIE: &str = "notes_session";

/// Cookie holding the PKCE verifier between the OAuth redirect and callback.
pub const PKCE_COOKIE: &str = "notes_pkce";

/// Session time-to-live in hours
pub const SESSION_TTL_HOURS: i64 = 24;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a token to a session. `Ok(None)` means the token is not (or
    /// no longer) valid.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// URL to send the browser to for an OAuth sign-in.
    fn oauth_authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, AuthError>;

    /// Exchange the code from an OAuth callback for a session.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;
}

// ============================================================================
// Request Session
// ============================================================================

/// The session resolved for the current request, if any.
///
/// The session gate inserts this into request extensions. Handlers on a
/// router without the gate see `CurrentSession(None)`.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn get(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Look up the session named by the request's cookie. Any failure to
/// resolve it counts as "no session".
pub async fn resolve_session(auth: &dyn AuthProvider, jar: &CookieJar) -> Option<Session> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();
    if token.is_empty() {
        return None;
    }

    match auth.get_session(&token).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed, treating as signed out");
            None
        }
    }
}

// ============================================================================
// Cookies
// ============================================================================

/// `Set-Cookie` value for the session token. The cookie lives as long as
/// the token when the provider reports an expiry.
pub fn session_cookie(session: &Session, secure: bool) -> String {
    let max_age = match session.expires_at {
        Some(expires_at) => (expires_at - Utc::now()).num_seconds().max(0),
        None => SESSION_TTL_HOURS * 3600,
    };
    build_cookie(SESSION_COOKIE, &session.access_token, max_age, secure)
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    build_cookie(SESSION_COOKIE, "", 0, secure)
}

pub fn pkce_cookie(verifier: &str, secure: bool) -> String {
    build_cookie(PKCE_COOKIE, verifier, 600, secure)
}

pub fn clear_pkce_cookie(secure: bool) -> String {
    build_cookie(PKCE_COOKIE, "", 0, secure)
}

fn build_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        name, value, max_age, secure_attr
    )
}

// ============================================================================
// PKCE
// ============================================================================

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        let challenge = pkce_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

// ============================================================================
// Form Validation
// ============================================================================

/// Check sign-in/sign-up form fields before calling the provider.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), String> {
    let email = email.trim();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid_email {
        return Err("Please enter a valid email address".to_string());
    }
    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }
    Ok(())
}
