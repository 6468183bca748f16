//! Embedded auth provider for the local backend.
//!
//! Accounts live in the sled `users` tree with Argon2id password hashes.
//! Session tokens are HMAC-signed, `base64(json).hex(signature)`, and expire
//! after `SESSION_TTL_HOURS`. Signing out records the token's nonce in the
//! `revoked_sessions` tree until the token would have expired anyway.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sled::{Db, Tree};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::{AuthProvider, SESSION_TTL_HOURS};
use crate::error::AuthError;
use crate::models::{Session, SignUpOutcome, User};

type HmacSha256 = Hmac<Sha256>;

const USERS_TREE: &str = "users";
const REVOKED_TREE: &str = "revoked_sessions";
const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Failures older than this, with no lockout running, are forgotten.
const FAILURE_WINDOW_MINUTES: i64 = 15;

// ============================================================================
// Rate Limiting
// ============================================================================

/// Tracks login failures for rate limiting with exponential backoff.
pub struct LoginRateLimit {
    pub failures: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl LoginRateLimit {
    pub fn new() -> Self {
        Self {
            failures: 0,
            locked_until: None,
            last_failure: None,
        }
    }

    /// Check if login attempts are currently locked out.
    pub fn is_locked(&self) -> bool {
        if let Some(until) = self.locked_until {
            Utc::now() < until
        } else {
            false
        }
    }

    /// Record a failed login attempt. After 5 failures, apply exponential backoff capped at 64s.
    pub fn record_failure(&mut self) {
        self.failures += 1;
        self.last_failure = Some(Utc::now());
        if self.failures >= 5 {
            let delay_secs = std::cmp::min(1i64 << (self.failures - 5).min(6), 64);
            self.locked_until = Some(Utc::now() + chrono::Duration::seconds(delay_secs));
        }
    }

    /// Reset on successful login.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.locked_until = None;
        self.last_failure = None;
    }

    /// Not locked, and the last failure is old enough to forget.
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        !self.is_locked()
            && self
                .last_failure
                .map_or(true, |at| now - at > chrono::Duration::minutes(FAILURE_WINDOW_MINUTES))
    }
}

impl Default for LoginRateLimit {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Stored Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    id: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    user_id: String,
    email: String,
    created: i64,
    expires: i64,
    nonce: String,
}

// ============================================================================
// Provider
// ============================================================================

pub struct LocalAuth {
    users: Tree,
    revoked: Tree,
    secret: Vec<u8>,
    /// Failed-login tracking per normalized email.
    rate_limits: Arc<Mutex<HashMap<String, LoginRateLimit>>>,
}

impl LocalAuth {
    /// Open the auth trees. Without a configured secret a random one is
    /// generated, so sessions end when the process exits.
    pub fn new(db: &Db, secret: Option<Vec<u8>>) -> Result<Self, AuthError> {
        let secret = match secret {
            Some(s) => s,
            None => {
                tracing::warn!("NOTES_SESSION_SECRET not set, local sessions will not survive a restart");
                let mut bytes = vec![0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                bytes
            }
        };

        let auth = Self {
            users: db.open_tree(USERS_TREE)?,
            revoked: db.open_tree(REVOKED_TREE)?,
            secret,
            rate_limits: Arc::new(Mutex::new(HashMap::new())),
        };
        auth.purge_expired_revocations();
        Ok(auth)
    }

    /// Drop revocation entries for tokens that have expired on their own.
    pub fn purge_expired_revocations(&self) {
        let now = Utc::now().timestamp();
        let mut purged = 0usize;
        for (key, value) in self.revoked.iter().flatten() {
            let expired = <[u8; 8]>::try_from(value.as_ref())
                .map(|b| i64::from_be_bytes(b) <= now)
                .unwrap_or(true);
            if expired && self.revoked.remove(key).is_ok() {
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::debug!(purged, "Purged expired session revocations");
        }
    }

    fn find_user(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        match self.users.get(email.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AuthError::Internal(e.to_string())),
            None => Ok(None),
        }
    }

    fn issue_session(&self, user: &UserRecord) -> Result<Session, AuthError> {
        let now = Utc::now().timestamp();
        let expires = now + (SESSION_TTL_HOURS * 3600);
        let nonce: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();

        let claims = SessionClaims {
            user_id: user.id.clone(),
            email: user.email.clone(),
            created: now,
            expires,
            nonce,
        };
        let token = sign_claims(&claims, &self.secret)?;

        Ok(session_from_claims(token, &claims))
    }

    fn is_locked_out(&self, email: &str) -> bool {
        let limits = self.rate_limits.lock().unwrap_or_else(PoisonError::into_inner);
        limits.get(email).is_some_and(LoginRateLimit::is_locked)
    }

    fn record_login_failure(&self, email: &str) {
        let mut limits = self.rate_limits.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        limits.retain(|_, rl| !rl.is_stale(now));
        let rl = limits.entry(email.to_string()).or_default();
        rl.record_failure();
        if rl.is_locked() {
            tracing::warn!(email, failures = rl.failures, "Login locked out");
        }
    }

    fn clear_login_failures(&self, email: &str) {
        let mut limits = self.rate_limits.lock().unwrap_or_else(PoisonError::into_inner);
        limits.remove(email);
    }
}

fn session_from_claims(token: String, claims: &SessionClaims) -> Session {
    Session {
        access_token: token,
        user: User {
            id: claims.user_id.clone(),
            email: Some(claims.email.clone()),
        },
        expires_at: Utc.timestamp_opt(claims.expires, 0).single(),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Internal(e.to_string()))?
}

async fn verify_password(password: &str, stored_hash: &str) -> bool {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .unwrap_or(false)
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let Some(claims) = verify_token(token, &self.secret) else {
            return Ok(None);
        };

        if self.revoked.contains_key(claims.nonce.as_bytes())? {
            return Ok(None);
        }

        Ok(Some(session_from_claims(token.to_string(), &claims)))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        if self.is_locked_out(&email) {
            return Err(AuthError::RateLimited);
        }

        let user = self.find_user(&email)?;

        let verified = match &user {
            Some(record) => verify_password(password, &record.password_hash).await,
            None => false,
        };

        match user {
            Some(record) if verified => {
                self.clear_login_failures(&email);
                tracing::info!(user_id = %record.id, "Local sign-in");
                self.issue_session(&record)
            }
            _ => {
                self.record_login_failure(&email);
                Err(AuthError::Rejected(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let email = normalize_email(email);
        if self.find_user(&email)?.is_some() {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(password).await?,
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec(&record).map_err(|e| AuthError::Internal(e.to_string()))?;

        // compare_and_swap guards against two concurrent sign-ups for one email.
        let inserted = self
            .users
            .compare_and_swap(email.as_bytes(), None as Option<&[u8]>, Some(json))?;
        if inserted.is_err() {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        self.users.flush()?;

        tracing::info!(user_id = %record.id, "Local account created");
        Ok(SignUpOutcome::SignedIn(self.issue_session(&record)?))
    }

    fn oauth_authorize_url(&self, provider: &str, _: &str, _: &str) -> Result<String, AuthError> {
        Err(AuthError::Unsupported(format!("OAuth sign-in with {}", provider)))
    }

    async fn exchange_code(&self, _: &str, _: &str) -> Result<Session, AuthError> {
        Err(AuthError::Unsupported("OAuth sign-in".to_string()))
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        if let Some(claims) = verify_token(token, &self.secret) {
            self.revoked
                .insert(claims.nonce.as_bytes(), claims.expires.to_be_bytes().to_vec())?;
            self.revoked.flush()?;
        }
        Ok(())
    }
}

// ============================================================================
// Token Signing
// ============================================================================

fn sign_claims(claims: &SessionClaims, secret: &[u8]) -> Result<String, AuthError> {
    let json = serde_json::to_string(claims).map_err(|e| AuthError::Internal(e.to_string()))?;
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| AuthError::Internal(e.to_string()))?;
    mac.update(json.as_bytes());
    let signature = hex_encode(mac.finalize().into_bytes().as_slice());
    Ok(format!("{}.{}", base64_encode(&json), signature))
}

/// Verify signature and expiry, returning the claims of a valid token.
fn verify_token(token: &str, secret: &[u8]) -> Option<SessionClaims> {
    let (payload, signature) = token.split_once('.')?;
    let json = base64_decode(payload)?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(json.as_bytes());
    let expected_sig = hex_encode(mac.finalize().into_bytes().as_slice());

    // Constant-time comparison to prevent timing attacks
    let sig_bytes = signature.as_bytes();
    let expected_bytes = expected_sig.as_bytes();
    if sig_bytes.len() != expected_bytes.len() || sig_bytes.ct_eq(expected_bytes).unwrap_u8() != 1 {
        return None;
    }

    let claims: SessionClaims = serde_json::from_str(&json).ok()?;
    if Utc::now().timestamp() < claims.expires {
        Some(claims)
    } else {
        None
    }
}

/// Encode a string as base64
fn base64_encode(s: &str) -> String {
    STANDARD.encode(s.as_bytes())
}

/// Decode a base64 string
fn base64_decode(s: &str) -> Option<String> {
    let bytes = STANDARD.decode(s).ok()?;
    String::from_utf8(bytes).ok()
}

/// Encode bytes as hexadecimal
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
