//! Application configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration.
//! Missing credentials never fail startup; the calls that need them fail
//! with a "not configured" error instead.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use url::{Host, Url};

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

pub const DEFAULT_DB_PATH: &str = ".notes_db";

/// Which implementation backs auth and the note store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// GoTrue auth + PostgREST notes table.
    Remote,
    /// Embedded sled database with local accounts.
    Local,
}

/// Endpoint and key for the hosted auth + store service.
#[derive(Clone, Default)]
pub struct RemoteConfig {
    /// Env: `SUPABASE_URL`
    pub url: Option<Url>,
    /// Env: `SUPABASE_ANON_KEY`
    pub anon_key: Option<String>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("anon_key", &self.anon_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct SummarizerConfig {
    /// Env: `GEMINI_ENDPOINT`
    pub endpoint: Url,
    /// Env: `GEMINI_API_KEY`
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gemini_endpoint(),
            api_key: None,
        }
    }
}

fn default_gemini_endpoint() -> Url {
    match Url::parse(DEFAULT_GEMINI_ENDPOINT) {
        Ok(url) => url,
        Err(_) => unreachable!("default Gemini endpoint is a valid URL"),
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Env: `NOTES_BIND`
    pub bind_addr: SocketAddr,
    /// Env: `NOTES_BACKEND` (`remote` or `local`)
    pub backend: Backend,
    pub remote: RemoteConfig,
    pub summarizer: SummarizerConfig,
    /// Env: `NOTES_DB_PATH`
    pub db_path: PathBuf,
    /// Env: `NOTES_SESSION_SECRET`. When unset a random secret is generated
    /// at startup, so local sessions do not survive a restart.
    pub session_secret: Option<Vec<u8>>,
    /// Env: `NOTES_SITE_URL`, used to build OAuth redirect targets.
    pub site_url: Url,
    /// Env: `NOTES_COOKIE_SECURE`
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("backend", &self.backend)
            .field("remote", &self.remote)
            .field("summarizer", &self.summarizer)
            .field("db_path", &self.db_path)
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("site_url", &self.site_url.as_str())
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 3000).into(),
            backend: Backend::Remote,
            remote: RemoteConfig::default(),
            summarizer: SummarizerConfig::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            session_secret: None,
            site_url: default_site_url(),
            cookie_secure: true,
        }
    }
}

fn default_site_url() -> Url {
    match Url::parse("http://127.0.0.1:3000") {
        Ok(url) => url,
        Err(_) => unreachable!("default site URL is a valid URL"),
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("NOTES_BIND") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid NOTES_BIND, using default"),
            }
        }

        if let Some(backend) = lookup("NOTES_BACKEND") {
            match backend.trim().to_ascii_lowercase().as_str() {
                "remote" => config.backend = Backend::Remote,
                "local" => config.backend = Backend::Local,
                other => {
                    tracing::warn!(value = %other, "Unknown NOTES_BACKEND, using remote")
                }
            }
        }

        config.remote.url = lookup("SUPABASE_URL").and_then(|raw| endpoint_or_warn("SUPABASE_URL", &raw));
        config.remote.anon_key = non_empty(lookup("SUPABASE_ANON_KEY"));

        if let Some(raw) = lookup("GEMINI_ENDPOINT") {
            if let Some(url) = endpoint_or_warn("GEMINI_ENDPOINT", &raw) {
                config.summarizer.endpoint = url;
            }
        }
        config.summarizer.api_key = non_empty(lookup("GEMINI_API_KEY"));

        if let Some(path) = non_empty(lookup("NOTES_DB_PATH")) {
            config.db_path = PathBuf::from(path);
        }

        config.session_secret = non_empty(lookup("NOTES_SESSION_SECRET")).map(String::into_bytes);

        if let Some(raw) = lookup("NOTES_SITE_URL") {
            match Url::parse(raw.trim()) {
                Ok(url) => config.site_url = url,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Invalid NOTES_SITE_URL, using default"),
            }
        }

        if let Some(val) = lookup("NOTES_COOKIE_SECURE") {
            config.cookie_secure = val != "false" && val != "0";
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn endpoint_or_warn(name: &str, raw: &str) -> Option<Url> {
    match validate_endpoint(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(variable = name, value = %raw, error = %e, "Ignoring invalid endpoint");
            None
        }
    }
}

// ============================================================================
// Endpoint Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Only HTTPS URLs are allowed for non-loopback hosts")]
    NotHttps,
    #[error("URL has no host")]
    MissingHost,
}

/// Parse a collaborator endpoint. Credentials are sent to these URLs, so
/// plain HTTP is only accepted for loopback hosts.
pub fn validate_endpoint(raw: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(raw.trim()).map_err(|e| EndpointError::InvalidUrl(e.to_string()))?;

    let host = url.host().ok_or(EndpointError::MissingHost)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&host) => Ok(url),
        _ => Err(EndpointError::NotHttps),
    }
}

fn is_loopback(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => *domain == "localhost",
        Host::Ipv4(ip) => IpAddr::V4(*ip).is_loopback(),
        Host::Ipv6(ip) => IpAddr::V6(*ip).is_loopback(),
    }
}
