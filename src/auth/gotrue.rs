//! Hosted auth provider speaking the GoTrue REST API (`/auth/v1/...`).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::AuthProvider;
use crate::config::RemoteConfig;
use crate::error::AuthError;
use crate::models::{Session, SignUpOutcome, User};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            access_token: self.access_token,
            user: self.user,
        }
    }
}

/// GoTrue reports errors under several different field names.
#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct GoTrueAuth {
    client: Client,
    base: Option<Url>,
    api_key: Option<String>,
}

impl GoTrueAuth {
    pub fn new(client: Client, config: &RemoteConfig) -> Self {
        Self {
            client,
            base: config.url.clone(),
            api_key: config.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<(Url, &str), AuthError> {
        match (&self.base, &self.api_key) {
            (Some(base), Some(key)) => {
                let url = base
                    .join(path)
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                Ok((url, key.as_str()))
            }
            _ => Err(AuthError::NotConfigured),
        }
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, AuthError> {
        let (url, key) = self.endpoint(path)?;
        Ok(self.client.post(url).header("apikey", key))
    }
}

async fn rejected(response: Response) -> AuthError {
    let status = response.status();
    let body: GoTrueErrorBody = response.json().await.unwrap_or_default();
    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| format!("Auth request failed with status {}", status.as_u16()));
    AuthError::Rejected(message)
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let (url, key) = self.endpoint("auth/v1/user")?;
        let response = self
            .client
            .get(url)
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let user: User = response.json().await?;
                Ok(Some(Session {
                    access_token: token.to_string(),
                    user,
                    expires_at: None,
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(rejected(response).await),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .post("auth/v1/token?grant_type=password")?
            .json(&serde_json::json!({ "email": email.trim(), "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .post("auth/v1/signup")?
            .json(&serde_json::json!({ "email": email.trim(), "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        // With email confirmation enabled the body is a bare user, no tokens.
        let body: serde_json::Value = response.json().await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            Ok(SignUpOutcome::SignedIn(token.into_session()))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    fn oauth_authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, AuthError> {
        let (mut url, _) = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        let response = self
            .post("auth/v1/token?grant_type=pkce")?
            .json(&serde_json::json!({ "auth_code": code, "code_verifier": code_verifier }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session())
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let response = self
            .post("auth/v1/logout")?
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            // The token is already dead, which is what signing out wants.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(rejected(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    async fn spawn_mock(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    fn auth_for(url: Url) -> GoTrueAuth {
        GoTrueAuth::new(
            Client::new(),
            &RemoteConfig {
                url: Some(url),
                anon_key: Some("anon".to_string()),
            },
        )
    }

    fn mock_router() -> Router {
        Router::new()
            .route(
                "/auth/v1/user",
                get(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("Bearer good") => {
                            Json(serde_json::json!({"id": "user-1", "email": "a@example.com"}))
                                .into_response()
                        }
                        _ => (AxumStatus::UNAUTHORIZED, "invalid JWT").into_response(),
                    }
                }),
            )
            .route(
                "/auth/v1/token",
                post(|Json(body): Json<serde_json::Value>| async move {
                    let pkce_ok =
                        body["auth_code"] == "code-1" && body["code_verifier"] == "verifier-1";
                    if body["password"] == "correct-horse" || pkce_ok {
                        Json(serde_json::json!({
                            "access_token": "good",
                            "token_type": "bearer",
                            "expires_in": 3600,
                            "refresh_token": "r",
                            "user": {"id": "user-1", "email": "a@example.com"}
                        }))
                        .into_response()
                    } else {
                        (
                            AxumStatus::BAD_REQUEST,
                            Json(serde_json::json!({
                                "error": "invalid_grant",
                                "error_description": "Invalid login credentials"
                            })),
                        )
                            .into_response()
                    }
                }),
            )
            .route(
                "/auth/v1/logout",
                post(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("Bearer good") => AxumStatus::NO_CONTENT.into_response(),
                        _ => (
                            AxumStatus::UNAUTHORIZED,
                            Json(serde_json::json!({"msg": "invalid JWT"})),
                        )
                            .into_response(),
                    }
                }),
            )
            .route(
                "/auth/v1/signup",
                post(|| async {
                    Json(serde_json::json!({
                        "id": "user-2",
                        "email": "new@example.com",
                        "confirmation_sent_at": "2024-01-01T00:00:00Z"
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_calls() {
        let auth = GoTrueAuth::new(Client::new(), &RemoteConfig::default());
        assert!(matches!(
            auth.get_session("anything").await,
            Err(AuthError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_get_session_resolves_or_returns_none() {
        let auth = auth_for(spawn_mock(mock_router()).await);

        let session = auth.get_session("good").await.unwrap().unwrap();
        assert_eq!(session.user.id, "user-1");
        assert!(auth.get_session("expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let auth = auth_for(spawn_mock(mock_router()).await);

        let session = auth
            .sign_in_with_password("a@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(session.access_token, "good");
        assert!(session.expires_at.is_some());

        let err = auth
            .sign_in_with_password("a@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_sign_up_requiring_confirmation() {
        let auth = auth_for(spawn_mock(mock_router()).await);
        let outcome = auth.sign_up("new@example.com", "password").await.unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired));
    }

    #[test]
    fn test_oauth_url_carries_pkce_challenge() {
        let auth = auth_for(Url::parse("https://project.supabase.co").unwrap());
        let url = auth
            .oauth_authorize_url("google", "http://127.0.0.1:3000/auth/callback", "abc123")
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&("code_challenge".into(), "abc123".into())));
        assert!(pairs.contains(&("code_challenge_method".into(), "s256".into())));
    }

    #[tokio::test]
    async fn test_exchange_code_returns_session() {
        let auth = auth_for(spawn_mock(mock_router()).await);

        let session = auth.exchange_code("code-1", "verifier-1").await.unwrap();
        assert_eq!(session.access_token, "good");
        assert_eq!(session.user.id, "user-1");
        assert!(session.expires_at.is_some());

        let err = auth.exchange_code("code-1", "wrong-verifier").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_sign_out_accepts_dead_token() {
        let auth = auth_for(spawn_mock(mock_router()).await);

        auth.sign_out("good").await.unwrap();
        auth.sign_out("expired").await.unwrap();
    }
}
