//! End-to-end tests of the router against the embedded sled backend and a
//! fake summarizer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use notes_summary::auth::{AuthProvider, LocalAuth};
use notes_summary::cache::ChangeNotifier;
use notes_summary::config::{AppConfig, Backend};
use notes_summary::models::SignUpOutcome;
use notes_summary::store::SledStore;
use notes_summary::{build_router, AppState, Note, NotesRepository, SummarizeError, Summarizer};

struct FakeSummarizer {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(summary) => Ok(summary.clone()),
            Err(message) => Err(SummarizeError::Upstream {
                status: 429,
                message: message.clone(),
            }),
        }
    }
}

struct TestApp {
    router: Router,
    auth: Arc<LocalAuth>,
    summarizer: Arc<FakeSummarizer>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_summarizer(Ok("A short summary.".to_string()))
    }

    fn with_summarizer(reply: Result<String, String>) -> Self {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let auth = Arc::new(LocalAuth::new(&db, Some(b"test-secret".to_vec())).unwrap());
        let store = SledStore::new(&db).unwrap();
        let notes = NotesRepository::new(Arc::new(store), ChangeNotifier::new());
        let summarizer = Arc::new(FakeSummarizer {
            reply,
            calls: AtomicUsize::new(0),
        });

        let config = AppConfig {
            backend: Backend::Local,
            cookie_secure: false,
            ..AppConfig::default()
        };
        let state = AppState::new(config, auth.clone(), notes, summarizer.clone());

        Self {
            router: build_router(Arc::new(state)),
            auth,
            summarizer,
        }
    }

    async fn sign_up(&self, email: &str) -> String {
        match self.auth.sign_up(email, "password123").await.unwrap() {
            SignUpOutcome::SignedIn(session) => session.access_token,
            SignUpOutcome::ConfirmationRequired => panic!("local sign-up should sign in"),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn cookie(token: &str) -> String {
    format!("notes_session={}", token)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, cookie(token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, cookie(token));
    }
    builder.body(Body::empty()).unwrap()
}

fn form(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, cookie(token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// ============================================================================
// Summarization
// ============================================================================

#[tokio::test]
async fn test_summarize_blank_text_is_rejected_without_upstream_call() {
    let app = TestApp::new();

    for body in [
        serde_json::json!({ "text": "" }),
        serde_json::json!({ "text": "   \n" }),
        serde_json::json!({}),
    ] {
        let response = app
            .send(json_request(Method::POST, "/api/summarize", None, body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Text content is required" })
        );
    }

    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_summarize_unparseable_body_counts_as_missing_text() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/summarize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Text content is required");
    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_summarize_returns_summary() {
    let app = TestApp::new();
    let response = app
        .send(json_request(
            Method::POST,
            "/api/summarize",
            None,
            serde_json::json!({ "text": "We need milk, eggs and bread." }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "summary": "A short summary." })
    );
    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_summarize_upstream_failure_surfaces_message() {
    let app = TestApp::with_summarizer(Err("Resource has been exhausted".to_string()));
    let response = app
        .send(json_request(
            Method::POST,
            "/api/summarize",
            None,
            serde_json::json!({ "text": "Some text" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Resource has been exhausted" })
    );
}

// ============================================================================
// Session Gate
// ============================================================================

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let app = TestApp::new();

    for uri in ["/dashboard", "/dashboard/some-id"] {
        let response = app.send(get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    let response = app.send(get("/dashboard", Some("forged.token"))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_auth_pages_redirect_signed_in_users() {
    let app = TestApp::new();
    let token = app.sign_up("gate@example.com").await;

    for uri in ["/login", "/signup"] {
        let response = app.send(get(uri, Some(&token))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    let response = app.send(get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_pages_pass_through() {
    let app = TestApp::new();
    let response = app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/signup"));
}

// ============================================================================
// Sign In / Sign Up / Sign Out
// ============================================================================

#[tokio::test]
async fn test_signup_form_sets_session_cookie() {
    let app = TestApp::new();
    let response = app
        .send(form("/signup", None, "email=new%40example.com&password=secret1"))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("notes_session="));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_login_form_validation_is_inline() {
    let app = TestApp::new();
    let response = app
        .send(form("/login", None, "email=not-an-email&password=secret1"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let html = body_string(response).await;
    assert!(html.contains("Please enter a valid email address"));
    assert!(html.contains(r#"value="not-an-email""#));
}

#[tokio::test]
async fn test_login_with_wrong_password_shows_error() {
    let app = TestApp::new();
    app.sign_up("user@example.com").await;

    let response = app
        .send(form("/login", None, "email=user%40example.com&password=wrong-password"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Invalid login credentials"));

    let response = app
        .send(form("/login", None, "email=user%40example.com&password=password123"))
        .await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = TestApp::new();
    let token = app.sign_up("bye@example.com").await;

    let response = app.send(form("/logout", Some(&token), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    let response = app.send(get("/dashboard", Some(&token))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_oauth_unsupported_on_local_backend() {
    let app = TestApp::new();
    let response = app.send(get("/auth/oauth/google", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login?error="));
}

// ============================================================================
// Notes API
// ============================================================================

#[tokio::test]
async fn test_api_create_without_session_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .send(json_request(
            Method::POST,
            "/api/notes",
            None,
            serde_json::json!({ "title": "Groceries", "content": "milk, eggs" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Authentication required to create notes" })
    );
}

#[tokio::test]
async fn test_api_validation_errors() {
    let app = TestApp::new();
    let token = app.sign_up("valid@example.com").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/notes",
            Some(&token),
            serde_json::json!({ "title": "  ", "content": "milk" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Title is required");

    let response = app
        .send(json_request(
            Method::POST,
            "/api/notes",
            Some(&token),
            serde_json::json!({ "title": "Groceries" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Content is required");
}

#[tokio::test]
async fn test_api_note_lifecycle() {
    let app = TestApp::new();
    let token = app.sign_up("crud@example.com").await;

    // Warm the list cache so the create has something to invalidate.
    let response = app.send(get("/api/notes", Some(&token))).await;
    assert_eq!(body_json(response).await, serde_json::json!([]));

    let response = app
        .send(json_request(
            Method::POST,
            "/api/notes",
            Some(&token),
            serde_json::json!({ "title": "Groceries", "content": "milk, eggs" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Note = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(created.title, "Groceries");
    assert_eq!(created.summary, None);

    let response = app.send(get("/api/notes", Some(&token))).await;
    let listed: Vec<Note> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(listed, vec![created.clone()]);

    let uri = format!("/api/notes/{}", created.id);
    let response = app.send(get(&uri, Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(json_request(
            Method::PUT,
            &uri,
            Some(&token),
            serde_json::json!({
                "title": "Groceries",
                "content": "milk, eggs, bread",
                "summary": "Buy milk, eggs and bread."
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Note = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(updated.updated_at > created.updated_at);

    let response = app.send(get(&uri, Some(&token))).await;
    let fetched: Note = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(fetched.content, "milk, eggs, bread");
    assert_eq!(fetched.summary.as_deref(), Some("Buy milk, eggs and bread."));

    let response = app
        .send(json_request(Method::DELETE, &uri, Some(&token), serde_json::json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.send(get(&uri, Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Note not found");

    let response = app.send(get("/api/notes", Some(&token))).await;
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_api_notes_are_private_to_their_owner() {
    let app = TestApp::new();
    let alice = app.sign_up("alice@example.com").await;
    let bob = app.sign_up("bob@example.com").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/notes",
            Some(&alice),
            serde_json::json!({ "title": "Secret", "content": "alice only" }),
        ))
        .await;
    let created: Note = serde_json::from_str(&body_string(response).await).unwrap();

    let response = app
        .send(get(&format!("/api/notes/{}", created.id), Some(&bob)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/api/notes", Some(&bob))).await;
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

// ============================================================================
// Dashboard Forms
// ============================================================================

#[tokio::test]
async fn test_dashboard_create_edit_and_delete() {
    let app = TestApp::new();
    let token = app.sign_up("dash@example.com").await;

    let response = app.send(get("/dashboard", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("No notes yet"));

    let response = app
        .send(form(
            "/dashboard/notes",
            Some(&token),
            "title=Groceries&content=milk%2C+eggs&summary=",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let response = app.send(get("/api/notes", Some(&token))).await;
    let notes: Vec<Note> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(notes.len(), 1);
    let id = notes[0].id.clone();

    let html = body_string(app.send(get("/dashboard", Some(&token))).await).await;
    assert!(html.contains("Groceries"));
    assert!(!html.contains("No notes yet"));

    let edit_uri = format!("/dashboard/{}", id);
    let html = body_string(app.send(get(&edit_uri, Some(&token))).await).await;
    assert!(html.contains("milk, eggs"));

    let response = app
        .send(form(
            &edit_uri,
            Some(&token),
            "title=Shopping&content=milk%2C+eggs&summary=Dairy+run",
        ))
        .await;
    assert_eq!(location(&response), "/dashboard");
    let html = body_string(app.send(get("/dashboard", Some(&token))).await).await;
    assert!(html.contains("Shopping"));
    assert!(html.contains("Dairy run"));

    let response = app
        .send(form(&format!("/dashboard/{}/delete", id), Some(&token), ""))
        .await;
    assert_eq!(location(&response), "/dashboard");
    let response = app.send(get(&edit_uri, Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_create_validation_keeps_input() {
    let app = TestApp::new();
    let token = app.sign_up("keep@example.com").await;

    let response = app
        .send(form(
            "/dashboard/notes",
            Some(&token),
            "title=&content=draft+body&summary=",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await;
    assert!(html.contains("Title is required"));
    assert!(html.contains("draft body"));

    let response = app.send(get("/api/notes", Some(&token))).await;
    assert_eq!(body_json(response).await, serde_json::json!([]));
}
