//! Page bodies: landing, sign-in/sign-up, dashboard and note editing.

use crate::models::{Note, Session};

use super::components::{base_html, error_banner, html_escape};

/// Field values shown in a note form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFormValues {
    pub title: String,
    pub content: String,
    pub summary: String,
}

impl From<&Note> for NoteFormValues {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            summary: note.summary.clone().unwrap_or_default(),
        }
    }
}

/// Fills the summary field from `/api/summarize`. Nothing is saved until the
/// form is submitted.
const SUMMARIZE_SCRIPT: &str = r#"<script>
async function summarizeNote(button) {
    const form = button.closest('form');
    const content = form.querySelector('[name=content]').value;
    const summary = form.querySelector('[name=summary]');
    const status = form.querySelector('.summary-status');
    status.textContent = '';
    status.className = 'summary-status';
    if (!content.trim()) {
        status.textContent = 'Please add some content before summarizing';
        status.className = 'summary-status message error';
        return;
    }
    button.disabled = true;
    summary.placeholder = 'Generating summary...';
    try {
        const res = await fetch('/api/summarize', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ text: content }),
        });
        const data = await res.json().catch(() => ({}));
        if (!res.ok || !data.summary) {
            throw new Error(data.error || 'Failed to summarize your note. Please try again.');
        }
        summary.value = data.summary;
    } catch (err) {
        status.textContent = err.message;
        status.className = 'summary-status message error';
    } finally {
        button.disabled = false;
        summary.placeholder = 'Summary will appear here...';
    }
}
</script>"#;

fn note_form(action: &str, values: &NoteFormValues, submit_label: &str, cancel_href: Option<&str>) -> String {
    let cancel = cancel_href
        .map(|href| format!(r#"<a class="btn secondary" href="{}">Cancel</a>"#, href))
        .unwrap_or_default();

    format!(
        r#"<form method="POST" action="{action}" class="note-form">
            <div class="form-group">
                <label for="title">Title</label>
                <input type="text" id="title" name="title" required placeholder="Note title" value="{title}">
            </div>
            <div class="form-group">
                <label for="content">Content</label>
                <textarea id="content" name="content" required placeholder="Write your note here...">{content}</textarea>
            </div>
            <div class="form-group">
                <label for="summary">Summary</label>
                <textarea id="summary" name="summary" placeholder="Summary will appear here...">{summary}</textarea>
                <div class="summary-status"></div>
            </div>
            <div class="form-actions">
                <button type="button" class="btn secondary" onclick="summarizeNote(this)">Summarize</button>
                <span class="spacer"></span>
                {cancel}
                <button type="submit" class="btn">{submit}</button>
            </div>
        </form>"#,
        action = html_escape(action),
        title = html_escape(&values.title),
        content = html_escape(&values.content),
        summary = html_escape(&values.summary),
        cancel = cancel,
        submit = submit_label,
    )
}

// ============================================================================
// Landing
// ============================================================================

pub fn landing_page(session: Option<&Session>) -> String {
    let cta = if session.is_some() {
        r#"<a class="btn" href="/dashboard">Go to dashboard</a>"#
    } else {
        r#"<a class="btn" href="/signup">Get started</a> <a class="btn secondary" href="/login">Sign in</a>"#
    };

    let body = format!(
        r#"<section class="hero">
            <h1>Notes, summarized</h1>
            <p>Write short notes and get a concise AI summary of any of them with one click.</p>
            {}
        </section>
        <section class="features">
            <div class="feature"><h3>Capture</h3><p>Create, edit and delete notes from a single dashboard.</p></div>
            <div class="feature"><h3>Summarize</h3><p>Generate a summary of up to 150 words, edit it, then save it with the note.</p></div>
            <div class="feature"><h3>Private</h3><p>Your notes are visible only to your account.</p></div>
        </section>"#,
        cta
    );

    base_html("Notes", &body, session)
}

// ============================================================================
// Sign In / Sign Up
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPageKind {
    Login,
    SignUp,
}

pub fn auth_page(
    kind: AuthPageKind,
    email: &str,
    error: Option<&str>,
    notice: Option<&str>,
    oauth_enabled: bool,
) -> String {
    let (title, action, submit, switch) = match kind {
        AuthPageKind::Login => (
            "Login",
            "/login",
            "Sign in",
            r#"Don't have an account? <a href="/signup">Sign up</a>"#,
        ),
        AuthPageKind::SignUp => (
            "Sign up",
            "/signup",
            "Create account",
            r#"Already have an account? <a href="/login">Sign in</a>"#,
        ),
    };

    let notice_html = notice
        .map(|n| format!(r#"<div class="message success">{}</div>"#, html_escape(n)))
        .unwrap_or_default();

    let oauth_html = if oauth_enabled {
        r#"<div class="divider">or</div>
           <a class="btn secondary" href="/auth/oauth/google">Continue with Google</a>"#
    } else {
        ""
    };

    let body = format!(
        r#"<div class="login-form">
            <h1>{title}</h1>
            {notice}
            {error}
            <form method="POST" action="{action}" class="login-form" style="margin: 0; max-width: none;">
                <div class="form-group">
                    <label for="email">Email</label>
                    <input type="email" id="email" name="email" placeholder="name@example.com" value="{email}" autofocus required>
                </div>
                <div class="form-group">
                    <label for="password">Password</label>
                    <input type="password" id="password" name="password" required>
                </div>
                <button type="submit" class="btn">{submit}</button>
            </form>
            {oauth}
            <p class="divider">{switch}</p>
        </div>"#,
        title = title,
        notice = notice_html,
        error = error_banner(error),
        action = action,
        email = html_escape(email),
        submit = submit,
        oauth = oauth_html,
        switch = switch,
    );

    base_html(title, &body, None)
}

// ============================================================================
// Dashboard
// ============================================================================

fn note_card(note: &Note) -> String {
    let summary = note
        .summary
        .as_deref()
        .map(|s| format!(r#"<div class="summary">{}</div>"#, html_escape(s)))
        .unwrap_or_default();

    format!(
        r#"<article class="note-card">
            <h3><a href="/dashboard/{id}">{title}</a></h3>
            <div class="content">{content}</div>
            {summary}
            <div class="meta">Updated {updated}</div>
            <div class="actions">
                <a class="btn secondary" href="/dashboard/{id}">Edit</a>
                <form method="POST" action="/dashboard/{id}/delete"
                      onsubmit="return confirm('This action cannot be undone. This will permanently delete your note.');">
                    <button type="submit" class="btn danger">Delete</button>
                </form>
            </div>
        </article>"#,
        id = urlencoding::encode(&note.id),
        title = html_escape(&note.title),
        content = html_escape(&note.content),
        summary = summary,
        updated = note.updated_at.format("%Y-%m-%d %H:%M"),
    )
}

pub fn dashboard_page(
    session: &Session,
    notes: &[Note],
    composer: &NoteFormValues,
    error: Option<&str>,
) -> String {
    let list_html = if notes.is_empty() {
        r#"<div class="empty-state"><p>No notes yet. Get started by creating your first note.</p></div>"#
            .to_string()
    } else {
        let cards: String = notes.iter().map(note_card).collect();
        format!(r#"<div class="note-grid">{}</div>"#, cards)
    };

    let body = format!(
        r#"<h1>Your notes</h1>
        {error}
        <h2>New note</h2>
        {form}
        <h2>All notes</h2>
        {list}
        {script}"#,
        error = error_banner(error),
        form = note_form("/dashboard/notes", composer, "Create note", None),
        list = list_html,
        script = SUMMARIZE_SCRIPT,
    );

    base_html("Dashboard", &body, Some(session))
}

// ============================================================================
// Note Editing
// ============================================================================

pub fn note_edit_page(
    session: &Session,
    id: &str,
    values: &NoteFormValues,
    error: Option<&str>,
) -> String {
    let action = format!("/dashboard/{}", urlencoding::encode(id));
    let body = format!(
        r#"<a href="/dashboard" class="back-link">&larr; Back to dashboard</a>
        <h1>Edit note</h1>
        {error}
        {form}
        {script}"#,
        error = error_banner(error),
        form = note_form(&action, values, "Update note", Some("/dashboard")),
        script = SUMMARIZE_SCRIPT,
    );

    base_html(&format!("Edit: {}", values.title), &body, Some(session))
}

pub fn not_found_page(session: Option<&Session>) -> String {
    let body = r#"<h1>Note not found</h1>
        <p>The note you're looking for doesn't exist or has been deleted.</p>
        <a href="/dashboard" class="back-link">&larr; Back to dashboard</a>"#;
    base_html("Not found", body, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;

    fn session() -> Session {
        Session {
            access_token: "t".into(),
            user: User {
                id: "u".into(),
                email: Some("a@example.com".into()),
            },
            expires_at: None,
        }
    }

    #[test]
    fn test_dashboard_escapes_note_fields() {
        let note = Note {
            id: "n1".into(),
            title: "<script>alert(1)</script>".into(),
            content: "a & b".into(),
            summary: Some("short".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let html = dashboard_page(&session(), &[note], &NoteFormValues::default(), None);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains(r#"action="/dashboard/n1/delete""#));
    }

    #[test]
    fn test_empty_dashboard_shows_empty_state() {
        let html = dashboard_page(&session(), &[], &NoteFormValues::default(), Some("Boom"));
        assert!(html.contains("No notes yet"));
        assert!(html.contains(r#"<div class="message error">Boom</div>"#));
    }

    #[test]
    fn test_auth_page_keeps_email_and_hides_oauth() {
        let html = auth_page(AuthPageKind::Login, "a@example.com", Some("Invalid"), None, false);
        assert!(html.contains(r#"value="a@example.com""#));
        assert!(html.contains("Invalid"));
        assert!(!html.contains("/auth/oauth/google"));

        let html = auth_page(AuthPageKind::SignUp, "", None, None, true);
        assert!(html.contains(r#"action="/signup""#));
        assert!(html.contains("/auth/oauth/google"));
    }
}
