//! Shared HTML components for the notes application.
//!
//! Contains the navigation bar, message banners and base HTML template.

use crate::models::Session;

use super::styles::STYLE;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ============================================================================
// Navigation Bar
// ============================================================================

pub fn nav_bar(session: Option<&Session>) -> String {
    let right = match session {
        Some(s) => format!(
            r#"<span class="user">{}</span>
            <form action="/logout" method="post"><button type="submit">Sign out</button></form>"#,
            html_escape(s.user.email.as_deref().unwrap_or("Signed in"))
        ),
        None => r#"<a href="/login">Login</a><a href="/signup">Sign up</a>"#.to_string(),
    };

    let dashboard_link = if session.is_some() {
        r#"<a href="/dashboard">Dashboard</a>"#
    } else {
        ""
    };

    format!(
        r#"<nav class="nav-bar">
            <a href="/" class="brand">Notes</a>
            {}
            <span class="spacer"></span>
            {}
        </nav>"#,
        dashboard_link, right
    )
}

pub fn error_banner(message: Option<&str>) -> String {
    match message {
        Some(m) => format!(r#"<div class="message error">{}</div>"#, html_escape(m)),
        None => String::new(),
    }
}

// ============================================================================
// Base HTML Template
// ============================================================================

pub fn base_html(title: &str, content: &str, session: Option<&Session>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
    {nav}
    <div class="container">
        {content}
    </div>
</body>
</html>"#,
        title = html_escape(title),
        style = STYLE,
        nav = nav_bar(session),
        content = content,
    )
}
