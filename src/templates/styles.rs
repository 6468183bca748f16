//! CSS styles for the notes application.
//!
//! Contains the main STYLE constant with all CSS for the web interface.

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
/* Solarized Light Theme */
:root {
    --base01: #586e75;
    --base00: #657b83;
    --base0: #839496;
    --base1: #93a1a1;
    --base2: #eee8d5;
    --base3: #fdf6e3;

    --red: #dc322f;
    --blue: #268bd2;
    --cyan: #2aa198;
    --green: #859900;

    --bg: var(--base3);
    --fg: var(--base00);
    --muted: var(--base1);
    --border: var(--base2);
    --link: var(--blue);
    --link-hover: var(--cyan);
    --accent: var(--base2);
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: var(--fg);
    background: var(--bg);
}

.container {
    max-width: 900px;
    margin: 0 auto;
    padding: 1rem;
}

a { color: var(--link); text-decoration: none; }
a:hover { color: var(--link-hover); text-decoration: underline; }

h1, h2, h3 { font-weight: 600; margin-top: 1.5em; margin-bottom: 0.5em; }
h1 { font-size: 1.5rem; }

.nav-bar {
    position: sticky;
    top: 0;
    background: var(--bg);
    border-bottom: 1px solid var(--border);
    padding: 0.5rem 1rem;
    display: flex;
    gap: 1rem;
    align-items: center;
    z-index: 100;
}

.nav-bar a, .nav-bar button { font-size: 0.9rem; }
.nav-bar .brand { font-weight: 600; color: var(--base01); }
.nav-bar .spacer { flex: 1; }
.nav-bar .user { color: var(--muted); font-size: 0.85rem; }

.nav-bar button {
    background: none;
    border: none;
    color: var(--link);
    cursor: pointer;
    font-family: inherit;
}
.nav-bar button:hover { color: var(--link-hover); text-decoration: underline; }

.hero { text-align: center; padding: 3rem 1rem; }
.hero p { color: var(--muted); margin: 1rem 0 2rem; }
.features { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 1rem; }
.feature { border: 1px solid var(--border); border-radius: 6px; padding: 1rem; }
.feature h3 { margin-top: 0; font-size: 1rem; }

.note-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
.note-card {
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 1rem;
    display: flex;
    flex-direction: column;
    gap: 0.5rem;
}
.note-card h3 { margin: 0; font-size: 1rem; }
.note-card .content { white-space: pre-wrap; overflow: hidden; max-height: 6em; }
.note-card .summary { font-size: 0.85rem; background: var(--accent); padding: 0.5rem; border-radius: 4px; }
.note-card .meta { color: var(--muted); font-size: 0.8rem; }
.note-card .actions { display: flex; gap: 0.5rem; align-items: center; }
.note-card .actions form { display: inline; }

.empty-state { text-align: center; color: var(--muted); padding: 2rem; border: 1px dashed var(--base1); border-radius: 6px; }

.note-form, .login-form { display: flex; flex-direction: column; gap: 1rem; }
.login-form { max-width: 360px; margin: 3rem auto; }

.form-group { display: flex; flex-direction: column; gap: 0.25rem; }
.form-group label { font-weight: 500; font-size: 0.9rem; }
.form-group input, .form-group textarea {
    padding: 0.5rem 0.75rem;
    border: 1px solid var(--base1);
    border-radius: 4px;
    background: var(--bg);
    color: var(--fg);
    font-family: inherit;
    font-size: 0.95rem;
}
.form-group textarea { min-height: 8rem; resize: vertical; }
.form-actions { display: flex; gap: 0.5rem; align-items: center; }

.btn {
    padding: 0.5rem 1rem;
    background: var(--blue);
    color: var(--base3);
    border: 1px solid var(--blue);
    border-radius: 4px;
    cursor: pointer;
    font-size: 0.9rem;
}
.btn:hover { background: var(--cyan); border-color: var(--cyan); text-decoration: none; color: var(--base3); }
.btn:disabled { opacity: 0.6; cursor: wait; }
.btn.secondary { background: var(--base2); color: var(--base00); border-color: var(--base1); }
.btn.secondary:hover { background: var(--base3); }
.btn.danger { background: none; color: var(--red); border-color: var(--red); }

.divider { text-align: center; color: var(--muted); font-size: 0.85rem; }

.message {
    padding: 0.75rem 1rem;
    border-radius: 4px;
    margin-bottom: 1rem;
}
.message.error { background: #fdf2f2; color: var(--red); border: 1px solid var(--red); }
.message.success { background: #f5f9f5; color: var(--green); border: 1px solid var(--green); }

.back-link {
    display: inline-block;
    margin-bottom: 1rem;
    font-size: 0.9rem;
}
"#;
