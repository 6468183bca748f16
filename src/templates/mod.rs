//! HTML templates and styling for the notes application.
//!
//! ## Module Structure
//!
//! - `styles` - CSS constants and theme definitions
//! - `components` - Shared HTML components (nav bar, banners, base template)
//! - `pages` - Landing, auth, dashboard and note editing pages

mod components;
mod pages;
mod styles;

pub use components::{base_html, error_banner, html_escape, nav_bar};
pub use pages::{
    auth_page, dashboard_page, landing_page, note_edit_page, not_found_page, AuthPageKind,
    NoteFormValues,
};
