//! examkit-report — exam statistics pages and review sheets.

pub mod html;
pub mod text;

pub use html::{generate_html, write_html_report};
pub use text::{format_duration, render_review};
