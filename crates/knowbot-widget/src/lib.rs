//! Knowbot widget crate - embeddable chat widget HTML.
//!
//! The widget is a single self-contained HTML page with its CSS and
//! JavaScript inlined. Templates are embedded at compile time via
//! `include_str!` and filled per request.
//!
//! # Modules
//!
//! - [`color`]: hex colour validation and shading
//! - [`render`]: widget options and template rendering
//!
//! # Usage
//!
//! ```rust,ignore
//! use knowbot_widget::{render_widget, WidgetOptions};
//!
//! async fn widget_handler(id: SessionId, Query(opts): Query<WidgetOptions>) -> Html<String> {
//!     Html(render_widget(&id, &opts))
//! }
//! ```

pub mod color;
pub mod render;

pub use color::{adjust_color, parse_hex_color};
pub use render::{render_widget, WidgetMode, WidgetOptions};
