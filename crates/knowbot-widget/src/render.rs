//! Widget options and template rendering.

use knowbot_chat::sanitize_html;
use knowbot_core::SessionId;
use serde::Deserialize;

use crate::color::{adjust_color, format_hex_color, parse_hex_color};

pub const DEFAULT_COLOR: &str = "#007bff";
pub const DEFAULT_NAME: &str = "Asistente";
pub const DEFAULT_ICON: &str = "💬";

/// Hover shade relative to the primary colour, in percent.
const HOVER_SHADE: f64 = -20.0;

const BUBBLE_HTML: &str = include_str!("../assets/bubble.html");
const IFRAME_HTML: &str = include_str!("../assets/iframe.html");
const WIDGET_CSS: &str = include_str!("../assets/widget.css");
const WIDGET_JS: &str = include_str!("../assets/widget.js");

/// How the widget is embedded in the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetMode {
    /// Floating launcher bubble that opens a chat panel.
    #[default]
    Bubble,
    /// Full-page chat meant to be loaded inside an `<iframe>`.
    Iframe,
}

impl WidgetMode {
    /// Parse a mode name. Anything other than `iframe` is a bubble.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("iframe") {
            WidgetMode::Iframe
        } else {
            WidgetMode::Bubble
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetMode::Bubble => "bubble",
            WidgetMode::Iframe => "iframe",
        }
    }
}

/// Customisation options, as received in the widget URL's query string.
///
/// Every field is optional and invalid values fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetOptions {
    pub color: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub mode: Option<String>,
}

impl WidgetOptions {
    /// Primary colour as `#rrggbb`, or the default when missing or invalid.
    pub fn primary_color(&self) -> String {
        self.color
            .as_deref()
            .and_then(parse_hex_color)
            .map(format_hex_color)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }

    /// Escaped bot name.
    pub fn bot_name(&self) -> String {
        text_or_default(self.name.as_deref(), DEFAULT_NAME)
    }

    /// Escaped launcher icon.
    pub fn bubble_icon(&self) -> String {
        text_or_default(self.icon.as_deref(), DEFAULT_ICON)
    }

    pub fn mode(&self) -> WidgetMode {
        self.mode.as_deref().map(WidgetMode::parse).unwrap_or_default()
    }
}

fn text_or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(|v| sanitize_html(v).trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Render the widget page for `session_id`.
pub fn render_widget(session_id: &SessionId, options: &WidgetOptions) -> String {
    let mode = options.mode();
    let primary = options.primary_color();
    let hover = adjust_color(&primary, HOVER_SHADE).unwrap_or_else(|| primary.clone());
    let shell = match mode {
        WidgetMode::Bubble => BUBBLE_HTML,
        WidgetMode::Iframe => IFRAME_HTML,
    };

    let page = shell
        .replacen("{{STYLES}}", WIDGET_CSS, 1)
        .replacen("{{SCRIPT}}", WIDGET_JS, 1);

    let chatbot_id = js_string_content(session_id.as_str());
    let bot_name = options.bot_name();
    let bubble_icon = options.bubble_icon();

    tracing::debug!(session_id = %session_id, mode = mode.as_str(), "Rendering widget");

    fill_placeholders(&page, |key| match key {
        "PRIMARY_COLOR" => Some(primary.as_str()),
        "HOVER_COLOR" => Some(hover.as_str()),
        "CHATBOT_ID" => Some(chatbot_id.as_str()),
        "MODE" => Some(mode.as_str()),
        "BOT_NAME" => Some(bot_name.as_str()),
        "BUBBLE_ICON" => Some(bubble_icon.as_str()),
        _ => None,
    })
}

/// Replace every `{{KEY}}` in one pass. Substituted values are never
/// rescanned; unknown keys are left as they are.
fn fill_placeholders<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => match lookup(&after[..end]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Keep only characters that are inert inside a single-quoted JS string.
fn js_string_content(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SessionId {
        SessionId::from("0123456789abcdef0123456789abcdef")
    }

    fn options(color: Option<&str>, name: Option<&str>, icon: Option<&str>, mode: Option<&str>) -> WidgetOptions {
        WidgetOptions {
            color: color.map(String::from),
            name: name.map(String::from),
            icon: icon.map(String::from),
            mode: mode.map(String::from),
        }
    }

    #[test]
    fn test_defaults() {
        let opts = WidgetOptions::default();
        assert_eq!(opts.primary_color(), DEFAULT_COLOR);
        assert_eq!(opts.bot_name(), DEFAULT_NAME);
        assert_eq!(opts.bubble_icon(), DEFAULT_ICON);
        assert_eq!(opts.mode(), WidgetMode::Bubble);
    }

    #[test]
    fn test_invalid_color_falls_back() {
        let opts = options(Some("red;}</style><script>"), None, None, None);
        assert_eq!(opts.primary_color(), DEFAULT_COLOR);
    }

    #[test]
    fn test_color_without_hash_accepted() {
        let opts = options(Some("FF5252"), None, None, None);
        assert_eq!(opts.primary_color(), "#ff5252");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(WidgetMode::parse("iframe"), WidgetMode::Iframe);
        assert_eq!(WidgetMode::parse("IFRAME"), WidgetMode::Iframe);
        assert_eq!(WidgetMode::parse("bubble"), WidgetMode::Bubble);
        assert_eq!(WidgetMode::parse("popup"), WidgetMode::Bubble);
    }

    #[test]
    fn test_options_deserialize_from_query_json() {
        let opts: WidgetOptions =
            serde_json::from_str(r##"{"color":"#112233","mode":"iframe"}"##).unwrap();
        assert_eq!(opts.primary_color(), "#112233");
        assert_eq!(opts.mode(), WidgetMode::Iframe);
        assert!(opts.name.is_none());
    }

    #[test]
    fn test_bubble_render_contains_everything() {
        let html = render_widget(&id(), &WidgetOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("class=\"mode-bubble\""));
        assert!(html.contains("id=\"chat-bubble\""));
        assert!(html.contains("background: #007bff;"));
        assert!(html.contains("background: #0062cc;"));
        assert!(html.contains("const CHATBOT_ID = '0123456789abcdef0123456789abcdef';"));
        assert!(html.contains("const MODE = 'bubble';"));
        assert!(html.contains("'/api/chat/' + CHATBOT_ID"));
        assert!(html.contains("'/api/reset/' + CHATBOT_ID"));
        assert!(html.contains("<div id=\"chat-title\">Asistente</div>"));
        assert!(html.contains("💬"));
        assert!(!html.contains("{{"), "unfilled placeholder left in output");
    }

    #[test]
    fn test_iframe_render() {
        let opts = options(Some("#112233"), Some("Soporte"), None, Some("iframe"));
        let html = render_widget(&id(), &opts);
        assert!(html.contains("class=\"mode-iframe\""));
        assert!(!html.contains("id=\"chat-bubble\""));
        assert!(html.contains("const MODE = 'iframe';"));
        assert!(html.contains("<div id=\"chat-title\">Soporte</div>"));
        assert!(html.contains("background: #112233;"));
    }

    #[test]
    fn test_name_and_icon_are_escaped() {
        let opts = options(
            None,
            Some("<img src=x onerror=alert(1)>Bot & Co"),
            Some("<script>alert(1)</script>🤖"),
            None,
        );
        let html = render_widget(&id(), &opts);
        assert!(html.contains("<div id=\"chat-title\">Bot &amp; Co</div>"));
        assert!(html.contains("🤖"));
        assert!(!html.contains("onerror"));
        assert!(!html.contains("alert(1)"));
    }

    #[test]
    fn test_markup_only_name_falls_back() {
        let opts = options(None, Some("<b></b>"), None, None);
        assert_eq!(opts.bot_name(), DEFAULT_NAME);
    }

    #[test]
    fn test_placeholders_in_user_values_are_not_expanded() {
        let opts = options(None, Some("{{CHATBOT_ID}}"), None, None);
        let html = render_widget(&id(), &opts);
        assert!(html.contains("<div id=\"chat-title\">{{CHATBOT_ID}}</div>"));
    }

    #[test]
    fn test_fill_placeholders_unknown_and_unterminated() {
        let out = fill_placeholders("a {{X}} {{Y}} {{open", |k| (k == "X").then_some("1"));
        assert_eq!(out, "a 1 {{Y}} {{open");
    }

    #[test]
    fn test_js_string_content_strips_quotes() {
        assert_eq!(js_string_content("ab'c);alert(1)//"), "abcalert1");
    }
}
