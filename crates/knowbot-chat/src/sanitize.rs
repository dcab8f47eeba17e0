//! HTML sanitization for user messages, model output, and widget options.
//!
//! Script and style elements are dropped together with their content, every
//! other tag is stripped, and the remaining text is escaped so it can be
//! inserted into markup safely.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|iframe|textarea)\b[^>]*>.*?</\s*(script|style|noscript|iframe|textarea)\s*>")
        .expect("Invalid script regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z!][^>]*>").expect("Invalid tag regex"));

/// Strip markup from `input` and escape what is left.
pub fn sanitize_html(input: &str) -> String {
    let without_blocks = SCRIPT_OR_STYLE.replace_all(input, "");
    let without_comments = COMMENT.replace_all(&without_blocks, "");
    let text = TAG.replace_all(&without_comments, "");
    html_escape::encode_text(&text).into_owned()
}
