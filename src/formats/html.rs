//! HTML rendering
//!
//!     Regions become nested `<span>` elements and keyword or delimiter tokens get a span
//!     of their own. Class names follow the `hljs-` convention: the first segment of a
//!     dotted scope is prefixed, later segments get one more trailing underscore each, so
//!     `title.function` renders as `hljs-title function_`.

use super::registry::{FormatError, Formatter};
use crate::token::{Event, Scope, TokenKind, Tokenized};

pub const CLASS_PREFIX: &str = "hljs-";

pub struct HtmlFormatter;

impl Formatter for HtmlFormatter {
    fn name(&self) -> &str {
        "html"
    }

    fn render(&self, tokenized: &Tokenized, source: &str) -> Result<String, FormatError> {
        Ok(to_html(tokenized, source))
    }

    fn description(&self) -> &str {
        "Nested <span> markup with hljs- class names"
    }
}

pub fn class_name(scope: &Scope) -> String {
    let mut segments = scope.as_str().split('.');
    let mut class = format!("{}{}", CLASS_PREFIX, segments.next().unwrap_or_default());
    for (i, segment) in segments.enumerate() {
        class.push(' ');
        class.push_str(segment);
        class.push_str(&"_".repeat(i + 1));
    }
    class
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn to_html(tokenized: &Tokenized, source: &str) -> String {
    let mut html = String::with_capacity(source.len() * 2);
    for event in tokenized.events() {
        match event {
            Event::Enter {
                scope: Some(scope), ..
            } => {
                html.push_str(&format!("<span class=\"{}\">", class_name(scope)));
            }
            Event::Exit { scope: Some(_), .. } => html.push_str("</span>"),
            Event::Token(token) => {
                let text = escape(token.text(source));
                match (&token.scope, token.kind) {
                    (Some(scope), TokenKind::Keyword | TokenKind::Delimiter) => html.push_str(
                        &format!("<span class=\"{}\">{}</span>", class_name(scope), text),
                    ),
                    _ => html.push_str(&text),
                }
            }
            _ => {}
        }
    }
    html
}
