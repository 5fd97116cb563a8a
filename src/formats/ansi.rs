//! Terminal output with crossterm colors, keyed on the first segment of each token's scope.

use super::registry::{FormatError, Formatter};
use crate::token::Tokenized;
use crossterm::style::{style, Color, Stylize};

pub struct AnsiFormatter;

impl Formatter for AnsiFormatter {
    fn name(&self) -> &str {
        "ansi"
    }

    fn render(&self, tokenized: &Tokenized, source: &str) -> Result<String, FormatError> {
        Ok(to_ansi(tokenized, source))
    }

    fn description(&self) -> &str {
        "ANSI colored terminal output"
    }
}

/// Color for a scope root, `None` for scopes rendered as plain text.
pub fn color(root: &str) -> Option<Color> {
    let color = match root {
        "keyword" | "built_in" | "type" => Color::Magenta,
        "string" | "regexp" => Color::Green,
        "number" | "literal" => Color::Cyan,
        "comment" | "doctag" => Color::DarkGrey,
        "title" | "section" => Color::Yellow,
        "meta" => Color::DarkYellow,
        "symbol" | "variable" => Color::Red,
        _ => return None,
    };
    Some(color)
}

pub fn to_ansi(tokenized: &Tokenized, source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 2);
    for token in tokenized.tokens() {
        let text = token.text(source);
        let styled = token
            .scope
            .as_ref()
            .and_then(|scope| color(scope.root()).map(|color| (scope.root(), color)));
        match styled {
            Some(("comment", color)) => out.push_str(&style(text).with(color).italic().to_string()),
            Some((_, color)) => out.push_str(&style(text).with(color).to_string()),
            None => out.push_str(text),
        }
    }
    out
}
