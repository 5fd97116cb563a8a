//! JSON output: leaf tokens with their text, plus the relevance score.

use super::registry::{FormatError, Formatter};
use crate::token::{Scope, TokenKind, Tokenized};
use serde::Serialize;

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct JsonDocument<'a> {
    relevance: u32,
    illegal: Option<usize>,
    tokens: Vec<JsonToken<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonToken<'a> {
    start: usize,
    end: usize,
    scope: Option<&'a Scope>,
    kind: TokenKind,
    text: &'a str,
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&self, tokenized: &Tokenized, source: &str) -> Result<String, FormatError> {
        let document = JsonDocument {
            relevance: tokenized.relevance(),
            illegal: tokenized.illegal(),
            tokens: tokenized
                .tokens()
                .map(|token| JsonToken {
                    start: token.start,
                    end: token.end,
                    scope: token.scope.as_ref(),
                    kind: token.kind,
                    text: token.text(source),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| FormatError::SerializationError(e.to_string()))
    }

    fn description(&self) -> &str {
        "Leaf tokens and relevance as JSON"
    }
}
