//! Debug listing, one leaf token per line.

use super::registry::{FormatError, Formatter};
use crate::token::Tokenized;
use std::fmt::Write;

pub struct TokensFormatter;

impl Formatter for TokensFormatter {
    fn name(&self) -> &str {
        "tokens"
    }

    fn render(&self, tokenized: &Tokenized, source: &str) -> Result<String, FormatError> {
        let mut out = String::new();
        for token in tokenized.tokens() {
            writeln!(
                out,
                "{}..{} {} {:?} {:?}",
                token.start,
                token.end,
                token.scope_name().unwrap_or("-"),
                token.kind,
                token.text(source)
            )
            .map_err(|e| FormatError::SerializationError(e.to_string()))?;
        }
        Ok(out)
    }

    fn description(&self) -> &str {
        "One debug line per leaf token"
    }
}
