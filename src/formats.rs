//! Output formats for tokenized text
//!
//! This module renders a [Tokenized](crate::token::Tokenized) result together with the
//! source it came from:
//! - `html`: nested `<span class="hljs-...">` markup
//! - `ansi`: terminal colors
//! - `json`: the leaf tokens and the relevance score
//! - `tokens`: one debug line per leaf token

pub mod ansi;
pub mod html;
pub mod json;
pub mod registry;
pub mod tokens;

pub use ansi::AnsiFormatter;
pub use html::{class_name, HtmlFormatter};
pub use json::JsonFormatter;
pub use registry::{FormatError, FormatRegistry, Formatter};
pub use tokens::TokensFormatter;
