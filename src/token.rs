//! Scanner output: classified leaf tokens and the mode events around them.
//!
//! Event Stream
//!
//!     A tokenization call produces an ordered list of [Event]s. Leaf tokens carry the text
//!     of the buffer; `Enter` and `Exit` events bracket the regions of the modes that were
//!     active. Concatenating the leaf tokens in order reconstructs the input exactly, and the
//!     enter/exit events are always well nested, including for modes still open at the end
//!     of the input (they get an `Exit` with [Closure::EndOfInput]).
//!
//!     Each `Exit` is the mode's own region token: it carries the span from the region start
//!     to the region end, so callers that only want the region view can use
//!     [Tokenized::regions] and ignore the rest.

use crate::grammar::ModeId;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// A semantic category such as `keyword`, `string` or `title.function`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(Arc<str>);

impl Scope {
    pub fn new(name: &str) -> Self {
        Scope(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first dotted segment: `title` for `title.function`.
    pub fn root(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Plain text inside the active mode
    Text,
    /// An identifier classified by a keyword table
    Keyword,
    /// A begin or end lexeme carrying its own scope
    Delimiter,
}

/// A classified, non-empty span of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub scope: Option<Scope>,
    pub kind: TokenKind,
}

impl Token {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span()]
    }

    pub fn scope_name(&self) -> Option<&str> {
        self.scope.as_ref().map(Scope::as_str)
    }
}

/// Why a region ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Closure {
    /// The mode's own end pattern matched, or the mode ends right after its begin
    Matched,
    /// An ancestor's end matched while this mode was open (`ends_with_parent`)
    WithParent,
    /// A child marked `ends_parent` closed
    ByChild,
    /// The input ran out
    EndOfInput,
    /// An illegal sequence stopped the scan under [IllegalPolicy::PlainRemainder](crate::scanner::IllegalPolicy)
    Illegal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Enter {
        mode: ModeId,
        scope: Option<Scope>,
        offset: usize,
    },
    Token(Token),
    Exit {
        mode: ModeId,
        scope: Option<Scope>,
        span: Range<usize>,
        closure: Closure,
    },
}

/// A closed mode region, as reported by an `Exit` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region<'a> {
    pub mode: ModeId,
    pub scope: Option<&'a Scope>,
    pub span: Range<usize>,
    pub closure: Closure,
}

impl Region<'_> {
    pub fn scope_name(&self) -> Option<&str> {
        self.scope.map(Scope::as_str)
    }
}

/// The result of one tokenization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub(crate) events: Vec<Event>,
    pub(crate) relevance: u32,
    pub(crate) illegal: Option<usize>,
}

impl Tokenized {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Leaf tokens in input order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.events.iter().filter_map(|event| match event {
            Event::Token(token) => Some(token),
            _ => None,
        })
    }

    /// Closed regions, in the order they closed (innermost first).
    pub fn regions(&self) -> impl Iterator<Item = Region<'_>> {
        self.events.iter().filter_map(|event| match event {
            Event::Exit {
                mode,
                scope,
                span,
                closure,
            } => Some(Region {
                mode: *mode,
                scope: scope.as_ref(),
                span: span.clone(),
                closure: *closure,
            }),
            _ => None,
        })
    }

    pub fn relevance(&self) -> u32 {
        self.relevance
    }

    /// Offset of the illegal sequence that ended a lenient scan.
    pub fn illegal(&self) -> Option<usize> {
        self.illegal
    }

    /// Concatenates the leaf tokens back into text.
    pub fn reconstruct(&self, source: &str) -> String {
        self.tokens().map(|token| token.text(source)).collect()
    }
}
