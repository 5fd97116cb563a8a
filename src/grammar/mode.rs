//! Mode Graph
//!
//!     A compiled grammar is an arena of [Mode]s addressed by [ModeId]. `contains` edges are
//!     ids into the same arena, so a mode can contain itself or take part in a cycle without
//!     any shared ownership. Slot 0 is the synthetic root: it has no begin, never ends and
//!     holds the grammar's top-level `contains` list.

use super::keywords::KeywordTable;
use crate::pattern::{EndPattern, Matcher};
use crate::token::Scope;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModeId(pub(crate) usize);

impl ModeId {
    pub const ROOT: ModeId = ModeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a variant's region ends.
#[derive(Debug, Clone)]
pub enum End {
    Pattern(EndPattern),
    /// Right after the begin lexeme (`match:` modes and modes without an end)
    Immediate,
    /// Only when an ancestor ends or the input runs out
    Open,
}

/// One begin/end pair of a mode.
#[derive(Debug, Clone)]
pub struct Variant {
    pub(crate) begin: Matcher,
    pub(crate) end: End,
}

impl Variant {
    pub fn begin(&self) -> &Matcher {
        &self.begin
    }

    pub fn end(&self) -> &End {
        &self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_end: bool,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub prefer_continuation: bool,
}

#[derive(Debug, Clone)]
pub struct Mode {
    pub(crate) id: ModeId,
    pub(crate) name: Option<String>,
    pub(crate) scope: Option<Scope>,
    pub(crate) begin_scope: Option<Scope>,
    pub(crate) end_scope: Option<Scope>,
    pub(crate) variants: Vec<Variant>,
    pub(crate) contains: Vec<ModeId>,
    pub(crate) keywords: Option<Arc<KeywordTable>>,
    pub(crate) relevance: u32,
    pub(crate) illegal: Option<Matcher>,
    pub(crate) flags: ModeFlags,
}

impl Mode {
    pub(crate) fn root(contains: Vec<ModeId>, illegal: Option<Matcher>) -> Self {
        Self {
            id: ModeId::ROOT,
            name: None,
            scope: None,
            begin_scope: None,
            end_scope: None,
            variants: Vec::new(),
            contains,
            keywords: None,
            relevance: 0,
            illegal,
            flags: ModeFlags::default(),
        }
    }

    pub fn id(&self) -> ModeId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.id == ModeId::ROOT
    }

    /// The key under `modes:` this mode was declared with, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn begin_scope(&self) -> Option<&Scope> {
        self.begin_scope.as_ref()
    }

    pub fn end_scope(&self) -> Option<&Scope> {
        self.end_scope.as_ref()
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn contains(&self) -> &[ModeId] {
        &self.contains
    }

    /// The mode's own keyword table; `None` means the grammar default applies.
    pub fn keywords(&self) -> Option<&KeywordTable> {
        self.keywords.as_deref()
    }

    pub fn relevance(&self) -> u32 {
        self.relevance
    }

    pub fn illegal(&self) -> Option<&Matcher> {
        self.illegal.as_ref()
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }
}
