//! Grammar registry and language detection.
//!
//!     A [Registry] owns compiled grammars as `Arc<Grammar>` and looks them up by name or
//!     alias, case-insensitively. Registration is where a grammar becomes active: a name or
//!     alias clash rejects the newcomer and leaves the registry as it was.
//!
//!     [detect] tokenizes a text under several candidate grammars and ranks them by
//!     relevance. Candidates that hit an illegal sequence are out of the running; among the
//!     rest the highest relevance wins and ties go to the earlier candidate.

use crate::error::{Error, Result};
use crate::grammar::{builtin, Grammar};
use crate::scanner;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    grammars: Vec<Arc<Grammar>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the bundled grammars.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for grammar in builtin::all()? {
            registry.register(grammar)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, grammar: Grammar) -> Result<Arc<Grammar>> {
        for key in std::iter::once(grammar.name()).chain(grammar.aliases().iter().map(String::as_str)) {
            if let Some(existing) = self.get(key) {
                return Err(Error::malformed(
                    grammar.name(),
                    format!("`{}` is already registered by `{}`", key, existing.name()),
                ));
            }
        }

        debug!(grammar = grammar.name(), aliases = ?grammar.aliases(), "registered grammar");
        let grammar = Arc::new(grammar);
        self.grammars.push(Arc::clone(&grammar));
        Ok(grammar)
    }

    /// Loads and registers a grammar file (see [Grammar::from_path]).
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<Arc<Grammar>> {
        let grammar = Grammar::from_path(path)?;
        self.register(grammar)
    }

    /// Looks a grammar up by name or alias, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Arc<Grammar>> {
        self.grammars.iter().find(|grammar| {
            grammar.name().eq_ignore_ascii_case(name)
                || grammar
                    .aliases()
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(name))
        })
    }

    pub fn grammars(&self) -> &[Arc<Grammar>] {
        &self.grammars
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    /// Detection over every registered grammar, in registration order.
    pub fn detect(&self, text: &str) -> Option<Detection> {
        detect(self.grammars.iter().cloned(), text)
    }
}

/// One candidate's result.
#[derive(Debug, Clone)]
pub struct Score {
    pub grammar: Arc<Grammar>,
    pub relevance: u32,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub best: Score,
    pub second_best: Option<Score>,
    /// Every candidate that tokenized cleanly, in candidate order.
    pub scores: Vec<Score>,
}

impl Detection {
    pub fn language(&self) -> &str {
        self.best.grammar.name()
    }
}

/// Picks the candidate under which `text` scores highest.
pub fn detect<I>(candidates: I, text: &str) -> Option<Detection>
where
    I: IntoIterator<Item = Arc<Grammar>>,
{
    let mut scores = Vec::new();
    for grammar in candidates {
        match scanner::tokenize(&grammar, text) {
            Ok(tokenized) => scores.push(Score {
                relevance: tokenized.relevance(),
                grammar,
            }),
            Err(err) => debug!(grammar = grammar.name(), error = %err, "candidate disqualified"),
        }
    }

    let mut ranked: Vec<&Score> = scores.iter().collect();
    // stable: equal relevance keeps candidate order
    ranked.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    let best = ranked.first().map(|score| (*score).clone())?;
    let second_best = ranked.get(1).map(|score| (*score).clone());

    debug!(
        best = best.grammar.name(),
        relevance = best.relevance,
        candidates = scores.len(),
        "detected language"
    );
    Some(Detection {
        best,
        second_best,
        scores,
    })
}
