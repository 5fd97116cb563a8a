//! Compilation of a [GrammarDef] into the mode arena.
//!
//!     Named modes get their arena slot before their body is compiled, so a `ref:` that
//!     reaches back to a mode still being compiled resolves to its id and cycles terminate.
//!     Every named mode is compiled, referenced or not, so mistakes in unused modes still
//!     reject the grammar.

use super::definition::{ContainsDef, GrammarDef, KeywordsDef, ModeDef, VariantDef};
use super::keywords::KeywordTable;
use super::mode::{End, Mode, ModeFlags, ModeId, Variant};
use crate::error::{Error, Result};
use crate::pattern::{Matcher, PatternCompiler, PatternDef};
use crate::token::Scope;
use std::collections::HashMap;
use std::sync::Arc;

/// Begin pattern of a scoped mode that declares none: matches wherever the parent scans.
const IMPLICIT_BEGIN: &str = r"\B|\b";

pub(crate) struct Compiled {
    pub modes: Vec<Mode>,
    pub keywords: KeywordTable,
}

pub(crate) struct GrammarCompiler<'d> {
    def: &'d GrammarDef,
    patterns: PatternCompiler<'d>,
    slots: Vec<Option<Mode>>,
    named: HashMap<&'d str, ModeId>,
}

impl<'d> GrammarCompiler<'d> {
    pub fn new(def: &'d GrammarDef) -> Self {
        Self {
            def,
            patterns: PatternCompiler::new(&def.name, &def.patterns, def.case_insensitive),
            slots: Vec::new(),
            named: HashMap::new(),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(&self.def.name, reason)
    }

    pub fn compile(mut self) -> Result<Compiled> {
        let grammar = self.def;
        if grammar.name.trim().is_empty() {
            return Err(Error::malformed("<unnamed>", "grammar has no name"));
        }

        let root = self.alloc();
        let illegal = self.illegal(grammar.illegal.as_ref())?;
        let contains = self.contains(&grammar.contains, None)?;
        self.slots[root.0] = Some(Mode::root(contains, illegal));

        for name in grammar.modes.keys() {
            self.named_mode(name)?;
        }

        let keywords = match &grammar.keywords {
            Some(def) => self.keyword_table(def)?,
            None => KeywordTable::new(grammar.case_insensitive),
        };

        let modes = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    Error::malformed(&grammar.name, format!("mode #{index} was never compiled"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Compiled { modes, keywords })
    }

    fn alloc(&mut self) -> ModeId {
        self.slots.push(None);
        ModeId(self.slots.len() - 1)
    }

    fn scope(&self, name: &str) -> Scope {
        let aliased = self
            .def
            .scope_aliases
            .get(name)
            .map_or(name, String::as_str);
        Scope::new(aliased)
    }

    fn contains(&mut self, entries: &'d [ContainsDef], parent: Option<ModeId>) -> Result<Vec<ModeId>> {
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = match entry {
                ContainsDef::Ref(reference) if reference.name == "self" => parent
                    .ok_or_else(|| self.malformed("`ref: self` is only valid inside a mode"))?,
                ContainsDef::Ref(reference) => self.named_mode(&reference.name)?,
                ContainsDef::Inline(def) => {
                    let id = self.alloc();
                    self.mode(def, id, None)?;
                    id
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    fn named_mode(&mut self, name: &str) -> Result<ModeId> {
        if let Some(id) = self.named.get(name) {
            return Ok(*id);
        }
        let grammar = self.def;
        let Some((key, def)) = grammar.modes.get_key_value(name) else {
            return Err(self.malformed(format!("unknown mode reference `{name}`")));
        };

        let id = self.alloc();
        self.named.insert(key.as_str(), id);
        self.mode(def, id, Some(key))?;
        Ok(id)
    }

    fn mode(&mut self, def: &'d ModeDef, id: ModeId, name: Option<&str>) -> Result<()> {
        let label = name.unwrap_or("inline mode");
        let scope = def.scope.as_deref().map(|scope| self.scope(scope));

        let begin_forms = [
            def.begin.is_some(),
            def.match_.is_some(),
            def.begin_keywords.is_some(),
        ];
        if begin_forms.iter().filter(|declared| **declared).count() > 1 {
            return Err(self.malformed(format!(
                "{label} declares more than one of `begin`, `match` and `begin_keywords`"
            )));
        }
        if def.match_.is_some() && def.end.is_some() {
            return Err(self.malformed(format!("{label}: `match` cannot be combined with `end`")));
        }

        let begin = match (&def.begin_keywords, def.begin.as_ref().or(def.match_.as_ref())) {
            (Some(words), _) => Some(self.patterns.words(words.split_whitespace())?),
            (None, Some(pattern)) => Some(self.patterns.matcher(pattern)?),
            (None, None) => None,
        };

        let variants = if def.variants.is_empty() {
            let begin = match begin {
                Some(begin) => begin,
                None if scope.is_some() => self.patterns.matcher(&PatternDef::from(IMPLICIT_BEGIN))?,
                None => {
                    return Err(self.malformed(format!(
                        "{label} has neither a begin pattern nor a scope"
                    )))
                }
            };
            let end = self.end(def.end.as_ref(), def.match_.is_some(), def.ends_with_parent, &begin)?;
            vec![Variant { begin, end }]
        } else {
            def.variants
                .iter()
                .map(|variant| self.variant(def, variant, begin.as_ref(), label))
                .collect::<Result<Vec<_>>>()?
        };

        let mut keywords = def
            .keywords
            .as_ref()
            .map(|keywords| self.keyword_table(keywords))
            .transpose()?;
        if let (None, Some(words)) = (&keywords, &def.begin_keywords) {
            let mut table = KeywordTable::new(self.def.case_insensitive);
            table
                .add(&self.scope("keyword"), words)
                .map_err(|reason| self.malformed(reason))?;
            keywords = Some(table);
        }

        let contains = self.contains(&def.contains, Some(id))?;
        let illegal = self.illegal(def.illegal.as_ref())?;

        self.slots[id.0] = Some(Mode {
            id,
            name: name.map(str::to_string),
            relevance: def.relevance.unwrap_or(if scope.is_some() { 1 } else { 0 }),
            scope,
            begin_scope: def.begin_scope.as_deref().map(|scope| self.scope(scope)),
            end_scope: def.end_scope.as_deref().map(|scope| self.scope(scope)),
            variants,
            contains,
            keywords: keywords.map(Arc::new),
            illegal,
            flags: ModeFlags {
                exclude_begin: def.exclude_begin,
                exclude_end: def.exclude_end,
                return_end: def.return_end,
                ends_with_parent: def.ends_with_parent,
                ends_parent: def.ends_parent,
                prefer_continuation: def.prefer_continuation,
            },
        });
        Ok(())
    }

    /// Variant fields override the mode's own, field by field.
    fn variant(
        &self,
        mode: &ModeDef,
        variant: &VariantDef,
        inherited: Option<&Matcher>,
        label: &str,
    ) -> Result<Variant> {
        if variant.begin.is_some() && variant.match_.is_some() {
            return Err(self.malformed(format!(
                "{label}: a variant cannot declare both `begin` and `match`"
            )));
        }

        let (begin, is_match) = match variant.begin.as_ref().or(variant.match_.as_ref()) {
            Some(pattern) => (self.patterns.matcher(pattern)?, variant.match_.is_some()),
            None => match inherited {
                Some(begin) => (begin.clone(), mode.match_.is_some()),
                None => {
                    return Err(self.malformed(format!(
                        "{label}: variant has no begin pattern and the mode declares none"
                    )))
                }
            },
        };

        let end = variant.end.as_ref().or(mode.end.as_ref());
        if is_match && variant.end.is_some() {
            return Err(self.malformed(format!("{label}: `match` cannot be combined with `end`")));
        }
        let end = self.end(end, is_match, mode.ends_with_parent, &begin)?;
        Ok(Variant { begin, end })
    }

    fn end(
        &self,
        def: Option<&PatternDef>,
        is_match: bool,
        ends_with_parent: bool,
        begin: &Matcher,
    ) -> Result<End> {
        Ok(match def {
            _ if is_match => End::Immediate,
            Some(pattern) => End::Pattern(self.patterns.end(pattern, begin)?),
            None if ends_with_parent => End::Open,
            None => End::Immediate,
        })
    }

    fn illegal(&self, def: Option<&PatternDef>) -> Result<Option<Matcher>> {
        def.map(|pattern| self.patterns.matcher(pattern)).transpose()
    }

    fn keyword_table(&self, def: &KeywordsDef) -> Result<KeywordTable> {
        let mut table = KeywordTable::new(self.def.case_insensitive);
        match def {
            KeywordsDef::Words(words) => table
                .add(&self.scope("keyword"), words)
                .map_err(|reason| self.malformed(reason))?,
            KeywordsDef::Table(categories) => {
                if let Some(pattern) = &categories.pattern {
                    table.set_pattern(self.patterns.identifier(pattern)?);
                }
                for (category, words) in &categories.categories {
                    table
                        .add(&self.scope(category), words)
                        .map_err(|reason| self.malformed(reason))?;
                }
            }
        }
        Ok(table)
    }
}
