//! Grammars
//!
//!     A [Grammar] is the compiled, immutable form of a grammar definition: the mode arena,
//!     the default keyword table and identifier pattern, and the grammar-level illegal
//!     pattern (held by the root mode). It is `Send + Sync` and meant to be compiled once and
//!     shared behind an `Arc` (see [Registry](crate::registry::Registry)).
//!
//! Loading
//!
//!     Definitions are YAML or JSON documents matching [GrammarDef]:
//!
//!         name: Oxygene
//!         case_insensitive: true
//!         keywords: { keyword: 'and begin end ...' }
//!         modes:
//!           string: { scope: string, begin: "'", end: "'" }
//!         contains:
//!           - ref: string
//!
//!     Anything wrong with a definition rejects the whole grammar with
//!     [Error::MalformedGrammar](crate::error::Error::MalformedGrammar).
//!
//! Effective Keywords
//!
//!     A mode without its own `keywords` uses the grammar's default table. A mode that wants
//!     no keyword classification at all (strings, comments) declares `keywords: {}`. The
//!     identifier pattern that picks keyword candidates out of plain text is the mode table's
//!     `$pattern`, else the grammar table's, else `\w+`.

pub mod builtin;
pub(crate) mod compile;
pub mod definition;
pub mod keywords;
pub mod mode;

use crate::error::Result;
use crate::scanner::{self, TokenizeOptions};
use crate::token::Tokenized;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

pub use definition::GrammarDef;
pub use keywords::{Keyword, KeywordTable};
pub use mode::{End, Mode, ModeFlags, ModeId, Variant};

static DEFAULT_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+").expect("valid identifier regex"));

#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    aliases: Vec<String>,
    case_insensitive: bool,
    modes: Vec<Mode>,
    keywords: KeywordTable,
}

impl Grammar {
    pub fn compile(def: &GrammarDef) -> Result<Self> {
        let compiled = compile::GrammarCompiler::new(def).compile()?;
        debug!(
            grammar = %def.name,
            modes = compiled.modes.len(),
            keywords = compiled.keywords.len(),
            "compiled grammar"
        );
        Ok(Self {
            name: def.name.clone(),
            aliases: def.aliases.clone(),
            case_insensitive: def.case_insensitive,
            modes: compiled.modes,
            keywords: compiled.keywords,
        })
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        let def: GrammarDef = serde_yaml::from_str(source)?;
        Self::compile(&def)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let def: GrammarDef = serde_json::from_str(source)?;
        Self::compile(&def)
    }

    /// Loads a grammar file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&source),
            _ => Self::from_yaml(&source),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn root(&self) -> &Mode {
        &self.modes[ModeId::ROOT.0]
    }

    pub fn mode(&self, id: ModeId) -> &Mode {
        &self.modes[id.0]
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    /// A mode declared under `modes:`, by its key.
    pub fn named_mode(&self, name: &str) -> Option<&Mode> {
        self.modes.iter().find(|mode| mode.name() == Some(name))
    }

    /// The grammar-level illegal pattern.
    pub fn illegal(&self) -> Option<&crate::pattern::Matcher> {
        self.root().illegal()
    }

    /// The default keyword table.
    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    /// Keyword table and identifier pattern in effect inside `mode`.
    pub fn effective_keywords<'a>(&'a self, mode: &'a Mode) -> (&'a KeywordTable, &'a Regex) {
        let table = mode.keywords().unwrap_or(&self.keywords);
        let identifier = table
            .pattern()
            .or_else(|| self.keywords.pattern())
            .unwrap_or(&*DEFAULT_IDENTIFIER);
        (table, identifier)
    }

    pub fn tokenize(&self, text: &str) -> Result<Tokenized> {
        scanner::tokenize(self, text)
    }

    pub fn tokenize_with(&self, text: &str, options: &TokenizeOptions) -> Result<Tokenized> {
        scanner::tokenize_with(self, text, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn reason(result: Result<Grammar>) -> String {
        match result {
            Err(Error::MalformedGrammar { reason, .. }) => reason,
            other => panic!("expected a malformed grammar, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_arena_with_cycles() {
        let grammar = Grammar::from_yaml(
            r#"
name: Nest
modes:
  block:
    scope: block
    begin: '\{'
    end: '\}'
    contains:
      - ref: self
      - ref: inner
  inner:
    begin: '\('
    end: '\)'
    contains:
      - ref: block
contains:
  - ref: block
"#,
        )
        .unwrap();

        let block = grammar.named_mode("block").unwrap();
        let inner = grammar.named_mode("inner").unwrap();
        assert_eq!(block.contains(), &[block.id(), inner.id()]);
        assert_eq!(inner.contains(), &[block.id()]);
        assert_eq!(grammar.root().contains(), &[block.id()]);
        assert!(grammar.root().is_root());
    }

    #[test]
    fn test_mode_defaults() {
        let grammar = Grammar::from_yaml(
            r#"
name: Defaults
contains:
  - scope: number
    match: '\d+'
  - begin: '\('
    end: '\)'
  - scope: meta
    relevance: 5
    begin: '#'
    ends_with_parent: true
"#,
        )
        .unwrap();

        let contains = grammar.root().contains();
        let number = grammar.mode(contains[0]);
        assert_eq!(number.relevance(), 1);
        assert!(matches!(number.variants()[0].end(), End::Immediate));

        let group = grammar.mode(contains[1]);
        assert_eq!(group.relevance(), 0);
        assert!(matches!(group.variants()[0].end(), End::Pattern(_)));

        let meta = grammar.mode(contains[2]);
        assert_eq!(meta.relevance(), 5);
        assert!(matches!(meta.variants()[0].end(), End::Open));
    }

    #[test]
    fn test_variants_inherit_mode_fields() {
        let grammar = Grammar::from_yaml(
            r#"
name: Variants
contains:
  - scope: string
    end: '"'
    variants:
      - begin: '"'
      - begin: 'r"'
      - match: "'.'"
"#,
        )
        .unwrap();

        let string = grammar.mode(grammar.root().contains()[0]);
        let variants = string.variants();
        assert_eq!(variants.len(), 3);
        assert!(matches!(variants[0].end(), End::Pattern(_)));
        assert!(matches!(variants[1].end(), End::Pattern(_)));
        assert!(matches!(variants[2].end(), End::Immediate));
    }

    #[test]
    fn test_begin_keywords_seed_keyword_table() {
        let grammar = Grammar::from_yaml(
            r#"
name: Decl
case_insensitive: true
contains:
  - scope: function
    begin_keywords: 'procedure function'
    end: ';'
"#,
        )
        .unwrap();

        let function = grammar.mode(grammar.root().contains()[0]);
        let table = function.keywords().unwrap();
        assert_eq!(table.lookup("PROCEDURE").unwrap().category.as_str(), "keyword");
    }

    #[test]
    fn test_scope_aliases() {
        let grammar = Grammar::from_yaml(
            r#"
name: Aliased
scope_aliases: { label: symbol }
keywords: { label: 'here there' }
contains:
  - scope: label
    match: '^\w+:'
"#,
        )
        .unwrap();

        let label = grammar.mode(grammar.root().contains()[0]);
        assert_eq!(label.scope().unwrap().as_str(), "symbol");
        assert_eq!(
            grammar.keywords().lookup("here").unwrap().category.as_str(),
            "symbol"
        );
    }

    #[test]
    fn test_effective_keywords() {
        let grammar = Grammar::from_yaml(
            r#"
name: Effective
keywords:
  $pattern: '[a-z.]+'
  keyword: 'begin end'
contains:
  - scope: string
    begin: "'"
    end: "'"
    keywords: {}
  - begin: '\('
    end: '\)'
"#,
        )
        .unwrap();

        let contains = grammar.root().contains();
        let (table, identifier) = grammar.effective_keywords(grammar.mode(contains[0]));
        assert!(table.is_empty());
        assert_eq!(identifier.as_str(), "[a-z.]+");

        let (table, _) = grammar.effective_keywords(grammar.mode(contains[1]));
        assert!(table.lookup("begin").is_some());

        let detached = grammar.mode(contains[0]).clone();
        let (table, _) = grammar.effective_keywords(&detached);
        assert!(table.is_empty());

        let plain = Grammar::from_yaml("name: Plain").unwrap();
        let (_, identifier) = plain.effective_keywords(plain.root());
        assert_eq!(identifier.as_str(), r"\w+");
    }

    #[test]
    fn test_malformed_definitions() {
        assert!(reason(Grammar::from_yaml("name: ''")).contains("no name"));
        assert!(reason(Grammar::from_yaml(
            "name: X\ncontains:\n  - ref: missing"
        ))
        .contains("unknown mode reference `missing`"));
        assert!(reason(Grammar::from_yaml(
            "name: X\ncontains:\n  - end: 'x'"
        ))
        .contains("neither a begin pattern nor a scope"));
        assert!(reason(Grammar::from_yaml(
            "name: X\ncontains:\n  - { match: 'a', end: 'b' }"
        ))
        .contains("cannot be combined"));
        assert!(reason(Grammar::from_yaml(
            "name: X\ncontains:\n  - ref: self"
        ))
        .contains("only valid inside a mode"));
        assert!(reason(Grammar::from_yaml(
            "name: X\nkeywords: 'end|high'"
        ))
        .contains("invalid keyword weight"));
        assert!(reason(Grammar::from_yaml(
            "name: X\nmodes:\n  unused: { begin: '(' }"
        ))
        .contains("unclosed group"));
    }

    #[test]
    fn test_yaml_shape_errors() {
        assert!(matches!(
            Grammar::from_yaml("name: X\ncontains: 3"),
            Err(Error::Yaml(_))
        ));
        assert!(matches!(Grammar::from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_json_definition() {
        let grammar = Grammar::from_json(
            r#"{ "name": "J", "keywords": "let", "contains": [{ "scope": "number", "match": "\\d+" }] }"#,
        )
        .unwrap();
        assert_eq!(grammar.name(), "J");
        assert_eq!(grammar.modes().len(), 2);
    }
}
