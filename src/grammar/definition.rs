//! Grammar definition schema, as read from YAML or JSON grammar files.
//!
//!     These types mirror the files one to one and carry no behavior. [GrammarDef] is
//!     compiled into a [Grammar](super::Grammar) by [Grammar::compile](super::Grammar::compile);
//!     everything that can be wrong with a definition beyond its shape is reported there.

use crate::pattern::PatternDef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    /// Default keyword table, used by every mode without its own.
    #[serde(default)]
    pub keywords: Option<KeywordsDef>,
    /// Grammar-level illegal pattern, checked at every depth.
    #[serde(default)]
    pub illegal: Option<PatternDef>,
    /// Named pattern fragments, spliced with `{{name}}`.
    #[serde(default)]
    pub patterns: IndexMap<String, PatternDef>,
    /// Named modes, referenced from `contains` lists with `ref: name`.
    #[serde(default)]
    pub modes: IndexMap<String, ModeDef>,
    #[serde(default)]
    pub contains: Vec<ContainsDef>,
    /// Renames applied to every scope and keyword category.
    #[serde(default)]
    pub scope_aliases: IndexMap<String, String>,
}

/// A keyword table: either a plain word list (category `keyword`) or categories by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordsDef {
    Words(String),
    Table(KeywordTableDef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordTableDef {
    /// Identifier pattern used to pick keyword candidates out of plain text.
    #[serde(rename = "$pattern", default)]
    pub pattern: Option<String>,
    #[serde(flatten)]
    pub categories: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainsDef {
    Ref(ModeRefDef),
    Inline(Box<ModeDef>),
}

/// `ref: name` points at a named mode; `ref: self` at the mode holding the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeRefDef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeDef {
    #[serde(alias = "className")]
    pub scope: Option<String>,
    pub begin: Option<PatternDef>,
    pub end: Option<PatternDef>,
    /// Begin pattern of a mode that ends right after it.
    #[serde(rename = "match")]
    pub match_: Option<PatternDef>,
    pub begin_keywords: Option<String>,
    pub keywords: Option<KeywordsDef>,
    pub relevance: Option<u32>,
    pub illegal: Option<PatternDef>,
    #[serde(default)]
    pub contains: Vec<ContainsDef>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
    pub begin_scope: Option<String>,
    pub end_scope: Option<String>,
    #[serde(default)]
    pub exclude_begin: bool,
    #[serde(default)]
    pub exclude_end: bool,
    #[serde(default)]
    pub return_end: bool,
    #[serde(default)]
    pub ends_with_parent: bool,
    #[serde(default)]
    pub ends_parent: bool,
    /// Let a child begin win over this mode's end at the same offset.
    #[serde(default)]
    pub prefer_continuation: bool,
}

/// One alternative begin/end pair of a mode. Missing fields fall back to the mode's own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDef {
    pub begin: Option<PatternDef>,
    pub end: Option<PatternDef>,
    #[serde(rename = "match")]
    pub match_: Option<PatternDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_definition() {
        let source = r#"
name: Tiny
aliases: [tiny]
case_insensitive: true
keywords:
  $pattern: '\.?\w+'
  keyword: begin end
  literal: true false
modes:
  string:
    scope: string
    begin: "'"
    end: "'"
contains:
  - ref: string
  - className: number
    match: '\d+'
  - begin: '#'
    variants:
      - end: '#'
      - match: '#!'
"#;
        let def: GrammarDef = serde_yaml::from_str(source).unwrap();
        assert_eq!(def.name, "Tiny");
        assert!(def.case_insensitive);

        let Some(KeywordsDef::Table(table)) = &def.keywords else {
            panic!("expected a keyword table");
        };
        assert_eq!(table.pattern.as_deref(), Some(r"\.?\w+"));
        assert_eq!(
            table.categories.keys().collect::<Vec<_>>(),
            vec!["keyword", "literal"]
        );

        assert_eq!(def.contains.len(), 3);
        assert!(matches!(&def.contains[0], ContainsDef::Ref(r) if r.name == "string"));
        let ContainsDef::Inline(number) = &def.contains[1] else {
            panic!("expected an inline mode");
        };
        assert_eq!(number.scope.as_deref(), Some("number"));
        assert!(number.match_.is_some());

        let ContainsDef::Inline(hash) = &def.contains[2] else {
            panic!("expected an inline mode");
        };
        assert_eq!(hash.variants.len(), 2);
    }

    #[test]
    fn test_plain_word_keywords() {
        let def: ModeDef = serde_yaml::from_str("keywords: 'procedure|10 method'").unwrap();
        assert_eq!(
            def.keywords,
            Some(KeywordsDef::Words("procedure|10 method".to_string()))
        );
    }

    #[test]
    fn test_pattern_combinators() {
        let def: ModeDef =
            serde_yaml::from_str("begin: { concat: ['# *', { either: ['a', 'b'] }] }").unwrap();
        assert_eq!(
            def.begin,
            Some(PatternDef::Concat {
                concat: vec![
                    "# *".into(),
                    PatternDef::Either {
                        either: vec!["a".into(), "b".into()]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<ModeDef>("begn: 'x'").is_err());
        assert!(serde_yaml::from_str::<ContainsDef>("{ ref: a, scope: b }").is_err());
    }
}
