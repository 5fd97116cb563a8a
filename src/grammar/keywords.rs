//! Keyword Matcher
//!
//!     A keyword table maps spellings to a category (`keyword`, `built_in`, `literal`, ...)
//!     and a relevance weight. Tables are written as whitespace separated words; `word|N`
//!     gives the word weight N. Unannotated words weigh 1, except a handful of short words
//!     common to most languages, which weigh 0 so they classify without pulling detection
//!     toward any one grammar.
//!
//!     Matching is exact on the whole candidate. In case-insensitive grammars spellings are
//!     stored lowercased and candidates are lowercased before lookup.

use crate::token::Scope;
use regex::Regex;
use std::collections::HashMap;

/// Words that classify as keywords but do not count toward relevance unless annotated.
pub const COMMON_KEYWORDS: &[&str] = &[
    "of", "and", "for", "in", "not", "or", "if", "then", "parent", "list", "value",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub category: Scope,
    pub weight: u32,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: HashMap<String, Keyword>,
    pattern: Option<Regex>,
    case_insensitive: bool,
}

impl KeywordTable {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            entries: HashMap::new(),
            pattern: None,
            case_insensitive,
        }
    }

    /// Adds a whitespace separated word list under `category`. Later entries replace earlier
    /// ones with the same spelling.
    pub fn add(&mut self, category: &Scope, words: &str) -> Result<(), String> {
        for entry in words.split_whitespace() {
            let (word, weight) = match entry.split_once('|') {
                Some((word, weight)) => {
                    let weight = weight
                        .parse::<u32>()
                        .map_err(|_| format!("invalid keyword weight in `{entry}`"))?;
                    (word, weight)
                }
                None if COMMON_KEYWORDS.contains(&entry.to_lowercase().as_str()) => (entry, 0),
                None => (entry, 1),
            };
            if word.is_empty() {
                return Err(format!("keyword entry `{entry}` has no spelling"));
            }

            let key = if self.case_insensitive {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            self.entries.insert(
                key,
                Keyword {
                    category: category.clone(),
                    weight,
                },
            );
        }
        Ok(())
    }

    pub fn lookup(&self, word: &str) -> Option<&Keyword> {
        if self.case_insensitive {
            self.entries.get(&word.to_lowercase())
        } else {
            self.entries.get(word)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The table's own `$pattern`, if it declares one.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub(crate) fn set_pattern(&mut self, pattern: Regex) {
        self.pattern = Some(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(case_insensitive: bool, words: &str) -> KeywordTable {
        let mut table = KeywordTable::new(case_insensitive);
        table.add(&Scope::new("keyword"), words).unwrap();
        table
    }

    #[test]
    fn test_weights() {
        let table = table(false, "function constructor|10 of if|3");
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup("function").unwrap().weight, 1);
        assert_eq!(table.lookup("constructor").unwrap().weight, 10);
        assert_eq!(table.lookup("of").unwrap().weight, 0);
        assert_eq!(table.lookup("if").unwrap().weight, 3);
    }

    #[test]
    fn test_exact_match_only() {
        let table = table(false, "begin end");
        assert!(table.lookup("begin").is_some());
        assert!(table.lookup("beginning").is_none());
        assert!(table.lookup("beg").is_none());
        assert!(table.lookup("Begin").is_none());
    }

    #[test]
    fn test_case_folding() {
        let table = table(true, "Begin END");
        assert!(table.lookup("begin").is_some());
        assert!(table.lookup("BEGIN").is_some());
        assert!(table.lookup("End").is_some());
    }

    #[test]
    fn test_later_category_wins() {
        let mut table = KeywordTable::new(false);
        table.add(&Scope::new("keyword"), "true").unwrap();
        table.add(&Scope::new("literal"), "true").unwrap();
        assert_eq!(table.lookup("true").unwrap().category.as_str(), "literal");
    }

    #[test]
    fn test_invalid_entries() {
        let mut table = KeywordTable::new(false);
        assert!(table.add(&Scope::new("keyword"), "end|x").is_err());
        assert!(table.add(&Scope::new("keyword"), "|4").is_err());
    }
}
