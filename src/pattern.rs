//! Pattern Compiler
//!
//!     Turns the pattern fragments of a grammar into matchers the scanner can run.
//!
//! Input Forms
//!
//!     A pattern is either a raw source string in `regex` syntax or a combinator:
//!
//!         begin: '\d{4}-\d{1,2}-\d{1,2}'
//!         begin: { concat: ['# *', { either: ['{{yyyy_mm_dd}}', '{{mm_dd_yyyy}}'] }, ' *#'] }
//!         begin: { caseless: 'rem' }
//!
//!     `{{name}}` splices the grammar's named fragment `name` (see `patterns:` in a grammar
//!     file). References are resolved recursively; a reference cycle or an unknown name makes
//!     the grammar malformed.
//!
//! Capture Groups
//!
//!     Fragments are authored independently, so their anonymous groups would otherwise shift
//!     each other's numbering once concatenated. Anonymous groups inside spliced fragments and
//!     combinator operands are rewritten to non-capturing groups. Named groups survive, and a
//!     raw top-level source keeps all of its groups: those are the groups an end pattern can
//!     refer to.
//!
//! End Patterns
//!
//!     An end pattern may reference its begin match with `\1` or `\k<name>` (heredoc style
//!     delimiters). Such an end compiles into an [EndTemplate]; the scanner instantiates it for
//!     each stack frame with the escaped text captured by that frame's begin match, so the
//!     compiled grammar itself never changes while scanning.
//!
//! Complexity
//!
//!     The regex engine matches in linear time, so there is no catastrophic backtracking to
//!     guard against at runtime. What remains is the size of the compiled program, which is
//!     capped at [PATTERN_SIZE_LIMIT]; larger patterns are rejected at compile time.

pub mod matcher;
pub(crate) mod source;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub use matcher::{EndTemplate, Matcher};
use matcher::{regex_reason, Follow, TemplatePiece};
use source::{FollowSource, Piece};

/// Upper bound on the compiled size of a single pattern, in bytes.
pub const PATTERN_SIZE_LIMIT: usize = 1 << 21;

/// A pattern as written in a grammar file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternDef {
    Source(String),
    Concat { concat: Vec<PatternDef> },
    Either { either: Vec<PatternDef> },
    Caseless { caseless: Box<PatternDef> },
}

impl From<&str> for PatternDef {
    fn from(source: &str) -> Self {
        PatternDef::Source(source.to_string())
    }
}

/// A compiled end pattern.
#[derive(Debug, Clone)]
pub enum EndPattern {
    Static(Matcher),
    Template(EndTemplate),
}

pub struct PatternCompiler<'g> {
    grammar: &'g str,
    fragments: &'g IndexMap<String, PatternDef>,
    case_insensitive: bool,
}

impl<'g> PatternCompiler<'g> {
    pub fn new(
        grammar: &'g str,
        fragments: &'g IndexMap<String, PatternDef>,
        case_insensitive: bool,
    ) -> Self {
        Self {
            grammar,
            fragments,
            case_insensitive,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.grammar, reason)
    }

    /// Source text of a pattern with references spliced and combinators applied.
    pub fn assemble(&self, def: &PatternDef) -> Result<String> {
        self.assemble_inner(def, true, &mut Vec::new())
    }

    fn assemble_inner(
        &self,
        def: &PatternDef,
        top_level: bool,
        trail: &mut Vec<String>,
    ) -> Result<String> {
        match def {
            PatternDef::Source(source) => {
                let spliced = self.splice(source, trail)?;
                if top_level {
                    Ok(spliced)
                } else {
                    source::anonymize(&spliced).map_err(|reason| self.malformed(reason))
                }
            }
            PatternDef::Concat { concat } => {
                if concat.is_empty() {
                    return Err(self.malformed("`concat` needs at least one operand"));
                }
                let mut joined = String::new();
                for operand in concat {
                    let part = self.assemble_inner(operand, false, trail)?;
                    let grouped =
                        source::needs_grouping(&part).map_err(|reason| self.malformed(reason))?;
                    if grouped {
                        joined.push_str(&format!("(?:{part})"));
                    } else {
                        joined.push_str(&part);
                    }
                }
                Ok(joined)
            }
            PatternDef::Either { either } => {
                if either.is_empty() {
                    return Err(self.malformed("`either` needs at least one operand"));
                }
                let mut alternatives = Vec::with_capacity(either.len());
                for operand in either {
                    let part = self.assemble_inner(operand, false, trail)?;
                    let grouped =
                        source::leaks_flags(&part).map_err(|reason| self.malformed(reason))?;
                    if grouped {
                        alternatives.push(format!("(?:{part})"));
                    } else {
                        alternatives.push(part);
                    }
                }
                Ok(format!("(?:{})", alternatives.join("|")))
            }
            PatternDef::Caseless { caseless } => Ok(format!(
                "(?i:{})",
                self.assemble_inner(caseless, top_level, trail)?
            )),
        }
    }

    fn splice(&self, source: &str, trail: &mut Vec<String>) -> Result<String> {
        let lexemes = source::lex(source).map_err(|reason| self.malformed(reason))?;
        let mut spliced = String::with_capacity(source.len());

        for lexeme in &lexemes {
            if lexeme.kind != Piece::Reference {
                spliced.push_str(lexeme.text);
                continue;
            }

            let name = lexeme.name();
            if trail.iter().any(|seen| seen == name) {
                return Err(self.malformed(format!(
                    "cyclic pattern reference: {} -> {}",
                    trail.join(" -> "),
                    name
                )));
            }
            let Some(fragment) = self.fragments.get(name) else {
                return Err(self.malformed(format!("unresolved pattern reference `{{{{{name}}}}}`")));
            };

            trail.push(name.to_string());
            let inner = self.assemble_inner(fragment, false, trail)?;
            trail.pop();

            spliced.push_str("(?:");
            spliced.push_str(&inner);
            spliced.push(')');
        }

        Ok(spliced)
    }

    /// Compiles a begin or illegal pattern.
    pub fn matcher(&self, def: &PatternDef) -> Result<Matcher> {
        let source = self.assemble(def)?;
        if source::has_backreference(&source).map_err(|reason| self.malformed(reason))? {
            return Err(self.malformed(format!(
                "backreferences are only supported in end patterns: `{source}`"
            )));
        }
        self.finish(&source)
    }

    /// Compiles an end pattern against the begin matcher it closes.
    pub fn end(&self, def: &PatternDef, begin: &Matcher) -> Result<EndPattern> {
        let source = self.assemble(def)?;
        if !source::has_backreference(&source).map_err(|reason| self.malformed(reason))? {
            return Ok(EndPattern::Static(self.finish(&source)?));
        }

        let lowered = source::lower_lookaheads(&source).map_err(|reason| self.malformed(reason))?;
        let pieces =
            source::template_pieces(&lowered.body).map_err(|reason| self.malformed(reason))?;

        for piece in &pieces {
            match piece {
                TemplatePiece::Group(index) if *index >= begin.captures_len() => {
                    return Err(self.malformed(format!(
                        "end pattern `{}` references group {} but begin pattern `{}` has {} groups",
                        source,
                        index,
                        begin.as_str(),
                        begin.captures_len() - 1
                    )));
                }
                TemplatePiece::Named(name) if !begin.group_names().any(|group| group == name) => {
                    return Err(self.malformed(format!(
                        "end pattern `{}` references group `{}` which begin pattern `{}` does not define",
                        source,
                        name,
                        begin.as_str()
                    )));
                }
                _ => {}
            }
        }

        let template = EndTemplate::new(
            pieces,
            self.follows(&lowered.follows)?,
            self.case_insensitive,
            PATTERN_SIZE_LIMIT,
        );
        template
            .instantiate(&Default::default())
            .map_err(|reason| self.malformed(reason))?;
        Ok(EndPattern::Template(template))
    }

    /// `begin_keywords`: any of `words` as a whole word not followed by `.`.
    pub fn words<'w>(&self, words: impl IntoIterator<Item = &'w str>) -> Result<Matcher> {
        let alternatives: Vec<String> = words.into_iter().map(regex::escape).collect();
        if alternatives.is_empty() {
            return Err(self.malformed("`begin_keywords` is empty"));
        }
        let regex = self.build(&format!(r"\b(?:{})\b", alternatives.join("|")))?;
        let not_dot = Follow::new(r"\.", true, self.case_insensitive, PATTERN_SIZE_LIMIT)
            .map_err(|reason| self.malformed(reason))?;
        self.matcher_with(regex, vec![not_dot])
    }

    /// Compiles an identifier (`$pattern`) regex. Lookaround is not available here.
    pub fn identifier(&self, source: &str) -> Result<Regex> {
        self.build(source)
    }

    fn finish(&self, source: &str) -> Result<Matcher> {
        let lowered = source::lower_lookaheads(source).map_err(|reason| self.malformed(reason))?;
        let regex = self.build(&lowered.body)?;
        self.matcher_with(regex, self.follows(&lowered.follows)?)
    }

    fn matcher_with(&self, regex: Regex, follows: Vec<Follow>) -> Result<Matcher> {
        let source = regex.as_str().to_string();
        Matcher::new(regex, follows, self.case_insensitive, PATTERN_SIZE_LIMIT)
            .map_err(|reason| self.malformed(format!("invalid pattern `{source}`: {reason}")))
    }

    fn follows(&self, follows: &[FollowSource]) -> Result<Vec<Follow>> {
        follows
            .iter()
            .map(|follow| {
                Follow::new(
                    &follow.source,
                    follow.negated,
                    self.case_insensitive,
                    PATTERN_SIZE_LIMIT,
                )
                .map_err(|reason| {
                    self.malformed(format!("invalid lookahead `{}`: {}", follow.source, reason))
                })
            })
            .collect()
    }

    fn build(&self, source: &str) -> Result<Regex> {
        RegexBuilder::new(source)
            .multi_line(true)
            .case_insensitive(self.case_insensitive)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| self.regex_error(source, e))
    }

    fn regex_error(&self, source: &str, error: regex::Error) -> Error {
        self.malformed(regex_reason(source, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(pairs: &[(&str, &str)]) -> IndexMap<String, PatternDef> {
        pairs
            .iter()
            .map(|(name, source)| (name.to_string(), PatternDef::from(*source)))
            .collect()
    }

    fn is_malformed(result: Result<impl std::fmt::Debug>, needle: &str) -> bool {
        match result {
            Err(Error::MalformedGrammar { reason, .. }) => reason.contains(needle),
            _ => false,
        }
    }

    #[test]
    fn test_references_are_spliced() {
        let table = fragments(&[("digits", r"\d+"), ("pair", r"{{digits}}-{{digits}}")]);
        let compiler = PatternCompiler::new("Test", &table, false);
        let source = compiler.assemble(&"#{{pair}}#".into()).unwrap();
        assert_eq!(source, r"#(?:(?:\d+)-(?:\d+))#");

        let matcher = compiler.matcher(&"#{{pair}}#".into()).unwrap();
        assert_eq!(matcher.find_at("x #12-3# y", 0, false), Some(2..8));
    }

    #[test]
    fn test_reference_cycles_are_rejected() {
        let table = fragments(&[("a", "x{{b}}"), ("b", "y{{a}}")]);
        let compiler = PatternCompiler::new("Test", &table, false);
        assert!(is_malformed(
            compiler.matcher(&"{{a}}".into()),
            "cyclic pattern reference: a -> b -> a"
        ));
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        assert!(is_malformed(
            compiler.matcher(&"{{missing}}".into()),
            "unresolved pattern reference `{{missing}}`"
        ));
    }

    #[test]
    fn test_concat_makes_operand_groups_non_capturing() {
        let table = fragments(&[("time", r"(\d|1[012])(:\d+){0,2} *(AM|PM)")]);
        let compiler = PatternCompiler::new("Test", &table, true);
        let def = PatternDef::Concat {
            concat: vec!["# *".into(), "{{time}}".into(), " *#".into()],
        };
        let matcher = compiler.matcher(&def).unwrap();
        assert_eq!(matcher.captures_len(), 1);
        assert_eq!(matcher.find_at("#10:30 pm#", 0, false), Some(0..10));
    }

    #[test]
    fn test_either_groups_alternatives() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        let def = PatternDef::Concat {
            concat: vec![
                "<".into(),
                PatternDef::Either {
                    either: vec!["a|b".into(), "c".into()],
                },
                ">".into(),
            ],
        };
        assert_eq!(compiler.assemble(&def).unwrap(), "<(?:a|b|c)>");
    }

    #[test]
    fn test_inline_flags_stay_inside_their_operand() {
        let table = fragments(&[("loose", "(?i)a")]);
        let compiler = PatternCompiler::new("Test", &table, false);

        let concat = PatternDef::Concat {
            concat: vec!["(?i)a".into(), "b".into()],
        };
        assert_eq!(compiler.assemble(&concat).unwrap(), "(?:(?i)a)b");
        let matcher = compiler.matcher(&concat).unwrap();
        assert_eq!(matcher.find_at("AB Ab", 0, false), Some(3..5));

        let either = PatternDef::Either {
            either: vec!["(?i)a".into(), "b".into()],
        };
        let matcher = compiler.matcher(&either).unwrap();
        assert_eq!(matcher.find_at("B A", 0, false), Some(2..3));

        let matcher = compiler.matcher(&"{{loose}}b".into()).unwrap();
        assert_eq!(matcher.find_at("AB", 0, false), None);
    }

    #[test]
    fn test_variable_width_lookahead_backs_off() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        let matcher = compiler.matcher(&"a+(?!b)".into()).unwrap();
        assert_eq!(matcher.find_at("aab", 0, false), Some(0..1));
    }

    #[test]
    fn test_caseless_operand() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        let def = PatternDef::Caseless {
            caseless: Box::new("rem".into()),
        };
        let matcher = compiler.matcher(&def).unwrap();
        assert_eq!(matcher.find_at("x REM y", 0, false), Some(2..5));
    }

    #[test]
    fn test_trailing_lookahead_becomes_follow_check() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, true);
        let matcher = compiler.matcher(&r"([\t ]|^)REM(?=\s)".into()).unwrap();
        assert_eq!(matcher.find_at("remark rem x", 0, false), Some(6..10));
    }

    #[test]
    fn test_backreference_outside_end_is_rejected() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        assert!(is_malformed(
            compiler.matcher(&r"(a)\1".into()),
            "only supported in end patterns"
        ));
    }

    #[test]
    fn test_end_template_checks_group_count() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        let begin = compiler.matcher(&r"<<(\w+)".into()).unwrap();

        let end = compiler.end(&r"^\1$".into(), &begin).unwrap();
        assert!(matches!(end, EndPattern::Template(_)));

        assert!(is_malformed(
            compiler.end(&r"^\2$".into(), &begin),
            "references group 2"
        ));
        assert!(is_malformed(
            compiler.end(&r"\k<tag>".into(), &begin),
            "does not define"
        ));
    }

    #[test]
    fn test_static_end() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        let begin = compiler.matcher(&"'".into()).unwrap();
        assert!(matches!(
            compiler.end(&"'".into(), &begin).unwrap(),
            EndPattern::Static(_)
        ));
    }

    #[test]
    fn test_begin_keywords_skip_member_access() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, true);
        let matcher = compiler.words(["procedure", "function"]).unwrap();
        assert_eq!(
            matcher.find_at("x.Function. FUNCTION f", 0, false),
            Some(12..20)
        );
        assert_eq!(matcher.find_at("functions", 0, false), None);
    }

    #[test]
    fn test_oversized_pattern_is_rejected() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        assert!(is_malformed(
            compiler.matcher(&r"(?:\w{1000}){1000}".into()),
            "too complex"
        ));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let table = IndexMap::new();
        let compiler = PatternCompiler::new("Test", &table, false);
        assert!(is_malformed(compiler.matcher(&"[a-".into()), "invalid pattern"));
    }
}
