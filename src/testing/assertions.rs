//! Fluent assertions over a tokenization result

use crate::token::{Closure, Event, Region, Token, TokenKind, Tokenized};
use std::ops::Range;

pub fn assert_tokens<'a>(tokenized: &'a Tokenized, source: &'a str) -> TokenizedAssertion<'a> {
    TokenizedAssertion {
        tokenized,
        source,
        context: "tokens".to_string(),
    }
}

pub struct TokenizedAssertion<'a> {
    tokenized: &'a Tokenized,
    source: &'a str,
    context: String,
}

impl<'a> TokenizedAssertion<'a> {
    fn leaves(&self) -> Vec<&'a Token> {
        self.tokenized.tokens().collect()
    }

    fn summary(&self) -> String {
        self.leaves()
            .iter()
            .map(|token| format!("{:?}:{}", token.text(self.source), token.scope_name().unwrap_or("-")))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Leaf tokens concatenate to the source.
    pub fn covers_input(self) -> Self {
        let rebuilt = self.tokenized.reconstruct(self.source);
        assert_eq!(
            rebuilt, self.source,
            "{}: leaf tokens do not reconstruct the input",
            self.context
        );
        let mut offset = 0;
        for token in self.leaves() {
            assert_eq!(
                token.start, offset,
                "{}: gap or overlap before token {:?}",
                self.context, token
            );
            assert!(token.end > token.start, "{}: empty token {:?}", self.context, token);
            offset = token.end;
        }
        self
    }

    /// Every `Enter` has a matching `Exit`, in stack order.
    pub fn well_nested(self) -> Self {
        let mut open = Vec::new();
        for event in self.tokenized.events() {
            match event {
                Event::Enter { mode, .. } => open.push(*mode),
                Event::Exit { mode, .. } => {
                    let top = open.pop();
                    assert_eq!(
                        top,
                        Some(*mode),
                        "{}: exit of {:?} does not match the open region",
                        self.context,
                        mode
                    );
                }
                Event::Token(_) => {}
            }
        }
        assert!(
            open.is_empty(),
            "{}: regions left open: {:?}",
            self.context,
            open
        );
        self
    }

    pub fn leaf_count(self, expected: usize) -> Self {
        let actual = self.leaves().len();
        assert_eq!(
            actual,
            expected,
            "{}: Expected {} leaf tokens, found {} ({})",
            self.context,
            expected,
            actual,
            self.summary()
        );
        self
    }

    pub fn leaf<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(LeafAssertion<'a>) -> LeafAssertion<'a>,
    {
        let leaves = self.leaves();
        assert!(
            index < leaves.len(),
            "{}: Leaf index {} out of bounds ({} leaves: {})",
            self.context,
            index,
            leaves.len(),
            self.summary()
        );
        assertion(LeafAssertion {
            token: leaves[index],
            source: self.source,
            context: format!("{}:leaf[{}]", self.context, index),
        });
        self
    }

    /// Asserts on the first leaf whose text is exactly `text`.
    pub fn leaf_text<F>(self, text: &str, assertion: F) -> Self
    where
        F: FnOnce(LeafAssertion<'a>) -> LeafAssertion<'a>,
    {
        let token = self
            .leaves()
            .into_iter()
            .find(|token| token.text(self.source) == text)
            .unwrap_or_else(|| {
                panic!(
                    "{}: no leaf with text {:?} ({})",
                    self.context,
                    text,
                    self.summary()
                )
            });
        assertion(LeafAssertion {
            token,
            source: self.source,
            context: format!("{}:leaf({:?})", self.context, text),
        });
        self
    }

    /// Every leaf whose text is `text` has `scope`.
    pub fn every_leaf_text(self, text: &str, scope: &str) -> Self {
        let mut seen = 0;
        for token in self.leaves() {
            if token.text(self.source) == text {
                seen += 1;
                assert_eq!(
                    token.scope_name(),
                    Some(scope),
                    "{}: leaf {:?} at {} has the wrong scope",
                    self.context,
                    text,
                    token.start
                );
            }
        }
        assert!(seen > 0, "{}: no leaf with text {:?}", self.context, text);
        self
    }

    /// Asserts on the first closed region with scope `scope`.
    pub fn region<F>(self, scope: &str, assertion: F) -> Self
    where
        F: FnOnce(RegionAssertion<'a>) -> RegionAssertion<'a>,
    {
        let region = self
            .tokenized
            .regions()
            .find(|region| region.scope_name() == Some(scope))
            .unwrap_or_else(|| panic!("{}: no region with scope {:?}", self.context, scope));
        assertion(RegionAssertion {
            region,
            source: self.source,
            context: format!("{}:region({})", self.context, scope),
        });
        self
    }

    pub fn region_count(self, scope: &str, expected: usize) -> Self {
        let actual = self
            .tokenized
            .regions()
            .filter(|region| region.scope_name() == Some(scope))
            .count();
        assert_eq!(
            actual, expected,
            "{}: Expected {} {:?} regions, found {}",
            self.context, expected, scope, actual
        );
        self
    }

    pub fn no_region(self, scope: &str) -> Self {
        self.region_count(scope, 0)
    }

    pub fn relevance(self, expected: u32) -> Self {
        assert_eq!(
            self.tokenized.relevance(),
            expected,
            "{}: unexpected relevance",
            self.context
        );
        self
    }
}

pub struct LeafAssertion<'a> {
    token: &'a Token,
    source: &'a str,
    context: String,
}

impl LeafAssertion<'_> {
    pub fn text(self, expected: &str) -> Self {
        assert_eq!(
            self.token.text(self.source),
            expected,
            "{}: unexpected text",
            self.context
        );
        self
    }

    pub fn scope(self, expected: &str) -> Self {
        assert_eq!(
            self.token.scope_name(),
            Some(expected),
            "{}: unexpected scope for {:?}",
            self.context,
            self.token.text(self.source)
        );
        self
    }

    pub fn unscoped(self) -> Self {
        assert_eq!(
            self.token.scope_name(),
            None,
            "{}: expected no scope for {:?}",
            self.context,
            self.token.text(self.source)
        );
        self
    }

    pub fn kind(self, expected: TokenKind) -> Self {
        assert_eq!(self.token.kind, expected, "{}: unexpected kind", self.context);
        self
    }

    pub fn span(self, expected: Range<usize>) -> Self {
        assert_eq!(self.token.span(), expected, "{}: unexpected span", self.context);
        self
    }
}

pub struct RegionAssertion<'a> {
    region: Region<'a>,
    source: &'a str,
    context: String,
}

impl RegionAssertion<'_> {
    pub fn text(self, expected: &str) -> Self {
        assert_eq!(
            &self.source[self.region.span.clone()],
            expected,
            "{}: unexpected region text",
            self.context
        );
        self
    }

    pub fn span(self, expected: Range<usize>) -> Self {
        assert_eq!(self.region.span, expected, "{}: unexpected span", self.context);
        self
    }

    pub fn closure(self, expected: Closure) -> Self {
        assert_eq!(
            self.region.closure, expected,
            "{}: unexpected closure",
            self.context
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    #[test]
    fn test_fluent_chain() {
        let grammar = Grammar::from_yaml(
            "name: T\nkeywords: 'var'\ncontains:\n  - { scope: string, begin: \"'\", end: \"'\" }",
        )
        .unwrap();
        let source = "var s = 'x'";
        let tokenized = grammar.tokenize(source).unwrap();

        assert_tokens(&tokenized, source)
            .covers_input()
            .well_nested()
            .leaf_count(3)
            .leaf(0, |t| t.text("var").scope("keyword").kind(TokenKind::Keyword))
            .leaf(1, |t| t.text(" s = ").unscoped())
            .leaf_text("'x'", |t| t.scope("string").span(8..11))
            .region("string", |r| r.text("'x'").closure(Closure::Matched))
            .no_region("comment")
            .relevance(2);
    }

    #[test]
    #[should_panic(expected = "unexpected scope")]
    fn test_wrong_scope_panics() {
        let grammar = Grammar::from_yaml("name: T\nkeywords: 'var'").unwrap();
        let tokenized = grammar.tokenize("var").unwrap();
        assert_tokens(&tokenized, "var").leaf(0, |t| t.scope("string"));
    }
}
