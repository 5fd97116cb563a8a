//! Property-based tests for the scanner over the bundled grammars
//!
//! These tests check the invariants every tokenization must hold, whatever the input:
//! the leaf tokens cover the input exactly, regions are well nested, and the result is
//! deterministic.

use hilex::grammar::builtin;
use hilex::{Event, Grammar, TokenizeOptions, Tokenized};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static OXYGENE: Lazy<Grammar> = Lazy::new(|| builtin::oxygene().unwrap());
static MERCURY: Lazy<Grammar> = Lazy::new(|| builtin::mercury().unwrap());

/// Leaf tokens are non-empty, contiguous and start at 0.
fn check_coverage(tokenized: &Tokenized, text: &str) {
    let mut at = 0;
    for token in tokenized.tokens() {
        assert_eq!(token.start, at, "gap or overlap before {:?}", token);
        assert!(token.end > token.start, "empty token {:?}", token);
        at = token.end;
    }
    assert_eq!(at, text.len());
    assert_eq!(tokenized.reconstruct(text), text);
}

fn check_nesting(tokenized: &Tokenized) {
    let mut stack = Vec::new();
    for event in tokenized.events() {
        match event {
            Event::Enter { mode, offset, .. } => stack.push((*mode, *offset)),
            Event::Exit { mode, span, .. } => {
                let (open, offset) = stack.pop().expect("exit without enter");
                assert_eq!(open, *mode);
                assert_eq!(offset, span.start);
                assert!(span.start <= span.end);
            }
            Event::Token(_) => {}
        }
    }
    assert!(stack.is_empty(), "unclosed regions: {:?}", stack);
}

/// Source-like text: identifiers, keywords, literals and the delimiters both grammars react to.
fn source_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z_][a-zA-Z0-9_]{0,8}",
            "[0-9]{1,4}(\\.[0-9]{1,3})?",
            Just("begin".to_string()),
            Just("procedure".to_string()),
            Just("REM".to_string()),
            Just("Dim".to_string()),
            "[ \\t\\n]{1,3}",
            "['\"#(){}*;:/<>&$.=+-]",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

/// Words separated by whitespace only: nothing that opens a mode in Oxygene.
fn words_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["begin", "END", "var", "Begin", "x", "foo", "bar"]),
            prop::sample::select(vec![" ", "\n", "  "]),
        ),
        1..30,
    )
    .prop_map(|parts| {
        parts
            .into_iter()
            .map(|(word, sep)| format!("{word}{sep}"))
            .collect()
    })
}

proptest! {
    #[test]
    fn test_lenient_tokenization_covers_input(text in source_strategy()) {
        for grammar in [&*OXYGENE, &*MERCURY] {
            let tokenized = grammar
                .tokenize_with(&text, &TokenizeOptions::lenient())
                .unwrap();
            check_coverage(&tokenized, &text);
            check_nesting(&tokenized);
        }
    }

    #[test]
    fn test_strict_tokenization_covers_input_or_reports_offset(text in source_strategy()) {
        for grammar in [&*OXYGENE, &*MERCURY] {
            match grammar.tokenize(&text) {
                Ok(tokenized) => {
                    prop_assert!(tokenized.illegal().is_none());
                    check_coverage(&tokenized, &text);
                    check_nesting(&tokenized);
                }
                Err(err) => {
                    let offset = err.illegal_offset().unwrap();
                    prop_assert!(offset < text.len());
                    let lenient = grammar
                        .tokenize_with(&text, &TokenizeOptions::lenient())
                        .unwrap();
                    prop_assert_eq!(lenient.illegal(), Some(offset));
                }
            }
        }
    }

    #[test]
    fn test_tokenization_is_deterministic(text in source_strategy()) {
        for grammar in [&*OXYGENE, &*MERCURY] {
            let options = TokenizeOptions::lenient();
            let first = grammar.tokenize_with(&text, &options).unwrap();
            let second = grammar.tokenize_with(&text, &options).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_keywords_are_classified_the_same_everywhere(text in words_strategy()) {
        let tokenized = OXYGENE.tokenize(&text).unwrap();
        for token in tokenized.tokens() {
            let word = token.text(&text);
            match word.to_ascii_lowercase().as_str() {
                "begin" | "end" | "var" => prop_assert_eq!(token.scope_name(), Some("keyword")),
                _ => prop_assert_eq!(token.scope_name(), None),
            }
        }
    }
}
