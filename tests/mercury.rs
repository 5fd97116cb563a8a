//! Tokenization of the verified Mercury samples

use hilex::testing::{assert_tokens, Samples};
use hilex::{Closure, Error, TokenizeOptions};
use rstest::rstest;

#[test]
fn test_unterminated_string_closes_at_end_of_input() {
    let sample = Samples::mercury("unterminated-string");
    let tokenized = sample.tokenize().unwrap();

    assert_tokens(&tokenized, sample.source())
        .covers_input()
        .well_nested()
        .leaf_count(3)
        .leaf(0, |t| t.text("Dim").scope("keyword"))
        .leaf(1, |t| t.text(" greeting = ").unscoped())
        .leaf(2, |t| t.text("\"hello").scope("string"))
        .region("string", |r| r.span(15..21).closure(Closure::EndOfInput));
}

#[rstest]
#[case("newline-in-string", 14)]
#[case("url-in-string", 16)]
fn test_illegal_sequences(#[case] name: &str, #[case] offset: usize) {
    let sample = Samples::mercury(name);
    match sample.tokenize() {
        Err(Error::IllegalSequence { grammar, offset: at }) => {
            assert_eq!(grammar, "Mercury");
            assert_eq!(at, offset);
        }
        other => panic!("expected an illegal sequence at {offset}, got {other:?}"),
    }
}

#[test]
fn test_illegal_inside_string_recovers_as_plain_text() {
    let sample = Samples::mercury("url-in-string");
    let tokenized = sample.tokenize_with(&TokenizeOptions::lenient()).unwrap();

    assert_eq!(tokenized.illegal(), Some(16));
    assert_tokens(&tokenized, sample.source())
        .covers_input()
        .well_nested()
        .region("string", |r| r.text("\"http:").closure(Closure::Illegal))
        .leaf_text("//example.com\"\n", |t| t.unscoped());
}

#[test]
fn test_module() {
    let sample = Samples::mercury("module");
    let tokenized = sample.tokenize().unwrap();

    assert_tokens(&tokenized, sample.source())
        .covers_input()
        .well_nested()
        .leaf(0, |t| t.text("Imports").scope("keyword"))
        .leaf_text("Integer", |t| t.scope("keyword"))
        .leaf_text("#2024-01-15 10:30 AM#", |t| t.scope("literal"))
        .leaf_text("&H1F", |t| t.scope("number"))
        .leaf_text("1.5E3", |t| t.scope("number"))
        .leaf_text("\"x\"C", |t| t.scope("string"))
        .leaf_text("\"say ", |t| t.scope("string"))
        .every_leaf_text("\"\"", "string")
        .region_count("comment", 3)
        .region_count("doctag", 3)
        .leaf_text("TODO:", |t| t.scope("doctag"))
        .leaf_text("<summary>", |t| t.scope("doctag"))
        .leaf_text(" REM trace only", |t| t.scope("comment"))
        .region_count("meta", 2)
        .region("meta", |r| r.text("#If DEBUG Then"))
        .leaf_text("If", |t| t.scope("keyword"));
}

#[test]
fn test_label_scope_is_aliased() {
    let sample = Samples::mercury("label");
    let tokenized = sample.tokenize().unwrap();

    assert_tokens(&tokenized, sample.source())
        .covers_input()
        .leaf(0, |t| t.text("Retry:").scope("symbol"))
        .leaf_text("GoTo", |t| t.scope("keyword"))
        .no_region("label")
        .region_count("symbol", 1);
}
