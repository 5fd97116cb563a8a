//! Testing utilities for tokenizer assertions
//!
//! Tokenizer Testing Guidelines
//!
//!     Grammar tests follow two rules.
//!
//!     1. Use the verified samples for grammar content. Source text for the bundled grammars
//!        lives under `samples/<language>/`; each file has been checked by hand against the
//!        grammar. Load it with [Samples] instead of inlining snippets, so that a grammar
//!        change means re-verifying one directory rather than hunting through test files.
//!
//!     2. Assert with [assert_tokens]. Counting tokens says little; what matters is which
//!        text got which scope and which regions opened and closed. The fluent API checks
//!        that directly:
//!
//!         let sample = Samples::oxygene("procedure-declaration");
//!         let tokenized = sample.tokenize().unwrap();
//!
//!         assert_tokens(&tokenized, sample.source())
//!             .covers_input()
//!             .well_nested()
//!             .leaf(0, |t| t.text("procedure").scope("keyword"))
//!             .region("params", |r| r.text("a: Integer"));
//!
//!     Small grammars written inline to exercise one scanner rule are fine; the rule is about
//!     the bundled languages.

mod assertions;
mod samples;

pub use assertions::{assert_tokens, LeafAssertion, RegionAssertion, TokenizedAssertion};
pub use samples::{Sample, Samples};
