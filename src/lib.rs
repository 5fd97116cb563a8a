//! # hilex
//!
//! A grammar-driven syntax highlighting engine. Grammars are declarative descriptions of a
//! language's lexical rules (keywords, delimited regions, literals, illegal sequences); the
//! engine compiles them into a mode graph and tokenizes text against it in a single pass.
//!
//!     let source = "procedure Foo(a: Integer);";
//!     let grammar = hilex::grammar::builtin::oxygene()?;
//!     let tokenized = grammar.tokenize(source)?;
//!     println!("{}", hilex::formats::html::to_html(&tokenized, source));
//!
//! ## Testing
//!
//! For testing guidelines, see the [testing module](crate::testing). Tests of the bundled
//! grammars use the verified sources under `samples/` and the fluent token assertions.

pub mod error;
pub mod formats;
pub mod grammar;
pub mod pattern;
pub mod registry;
pub mod scanner;
pub mod testing;
pub mod token;

pub use error::{Error, Result};
pub use grammar::{Grammar, GrammarDef};
pub use registry::{detect, Detection, Registry};
pub use scanner::{tokenize, tokenize_with, IllegalPolicy, TokenizeOptions};
pub use token::{Closure, Event, Scope, Token, TokenKind, Tokenized};
