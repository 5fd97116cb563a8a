//! Verified sample sources for the bundled grammars.
//!
//!     Samples live in `samples/<language>/<name>.<ext>` at the crate root. The loader panics
//!     on a missing sample: a test asking for one that does not exist is a broken test.

use crate::error::Result;
use crate::grammar::{builtin, Grammar};
use crate::scanner::{self, TokenizeOptions};
use crate::token::Tokenized;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Samples;

impl Samples {
    pub fn root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("samples")
    }

    pub fn oxygene(name: &str) -> Sample {
        Self::load("oxygene", name, "pas")
    }

    pub fn mercury(name: &str) -> Sample {
        Self::load("mercury", name, "vb")
    }

    /// Names of every sample of `language`, sorted.
    pub fn list(language: &str) -> Vec<String> {
        let dir = Self::root().join(language);
        let entries = fs::read_dir(&dir)
            .unwrap_or_else(|e| panic!("cannot list samples in {}: {}", dir.display(), e));
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }

    fn load(language: &str, name: &str, extension: &str) -> Sample {
        let path = Self::root()
            .join(language)
            .join(format!("{name}.{extension}"));
        let source = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read sample {}: {}", path.display(), e));
        Sample {
            language: language.to_string(),
            source,
        }
    }
}

pub struct Sample {
    language: String,
    source: String,
}

impl Sample {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn grammar(&self) -> Grammar {
        let grammar = match self.language.as_str() {
            "oxygene" => builtin::oxygene(),
            "mercury" => builtin::mercury(),
            other => panic!("no bundled grammar for samples of {other:?}"),
        };
        grammar.unwrap_or_else(|e| panic!("bundled grammar does not compile: {e}"))
    }

    pub fn tokenize(&self) -> Result<Tokenized> {
        scanner::tokenize(&self.grammar(), &self.source)
    }

    pub fn tokenize_with(&self, options: &TokenizeOptions) -> Result<Tokenized> {
        scanner::tokenize_with(&self.grammar(), &self.source, options)
    }
}
