//! Grammars bundled with the crate. They load through the same path as user grammars.

use super::Grammar;
use crate::error::Result;

pub const OXYGENE: &str = include_str!("../../grammars/oxygene.yaml");
pub const MERCURY: &str = include_str!("../../grammars/mercury.yaml");

/// Source of every bundled grammar, in registration order.
pub const SOURCES: &[&str] = &[OXYGENE, MERCURY];

pub fn oxygene() -> Result<Grammar> {
    Grammar::from_yaml(OXYGENE)
}

pub fn mercury() -> Result<Grammar> {
    Grammar::from_yaml(MERCURY)
}

pub fn all() -> Result<Vec<Grammar>> {
    SOURCES.iter().map(|source| Grammar::from_yaml(source)).collect()
}
