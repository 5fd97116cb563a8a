//! Relevance Scorer
//!
//!     Relevance is a heuristic for "how much does this text look like this grammar". Every
//!     keyword hit adds its weight; entering a mode for the first time within a call adds the
//!     mode's relevance. The sum is uncapped. First-entry tracking is per call, so scores do
//!     not depend on what was tokenized before.

use crate::grammar::Mode;

#[derive(Debug, Clone, Default)]
pub(crate) struct RelevanceScorer {
    total: u32,
    entered: Vec<bool>,
}

impl RelevanceScorer {
    pub fn new(modes: usize) -> Self {
        Self {
            total: 0,
            entered: vec![false; modes],
        }
    }

    pub fn keyword(&mut self, weight: u32) {
        self.total = self.total.saturating_add(weight);
    }

    pub fn enter(&mut self, mode: &Mode) {
        let index = mode.id().index();
        if index >= self.entered.len() {
            self.entered.resize(index + 1, false);
        }
        if !self.entered[index] {
            self.entered[index] = true;
            self.total = self.total.saturating_add(mode.relevance());
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}
