//! Event emission: keyword routing of plain text and token merging.

use super::relevance::RelevanceScorer;
use crate::grammar::{Grammar, Mode, ModeId};
use crate::token::{Closure, Event, Scope, Token, TokenKind};
use std::ops::Range;

#[derive(Debug, Default)]
pub(crate) struct Emitter {
    events: Vec<Event>,
}

impl Emitter {
    /// Emits `range` of `source` as text of `mode`, splitting out keyword hits. Text that is
    /// not a keyword gets `scope`.
    pub fn text(
        &mut self,
        grammar: &Grammar,
        mode: &Mode,
        scope: Option<Scope>,
        source: &str,
        range: Range<usize>,
        scorer: &mut RelevanceScorer,
    ) {
        if range.is_empty() {
            return;
        }
        let (table, identifier) = grammar.effective_keywords(mode);
        let mut cursor = range.start;

        if !table.is_empty() {
            for found in identifier.find_iter(&source[range.clone()]) {
                if found.is_empty() {
                    continue;
                }
                let Some(keyword) = table.lookup(found.as_str()) else {
                    continue;
                };
                let start = range.start + found.start();
                let end = range.start + found.end();
                self.push(Token {
                    start: cursor,
                    end: start,
                    scope: scope.clone(),
                    kind: TokenKind::Text,
                });
                self.push(Token {
                    start,
                    end,
                    scope: Some(keyword.category.clone()),
                    kind: TokenKind::Keyword,
                });
                scorer.keyword(keyword.weight);
                cursor = end;
            }
        }

        self.push(Token {
            start: cursor,
            end: range.end,
            scope,
            kind: TokenKind::Text,
        });
    }

    pub fn delimiter(&mut self, range: Range<usize>, scope: &Scope) {
        self.push(Token {
            start: range.start,
            end: range.end,
            scope: Some(scope.clone()),
            kind: TokenKind::Delimiter,
        });
    }

    /// Unscoped text that is never merged with its neighbours.
    pub fn raw(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.events.push(Event::Token(Token {
                start: range.start,
                end: range.end,
                scope: None,
                kind: TokenKind::Text,
            }));
        }
    }

    pub fn enter(&mut self, mode: ModeId, scope: Option<Scope>, offset: usize) {
        self.events.push(Event::Enter {
            mode,
            scope,
            offset,
        });
    }

    pub fn exit(&mut self, mode: ModeId, scope: Option<Scope>, span: Range<usize>, closure: Closure) {
        self.events.push(Event::Exit {
            mode,
            scope,
            span,
            closure,
        });
    }

    fn push(&mut self, token: Token) {
        if token.start == token.end {
            return;
        }
        if let Some(Event::Token(last)) = self.events.last_mut() {
            let mergeable = last.kind == TokenKind::Text
                && token.kind == TokenKind::Text
                && last.scope == token.scope
                && last.end == token.start;
            if mergeable {
                last.end = token.end;
                return;
            }
        }
        self.events.push(Event::Token(token));
    }

    pub fn finish(self) -> Vec<Event> {
        self.events
    }
}
