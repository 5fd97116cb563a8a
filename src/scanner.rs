//! Scanner / Tokenizer
//!
//!     Walks a buffer once, left to right, with a stack of active modes. The bottom frame is
//!     always the grammar's root mode; it never ends and produces no enter/exit events.
//!
//! Arbitration
//!
//!     At each step, with the top frame active, three kinds of candidates are searched from
//!     the current offset:
//!
//!         1. ends: the top frame's end, plus the ends of ancestors reachable through
//!            `ends_with_parent` (innermost wins ties)
//!         2. illegal: the top mode's illegal pattern and the grammar-level one, which
//!            applies at every depth (empty matches never count)
//!         3. begins: every variant of every contained mode, in declaration order; the
//!            earliest start wins and ties go to the first declared
//!
//!     An illegal match at or before every begin and end aborts the call with
//!     [Error::IllegalSequence], or, under [IllegalPolicy::PlainRemainder], ends the scan with
//!     the rest of the buffer as unscoped text. Otherwise an end wins over a begin at the same
//!     offset unless the active mode sets `prefer_continuation`. With no candidate left the
//!     remainder is flushed and every open mode closes with [Closure::EndOfInput].
//!
//! Text Buffer
//!
//!     Text between lexemes accumulates in the active mode and is flushed when the mode
//!     changes. Flushed text goes through the Keyword Matcher of the mode it belongs to and
//!     takes the scope of the innermost scoped mode on the stack. A
//!     begin lexeme joins the new mode's buffer (or the parent's under `exclude_begin`); an
//!     end lexeme joins the closing mode's buffer (or the parent's under `exclude_end`).
//!     Lexemes with a `begin_scope` / `end_scope` are emitted on their own as delimiters.
//!
//! Zero-width Begins
//!
//!     A begin may match the empty string. The same mode cannot begin twice with an empty
//!     match at one offset; the second attempt searches again from the next character. Since
//!     every other step either consumes input or pops a frame, the scan always terminates.
//!
//! Caching
//!
//!     Each frame remembers the last match of each of its patterns together with the offset
//!     the search started from. A remembered match stays valid while the scan offset lies
//!     between those two positions, so a pattern is searched again only once the scan passes
//!     its previous hit.

mod emitter;
pub(crate) mod relevance;

use crate::error::{Error, Result};
use crate::grammar::{End, Grammar, Mode, ModeId};
use crate::pattern::{EndPattern, Matcher};
use crate::token::{Closure, Scope, Tokenized};
use emitter::Emitter;
use relevance::RelevanceScorer;
use std::borrow::Cow;
use std::ops::Range;
use tracing::{debug, instrument, trace};

/// What to do when an illegal pattern matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IllegalPolicy {
    /// Fail the call with [Error::IllegalSequence]
    #[default]
    Abort,
    /// Close every open mode with [Closure::Illegal] and emit the rest as unscoped text
    PlainRemainder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizeOptions {
    pub on_illegal: IllegalPolicy,
}

impl TokenizeOptions {
    pub fn lenient() -> Self {
        Self {
            on_illegal: IllegalPolicy::PlainRemainder,
        }
    }
}

pub fn tokenize(grammar: &Grammar, text: &str) -> Result<Tokenized> {
    tokenize_with(grammar, text, &TokenizeOptions::default())
}

#[instrument(level = "trace", skip_all, fields(grammar = grammar.name(), len = text.len()))]
pub fn tokenize_with(grammar: &Grammar, text: &str, options: &TokenizeOptions) -> Result<Tokenized> {
    Scanner::new(grammar, text, *options).run()
}

#[derive(Debug, Clone, Default)]
struct MatchCache {
    searched_from: Option<usize>,
    found: Option<Range<usize>>,
}

impl MatchCache {
    fn find(&mut self, matcher: &Matcher, text: &str, from: usize, allow_empty: bool) -> Option<Range<usize>> {
        if let Some(searched_from) = self.searched_from {
            let still_ahead = self.found.as_ref().map_or(true, |found| found.start >= from);
            if searched_from <= from && still_ahead {
                return self.found.clone();
            }
        }
        self.found = matcher.find_at(text, from, allow_empty);
        self.searched_from = Some(from);
        self.found.clone()
    }
}

struct Frame<'g> {
    mode: &'g Mode,
    end: Option<Cow<'g, Matcher>>,
    region_start: usize,
    text_scope: Option<Scope>,
    end_cache: MatchCache,
    illegal_cache: MatchCache,
    begin_caches: Vec<MatchCache>,
}

impl<'g> Frame<'g> {
    fn new(
        mode: &'g Mode,
        end: Option<Cow<'g, Matcher>>,
        region_start: usize,
        text_scope: Option<Scope>,
    ) -> Self {
        Self {
            mode,
            end,
            region_start,
            text_scope,
            end_cache: MatchCache::default(),
            illegal_cache: MatchCache::default(),
            begin_caches: Vec::new(),
        }
    }
}

/// Modes that already began with an empty match at the current offset.
#[derive(Debug, Default)]
struct ZeroWidthGuard {
    at: usize,
    modes: Vec<ModeId>,
}

impl ZeroWidthGuard {
    fn blocks(&self, at: usize, mode: ModeId) -> bool {
        self.at == at && self.modes.contains(&mode)
    }

    fn record(&mut self, at: usize, mode: ModeId) {
        if self.at != at {
            self.at = at;
            self.modes.clear();
        }
        self.modes.push(mode);
    }
}

enum Step {
    Begin {
        mode: ModeId,
        variant: usize,
        span: Range<usize>,
    },
    End {
        depth: usize,
        span: Range<usize>,
    },
    Illegal(usize),
    Done,
}

struct Scanner<'g, 't> {
    grammar: &'g Grammar,
    text: &'t str,
    options: TokenizeOptions,
    stack: Vec<Frame<'g>>,
    offset: usize,
    buffer_start: usize,
    emitter: Emitter,
    scorer: RelevanceScorer,
    grammar_illegal: MatchCache,
    zero_width: ZeroWidthGuard,
}

impl<'g, 't> Scanner<'g, 't> {
    fn new(grammar: &'g Grammar, text: &'t str, options: TokenizeOptions) -> Self {
        Self {
            grammar,
            text,
            options,
            stack: vec![Frame::new(grammar.root(), None, 0, None)],
            offset: 0,
            buffer_start: 0,
            emitter: Emitter::default(),
            scorer: RelevanceScorer::new(grammar.modes().len()),
            grammar_illegal: MatchCache::default(),
            zero_width: ZeroWidthGuard::default(),
        }
    }

    fn run(mut self) -> Result<Tokenized> {
        let mut illegal = None;
        loop {
            match self.next_step() {
                Step::Begin {
                    mode,
                    variant,
                    span,
                } => self.begin(mode, variant, span)?,
                Step::End { depth, span } => self.end(depth, span),
                Step::Illegal(at) => {
                    debug!(grammar = self.grammar.name(), offset = at, "illegal sequence");
                    match self.options.on_illegal {
                        IllegalPolicy::Abort => {
                            return Err(Error::IllegalSequence {
                                grammar: self.grammar.name().to_string(),
                                offset: at,
                            })
                        }
                        IllegalPolicy::PlainRemainder => {
                            self.recover(at);
                            illegal = Some(at);
                            break;
                        }
                    }
                }
                Step::Done => {
                    self.finish_input();
                    break;
                }
            }
        }

        Ok(Tokenized {
            events: self.emitter.finish(),
            relevance: self.scorer.total(),
            illegal,
        })
    }

    fn top(&self) -> &'g Mode {
        self.top_frame().mode
    }

    fn top_frame(&self) -> &Frame<'g> {
        &self.stack[self.stack.len() - 1]
    }

    fn next_step(&mut self) -> Step {
        let text = self.text;
        let grammar = self.grammar;
        let at = self.offset;
        let top = self.stack.len() - 1;

        let mut end: Option<(usize, Range<usize>)> = None;
        let mut depth = top;
        loop {
            let frame = &mut self.stack[depth];
            if let Some(matcher) = frame.end.as_deref() {
                if let Some(found) = frame.end_cache.find(matcher, text, at, true) {
                    if end.as_ref().map_or(true, |(_, best)| found.start < best.start) {
                        end = Some((depth, found));
                    }
                }
            }
            if depth == 0 || !frame.mode.flags().ends_with_parent {
                break;
            }
            depth -= 1;
        }

        let mut illegal: Option<usize> = None;
        let frame = &mut self.stack[top];
        let mode = frame.mode;
        if let Some(matcher) = mode.illegal() {
            illegal = frame
                .illegal_cache
                .find(matcher, text, at, false)
                .map(|found| found.start);
        }
        if !mode.is_root() {
            if let Some(matcher) = grammar.illegal() {
                if let Some(found) = self.grammar_illegal.find(matcher, text, at, false) {
                    illegal = Some(illegal.map_or(found.start, |start| start.min(found.start)));
                }
            }
        }

        let mut begin: Option<(ModeId, usize, Range<usize>)> = None;
        let mut slot = 0;
        'children: for &child in mode.contains() {
            for (index, variant) in grammar.mode(child).variants().iter().enumerate() {
                if frame.begin_caches.len() <= slot {
                    frame.begin_caches.push(MatchCache::default());
                }
                let cache = &mut frame.begin_caches[slot];
                slot += 1;

                let mut found = cache.find(variant.begin(), text, at, true);
                let blocked = matches!(&found, Some(hit)
                    if hit.is_empty() && hit.start == at && self.zero_width.blocks(at, child));
                if blocked {
                    found = next_boundary(text, at)
                        .and_then(|next| cache.find(variant.begin(), text, next, true));
                }

                if let Some(hit) = found {
                    if begin.as_ref().map_or(true, |(_, _, best)| hit.start < best.start) {
                        begin = Some((child, index, hit));
                    }
                }
                if matches!(&begin, Some((_, _, best)) if best.start == at) {
                    break 'children;
                }
            }
        }

        if let Some(at) = illegal {
            let before_begin = begin.as_ref().map_or(true, |(_, _, span)| at <= span.start);
            let before_end = end.as_ref().map_or(true, |(_, span)| at <= span.start);
            if before_begin && before_end {
                return Step::Illegal(at);
            }
        }

        match (begin, end) {
            (None, None) => Step::Done,
            (Some((mode, variant, span)), None) => Step::Begin {
                mode,
                variant,
                span,
            },
            (None, Some((depth, span))) => Step::End { depth, span },
            (Some((child, variant, begin)), Some((depth, end))) => {
                let continues = mode.flags().prefer_continuation;
                if end.start < begin.start || (end.start == begin.start && !continues) {
                    Step::End { depth, span: end }
                } else {
                    Step::Begin {
                        mode: child,
                        variant,
                        span: begin,
                    }
                }
            }
        }
    }

    /// Emits the buffered text up to `at` in the active mode.
    fn flush_to(&mut self, at: usize) {
        if at <= self.buffer_start {
            return;
        }
        let frame = self.top_frame();
        let (mode, scope) = (frame.mode, frame.text_scope.clone());
        self.emitter.text(
            self.grammar,
            mode,
            scope,
            self.text,
            self.buffer_start..at,
            &mut self.scorer,
        );
        self.buffer_start = at;
    }

    fn push(&mut self, mode: &'g Mode, end: Option<Cow<'g, Matcher>>, region_start: usize) {
        trace!(mode = ?mode.id(), scope = ?mode.scope(), offset = region_start, "push");
        self.emitter
            .enter(mode.id(), mode.scope().cloned(), region_start);
        let text_scope = mode
            .scope()
            .or_else(|| self.top_frame().text_scope.as_ref())
            .cloned();
        self.stack
            .push(Frame::new(mode, end, region_start, text_scope));
    }

    /// Pops the top frame, closing its region at `region_end`.
    fn pop(&mut self, region_end: usize, closure: Closure) -> Option<&'g Mode> {
        if self.stack.len() <= 1 {
            return None;
        }
        let frame = self.stack.pop()?;
        trace!(mode = ?frame.mode.id(), offset = region_end, ?closure, "pop");
        self.emitter.exit(
            frame.mode.id(),
            frame.mode.scope().cloned(),
            frame.region_start..region_end,
            closure,
        );
        Some(frame.mode)
    }

    fn begin(&mut self, id: ModeId, index: usize, span: Range<usize>) -> Result<()> {
        let grammar = self.grammar;
        let mode = grammar.mode(id);
        let variant = &mode.variants()[index];
        let flags = mode.flags();

        if span.is_empty() {
            self.zero_width.record(span.start, id);
        }
        self.scorer.enter(mode);

        let end = match variant.end() {
            End::Pattern(EndPattern::Static(matcher)) => Some(Cow::Borrowed(matcher)),
            End::Pattern(EndPattern::Template(template)) => {
                let captures = variant.begin().capture_slots(self.text, &span);
                let matcher = template.instantiate(&captures).map_err(|e| {
                    Error::malformed(
                        grammar.name(),
                        format!("end pattern could not be instantiated: {e}"),
                    )
                })?;
                Some(Cow::Owned(matcher))
            }
            End::Immediate | End::Open => None,
        };

        let region_start = if flags.exclude_begin { span.end } else { span.start };
        match mode.begin_scope() {
            Some(scope) => {
                self.flush_to(span.start);
                if flags.exclude_begin {
                    self.emitter.delimiter(span.clone(), scope);
                    self.push(mode, end, region_start);
                } else {
                    self.push(mode, end, region_start);
                    self.emitter.delimiter(span.clone(), scope);
                }
                self.buffer_start = span.end;
            }
            None => {
                self.flush_to(region_start);
                self.push(mode, end, region_start);
                self.buffer_start = region_start;
            }
        }
        self.offset = span.end;

        if matches!(variant.end(), End::Immediate) {
            self.flush_to(span.end);
            self.pop(span.end, Closure::Matched);
            self.cascade(mode);
        }
        Ok(())
    }

    fn end(&mut self, depth: usize, span: Range<usize>) {
        while self.stack.len() - 1 > depth {
            self.flush_to(span.start);
            self.pop(span.start, Closure::WithParent);
        }

        let mode = self.top();
        let flags = mode.flags();
        if flags.return_end {
            self.flush_to(span.start);
            self.pop(span.start, Closure::Matched);
            self.offset = span.start;
        } else if flags.exclude_end {
            self.flush_to(span.start);
            self.pop(span.start, Closure::Matched);
            match mode.end_scope() {
                Some(scope) => {
                    self.emitter.delimiter(span.clone(), scope);
                    self.buffer_start = span.end;
                }
                None => self.buffer_start = span.start,
            }
            self.offset = span.end;
        } else if let Some(scope) = mode.end_scope() {
            self.flush_to(span.start);
            self.emitter.delimiter(span.clone(), scope);
            self.pop(span.end, Closure::Matched);
            self.buffer_start = span.end;
            self.offset = span.end;
        } else {
            self.flush_to(span.end);
            self.pop(span.end, Closure::Matched);
            self.offset = span.end;
        }
        self.cascade(mode);
    }

    /// Closes parents of modes marked `ends_parent`, at the current offset.
    fn cascade(&mut self, closed: &'g Mode) {
        let mut closed = closed;
        while closed.flags().ends_parent && self.stack.len() > 1 {
            self.flush_to(self.offset);
            match self.pop(self.offset, Closure::ByChild) {
                Some(parent) => closed = parent,
                None => break,
            }
        }
    }

    fn finish_input(&mut self) {
        let len = self.text.len();
        self.flush_to(len);
        while self.pop(len, Closure::EndOfInput).is_some() {}
    }

    fn recover(&mut self, at: usize) {
        let len = self.text.len();
        self.flush_to(at);
        while self.pop(at, Closure::Illegal).is_some() {}
        self.emitter.raw(at..len);
        self.buffer_start = len;
        self.offset = len;
    }
}

fn next_boundary(text: &str, at: usize) -> Option<usize> {
    text[at..].chars().next().map(|c| at + c.len_utf8())
}
