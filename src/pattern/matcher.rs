//! Compiled matchers used by the scanner.

use regex::Regex;
use regex_automata::util::syntax;
use regex_automata::{meta, Anchored, Input};
use std::fmt;
use std::ops::Range;

/// A check applied at the end of a match, lowered from a trailing lookahead.
///
/// Runs as an anchored search over the full buffer so assertions like `\b` still see the
/// text before the check position.
#[derive(Clone)]
pub(crate) struct Follow {
    regex: meta::Regex,
    source: String,
    negated: bool,
}

/// Builds an automata regex with the same flags and size cap as the `regex` matchers.
fn automaton(
    source: &str,
    case_insensitive: bool,
    size_limit: usize,
) -> Result<meta::Regex, String> {
    meta::Regex::builder()
        .configure(meta::Config::new().nfa_size_limit(Some(size_limit)))
        .syntax(
            syntax::Config::new()
                .multi_line(true)
                .case_insensitive(case_insensitive),
        )
        .build(source)
        .map_err(|e| e.to_string())
}

/// Error text for a pattern the `regex` engine refused.
pub(crate) fn regex_reason(source: &str, error: regex::Error) -> String {
    match error {
        regex::Error::CompiledTooBig(limit) => {
            format!("pattern `{source}` is too complex: compiled size exceeds {limit} bytes")
        }
        other => format!("invalid pattern `{source}`: {other}"),
    }
}

impl Follow {
    pub(crate) fn new(
        source: &str,
        negated: bool,
        case_insensitive: bool,
        size_limit: usize,
    ) -> Result<Self, String> {
        let regex = automaton(source, case_insensitive, size_limit)?;
        Ok(Self {
            regex,
            source: source.to_string(),
            negated,
        })
    }

    fn holds(&self, text: &str, at: usize) -> bool {
        let input = Input::new(text).range(at..).anchored(Anchored::Yes);
        self.regex.is_match(input) != self.negated
    }
}

impl fmt::Debug for Follow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.negated { "?!" } else { "?=" };
        write!(f, "({}{})", op, self.source)
    }
}

/// A begin, illegal or (non-templated) end pattern.
///
/// A pattern with follow checks also keeps an automata copy of its body. When the follow
/// check rejects the longest match, shorter matches at the same start are found by anchored
/// searches over a shrinking window, the way a backtracking engine would retry them.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    follows: Vec<Follow>,
    body: Option<meta::Regex>,
}

impl Matcher {
    pub(crate) fn new(
        regex: Regex,
        follows: Vec<Follow>,
        case_insensitive: bool,
        size_limit: usize,
    ) -> Result<Self, String> {
        let body = if follows.is_empty() {
            None
        } else {
            Some(automaton(regex.as_str(), case_insensitive, size_limit)?)
        };
        Ok(Self {
            regex,
            follows,
            body,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Number of capture groups, including the implicit whole-match group.
    pub fn captures_len(&self) -> usize {
        self.regex.captures_len()
    }

    pub(crate) fn group_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    /// Earliest match starting at or after `from` whose follow checks hold.
    ///
    /// Empty matches are skipped unless `allow_empty` is set.
    pub fn find_at(&self, text: &str, from: usize, allow_empty: bool) -> Option<Range<usize>> {
        let mut at = from;
        loop {
            let found = self.regex.find_at(text, at)?;
            if let Some(end) = self.accepted_end(text, found.range(), allow_empty) {
                return Some(found.start()..end);
            }
            at = next_boundary(text, found.start())?;
        }
    }

    /// End of the preferred match starting at `found.start` whose follow checks hold.
    fn accepted_end(&self, text: &str, found: Range<usize>, allow_empty: bool) -> Option<usize> {
        let mut end = found.end;
        loop {
            if (allow_empty || end > found.start) && self.follows_hold(text, end) {
                return Some(end);
            }
            let body = self.body.as_ref()?;
            if end == found.start {
                return None;
            }
            let window = found.start..previous_boundary(text, end);
            let input = Input::new(text).range(window).anchored(Anchored::Yes);
            end = body.find(input)?.end();
        }
    }

    fn follows_hold(&self, text: &str, at: usize) -> bool {
        self.follows.iter().all(|follow| follow.holds(text, at))
    }

    /// Capture slots of the match that starts at `range.start`.
    pub(crate) fn capture_slots(&self, text: &str, range: &Range<usize>) -> CaptureSlots {
        let spans: Vec<Option<Range<usize>>> = match &self.body {
            Some(body) => {
                let mut captures = body.create_captures();
                let input = Input::new(text)
                    .range(range.clone())
                    .anchored(Anchored::Yes);
                body.captures(input, &mut captures);
                if !captures.is_match() {
                    return CaptureSlots::default();
                }
                (0..captures.group_len())
                    .map(|index| captures.get_group(index).map(|span| span.range()))
                    .collect()
            }
            None => {
                let Some(captures) = self.regex.captures_at(text, range.start) else {
                    return CaptureSlots::default();
                };
                captures.iter().map(|group| group.map(|m| m.range())).collect()
            }
        };
        let slots = self
            .regex
            .capture_names()
            .zip(spans)
            .map(|(name, span)| CaptureSlot {
                name: name.map(str::to_string),
                value: span.map(|span| text[span].to_string()),
            })
            .collect();
        CaptureSlots { slots }
    }
}

fn next_boundary(text: &str, at: usize) -> Option<usize> {
    text[at..].chars().next().map(|c| at + c.len_utf8())
}

fn previous_boundary(text: &str, at: usize) -> usize {
    text[..at].chars().next_back().map_or(at, |c| at - c.len_utf8())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CaptureSlot {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Groups captured by a begin match, threaded into the end pattern of the same stack frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CaptureSlots {
    slots: Vec<CaptureSlot>,
}

impl CaptureSlots {
    fn by_index(&self, index: usize) -> Option<&str> {
        self.slots.get(index)?.value.as_deref()
    }

    fn by_name(&self, name: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|slot| slot.name.as_deref() == Some(name))?
            .value
            .as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplatePiece {
    Text(String),
    Group(usize),
    Named(String),
}

/// An end pattern holding backreferences to its begin match.
#[derive(Debug, Clone)]
pub struct EndTemplate {
    pieces: Vec<TemplatePiece>,
    follows: Vec<Follow>,
    case_insensitive: bool,
    size_limit: usize,
}

impl EndTemplate {
    pub(crate) fn new(
        pieces: Vec<TemplatePiece>,
        follows: Vec<Follow>,
        case_insensitive: bool,
        size_limit: usize,
    ) -> Self {
        Self {
            pieces,
            follows,
            case_insensitive,
            size_limit,
        }
    }

    pub(crate) fn pieces(&self) -> &[TemplatePiece] {
        &self.pieces
    }

    /// Builds the concrete end matcher for one stack frame. Groups that did not participate
    /// in the begin match splice in as empty text.
    pub(crate) fn instantiate(&self, captures: &CaptureSlots) -> Result<Matcher, String> {
        let source: String = self
            .pieces
            .iter()
            .map(|piece| match piece {
                TemplatePiece::Text(text) => text.clone(),
                TemplatePiece::Group(index) => {
                    regex::escape(captures.by_index(*index).unwrap_or_default())
                }
                TemplatePiece::Named(name) => {
                    regex::escape(captures.by_name(name).unwrap_or_default())
                }
            })
            .collect();

        let regex = regex::RegexBuilder::new(&source)
            .multi_line(true)
            .case_insensitive(self.case_insensitive)
            .size_limit(self.size_limit)
            .build()
            .map_err(|e| regex_reason(&source, e))?;
        Matcher::new(
            regex,
            self.follows.clone(),
            self.case_insensitive,
            self.size_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1 << 20;

    fn matcher(source: &str, follows: Vec<Follow>) -> Matcher {
        Matcher::new(Regex::new(source).unwrap(), follows, false, LIMIT).unwrap()
    }

    #[test]
    fn test_find_at_skips_empty_matches() {
        let m = matcher(r"a*", vec![]);
        assert_eq!(m.find_at("bba", 0, false), Some(2..3));
        assert_eq!(m.find_at("bba", 0, true), Some(0..0));
    }

    #[test]
    fn test_follow_checks_use_full_buffer() {
        let not_dot = Follow::new(r"\.", true, false, LIMIT).unwrap();
        let m = matcher(r"\bend\b", vec![not_dot]);
        assert_eq!(m.find_at("x.end. end", 0, false), Some(7..10));

        let boundary = Follow::new(r"\b", false, false, LIMIT).unwrap();
        let m = matcher(r"ab", vec![boundary]);
        assert_eq!(m.find_at("abc ab", 0, false), Some(4..6));
    }

    #[test]
    fn test_failed_follow_retries_shorter_match() {
        let not_b = Follow::new("b", true, false, LIMIT).unwrap();
        let m = matcher("a+", vec![not_b]);
        assert_eq!(m.find_at("aab", 0, false), Some(0..1));
        assert_eq!(m.find_at("ab", 0, false), None);
        assert_eq!(m.find_at("ab aa", 0, false), Some(3..5));
    }

    #[test]
    fn test_shorter_match_keeps_its_own_captures() {
        let not_b = Follow::new("b", true, false, LIMIT).unwrap();
        let m = matcher(r"(a+)", vec![not_b]);
        let range = m.find_at("aab", 0, false).unwrap();
        let captures = m.capture_slots("aab", &range);
        assert_eq!(captures.by_index(1), Some("a"));
    }

    #[test]
    fn test_follow_check_is_size_capped() {
        assert!(Follow::new(r"(?:\w{1000}){1000}", false, false, LIMIT).is_err());
    }

    #[test]
    fn test_template_escapes_captured_text() {
        let begin = matcher(r"<<(\w+|\*)", vec![]);
        let text = "<<* body *";
        let range = begin.find_at(text, 0, false).unwrap();
        let captures = begin.capture_slots(text, &range);

        let template = EndTemplate::new(
            vec![TemplatePiece::Text("^".to_string()), TemplatePiece::Group(1)],
            vec![],
            false,
            1 << 20,
        );
        let end = template.instantiate(&captures).unwrap();
        assert_eq!(end.as_str(), r"^\*");
        assert_eq!(end.find_at(text, range.end, false), None);
        assert_eq!(end.find_at("<<*\n*", 3, false), Some(4..5));
    }

    #[test]
    fn test_template_named_group() {
        let begin = matcher(r"(?P<fence>`{3,})", vec![]);
        let text = "````code````";
        let range = begin.find_at(text, 0, false).unwrap();
        let captures = begin.capture_slots(text, &range);

        let template = EndTemplate::new(
            vec![TemplatePiece::Named("fence".to_string())],
            vec![],
            false,
            1 << 20,
        );
        let end = template.instantiate(&captures).unwrap();
        assert_eq!(end.find_at(text, range.end, false), Some(8..12));
    }
}
