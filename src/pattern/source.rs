//! Regex source scanning
//!
//!     Grammar patterns are written in `regex` syntax with three extensions: `{{name}}`
//!     splices a named fragment, a trailing lookahead is lowered to a follow check, and end
//!     patterns may hold backreferences to their begin match. None of these survive into the
//!     string handed to the regex engine, so the compiler needs to see the structure of a
//!     source string without fully parsing it: where groups open and close, which groups
//!     capture, where escapes and character classes are (so a `(` inside `[(]` is not a
//!     group).
//!
//!     This module tokenizes pattern sources with logos into [Piece]s and implements the
//!     rewrites on top of that token stream. Errors are returned as plain reasons; the
//!     compiler attaches the grammar name.

use super::matcher::TemplatePiece;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece {
    #[regex(r"\\[1-9][0-9]*")]
    Backref,

    #[regex(r"\\k<[A-Za-z_][A-Za-z0-9_]*>")]
    NamedBackref,

    #[regex(r"\\[^1-9k]")]
    Escape,

    #[regex(r"\[\^?\]?([^\]\\]|\\[^\n])*\]")]
    Class,

    #[regex(r"\(\?P?<[A-Za-z_][A-Za-z0-9_]*>")]
    NamedOpen,

    #[token("(?=")]
    LookaheadOpen,

    #[token("(?!")]
    NegativeLookaheadOpen,

    #[token("(?<=")]
    #[token("(?<!")]
    LookbehindOpen,

    #[regex(r"\(\?[a-zA-Z-]*:")]
    UncapturedOpen,

    #[regex(r"\(\?[a-zA-Z-]+\)")]
    Flags,

    #[token("(")]
    Open,

    #[token(")")]
    Close,

    #[token("|")]
    Alternate,

    #[regex(r"\{\{[A-Za-z_][A-Za-z0-9_]*\}\}")]
    Reference,

    #[token("{")]
    Brace,

    #[regex(r"[^\\\[(){|]+")]
    Literal,
}

impl Piece {
    fn opens_group(self) -> bool {
        matches!(
            self,
            Piece::Open
                | Piece::NamedOpen
                | Piece::UncapturedOpen
                | Piece::LookaheadOpen
                | Piece::NegativeLookaheadOpen
                | Piece::LookbehindOpen
        )
    }

    fn is_backreference(self) -> bool {
        matches!(self, Piece::Backref | Piece::NamedBackref)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lexeme<'a> {
    pub kind: Piece,
    pub text: &'a str,
}

impl Lexeme<'_> {
    /// Name inside `{{name}}` or `\k<name>`.
    pub fn name(&self) -> &str {
        match self.kind {
            Piece::Reference => &self.text[2..self.text.len() - 2],
            Piece::NamedBackref => &self.text[3..self.text.len() - 1],
            _ => self.text,
        }
    }
}

pub(crate) fn lex(source: &str) -> Result<Vec<Lexeme<'_>>, String> {
    let mut lexer = Piece::lexer(source);
    let mut lexemes = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(kind) => lexemes.push(Lexeme {
                kind,
                text: lexer.slice(),
            }),
            Err(()) => {
                return Err(format!(
                    "invalid pattern syntax at offset {} in `{}`",
                    lexer.span().start,
                    source
                ))
            }
        }
    }

    Ok(lexemes)
}

fn join(lexemes: &[Lexeme<'_>]) -> String {
    lexemes.iter().map(|lexeme| lexeme.text).collect()
}

/// Rewrites every anonymous capture group as a non-capturing one. Named groups are kept.
pub(crate) fn anonymize(source: &str) -> Result<String, String> {
    let lexemes = lex(source)?;
    Ok(lexemes
        .iter()
        .map(|lexeme| match lexeme.kind {
            Piece::Open => "(?:",
            _ => lexeme.text,
        })
        .collect())
}

pub(crate) fn has_backreference(source: &str) -> Result<bool, String> {
    Ok(lex(source)?.iter().any(|lexeme| lexeme.kind.is_backreference()))
}

/// For every lexeme that opens or closes a group, the index of its partner.
fn pair_groups(lexemes: &[Lexeme<'_>]) -> Result<Vec<Option<usize>>, String> {
    let mut partners = vec![None; lexemes.len()];
    let mut open = Vec::new();

    for (i, lexeme) in lexemes.iter().enumerate() {
        if lexeme.kind.opens_group() {
            open.push(i);
        } else if lexeme.kind == Piece::Close {
            let Some(start) = open.pop() else {
                return Err("unbalanced `)`".to_string());
            };
            partners[start] = Some(i);
            partners[i] = Some(start);
        }
    }

    if open.is_empty() {
        Ok(partners)
    } else {
        Err("unclosed group".to_string())
    }
}

fn has_top_level_alternation(lexemes: &[Lexeme<'_>]) -> bool {
    let mut depth = 0usize;
    for lexeme in lexemes {
        match lexeme.kind {
            kind if kind.opens_group() => depth += 1,
            Piece::Close => depth = depth.saturating_sub(1),
            Piece::Alternate if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Whether an inline flag group such as `(?i)` sits outside every group, where it would
/// carry over into whatever is spliced after `source`.
fn has_top_level_flags(lexemes: &[Lexeme<'_>]) -> bool {
    let mut depth = 0usize;
    for lexeme in lexemes {
        match lexeme.kind {
            kind if kind.opens_group() => depth += 1,
            Piece::Close => depth = depth.saturating_sub(1),
            Piece::Flags if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Whether `source` has to be wrapped in a group before it can be concatenated.
pub(crate) fn needs_grouping(source: &str) -> Result<bool, String> {
    let lexemes = lex(source)?;
    Ok(has_top_level_alternation(&lexemes) || has_top_level_flags(&lexemes))
}

/// Whether `source` has to be wrapped in a group before it can be an alternative.
pub(crate) fn leaks_flags(source: &str) -> Result<bool, String> {
    Ok(has_top_level_flags(&lex(source)?))
}

/// Splits an end pattern into literal text and backreferences.
pub(crate) fn template_pieces(source: &str) -> Result<Vec<TemplatePiece>, String> {
    let mut pieces = Vec::new();
    let mut text = String::new();

    for lexeme in lex(source)? {
        let reference = match lexeme.kind {
            Piece::Backref => lexeme.text[1..]
                .parse()
                .map(TemplatePiece::Group)
                .map_err(|_| format!("invalid backreference `{}`", lexeme.text))?,
            Piece::NamedBackref => TemplatePiece::Named(lexeme.name().to_string()),
            _ => {
                text.push_str(lexeme.text);
                continue;
            }
        };
        if !text.is_empty() {
            pieces.push(TemplatePiece::Text(std::mem::take(&mut text)));
        }
        pieces.push(reference);
    }

    if !text.is_empty() {
        pieces.push(TemplatePiece::Text(text));
    }
    Ok(pieces)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FollowSource {
    pub source: String,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lowered {
    pub body: String,
    pub follows: Vec<FollowSource>,
}

/// Strips trailing `(?=..)` / `(?!..)` groups off a pattern, returning them as follow checks.
///
/// Lookbehind, lookahead anywhere but the tail, and a trailing lookahead after a top-level
/// alternation (where it would only bind the last branch) are rejected.
pub(crate) fn lower_lookaheads(source: &str) -> Result<Lowered, String> {
    let lexemes = lex(source)?;
    let partners = pair_groups(&lexemes)?;

    let mut end = lexemes.len();
    let mut follows = Vec::new();
    let mut lowered = Vec::new();

    while end > 0 && lexemes[end - 1].kind == Piece::Close {
        let close = end - 1;
        let Some(open) = partners[close] else {
            break;
        };
        let negated = match lexemes[open].kind {
            Piece::LookaheadOpen => false,
            Piece::NegativeLookaheadOpen => true,
            _ => break,
        };
        let inner = &lexemes[open + 1..close];
        if inner.iter().any(|lexeme| lexeme.kind.is_backreference()) {
            return Err("backreferences are not supported inside lookahead".to_string());
        }
        follows.push(FollowSource {
            source: join(inner),
            negated,
        });
        lowered.push(open);
        end = open;
    }

    for (i, lexeme) in lexemes.iter().enumerate() {
        match lexeme.kind {
            Piece::LookbehindOpen => return Err("lookbehind is not supported".to_string()),
            Piece::LookaheadOpen | Piece::NegativeLookaheadOpen if !lowered.contains(&i) => {
                return Err("lookahead is only supported at the end of a pattern".to_string())
            }
            _ => {}
        }
    }

    if !follows.is_empty() && has_top_level_alternation(&lexemes[..end]) {
        return Err(
            "a trailing lookahead cannot follow a top-level alternation; wrap the alternatives in a group"
                .to_string(),
        );
    }

    Ok(Lowered {
        body: join(&lexemes[..end]),
        follows,
    })
}
