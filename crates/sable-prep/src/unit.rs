//! Line-driven rewriting of one translation unit.
//!
//! [`Unit::region`] walks a range of the original source line by line. Lines
//! are copied through unchanged unless they start, in code, with one of the
//! recognized construct prefixes; those constructs are parsed as a whole and
//! replaced by their skeleton. Arm bodies are regions themselves, which is
//! how nested constructs get rewritten.

use std::ops::Range;

use sable_common::{LineIndex, Marker, MarkerId, MarkerPayload, MatchTarget, NameGen, Origin, Span};

use crate::buffer::Skeleton;
use crate::error::{PrepErrorKind, PrepFault};
use crate::scan::{is_ident_char, is_ident_start, only_trivia, CharClass, ScanState, Unterminated};
use crate::PrepOptions;

/// A construct recognized at the start of a line. Offsets are relative to
/// the trimmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Construct {
    Enum,
    Match {
        target: MatchTarget,
        /// Offset of the `match` keyword.
        keyword: usize,
        /// User-written type of an assignment target.
        ty: Option<String>,
    },
}

pub(crate) struct Unit<'a> {
    pub src: &'a str,
    pub index: &'a LineIndex,
    pub names: &'a mut NameGen,
    pub options: &'a PrepOptions,
    pub out: Skeleton,
}

impl<'a> Unit<'a> {
    /// Rewrite `src[range]`. `tail` is the target a trailing bare `match`
    /// statement in this region inherits.
    pub fn region(&mut self, range: Range<usize>, tail: Option<&MatchTarget>) -> Result<(), PrepFault> {
        let src = self.src;
        let mut state = ScanState::default();
        let mut pos = range.start;
        while pos < range.end {
            let line_end = line_end(src, pos, range.end);
            if state.in_code() {
                let line = &src[pos..line_end];
                let at = pos + (line.len() - line.trim_start().len());
                let indent = &src[pos..at];
                if let Some(construct) = detect(&src[at..line_end]) {
                    let end = match construct {
                        Construct::Enum => self.enum_decl(at, range.end, indent)?,
                        Construct::Match { target, keyword, ty } => {
                            let parsed = self.parse_match(at + keyword, range.end)?;
                            let target = match (target, tail) {
                                (MatchTarget::Statement, Some(inherited))
                                    if only_trivia(src, parsed.end..range.end) =>
                                {
                                    inherited.clone()
                                }
                                (target, _) => target,
                            };
                            let span = Span::new(at as u32, parsed.end as u32);
                            self.emit_match(&parsed, target, ty, span, indent)?;
                            parsed.end
                        }
                    };
                    let close_line_end = line_end_of(src, end, range.end);
                    if !only_trivia(src, end..close_line_end) {
                        let text = src[end..close_line_end].trim().to_string();
                        return Err(PrepFault::at(PrepErrorKind::TrailingText(text), end, close_line_end));
                    }
                    pos = close_line_end + 1;
                    state = ScanState::default();
                    continue;
                }
            }
            self.out.push(&src[pos..line_end], self.index.line_of(pos as u32));
            self.step_line(&mut state, pos, (line_end + 1).min(range.end))?;
            pos = line_end + 1;
        }
        Ok(())
    }

    /// Advance `state` over a copied line and reject `match` keywords that
    /// appear where no construct can start.
    fn step_line(&self, state: &mut ScanState, start: usize, end: usize) -> Result<(), PrepFault> {
        let text = &self.src[start..end];
        let mut code = String::with_capacity(text.len());
        let mut literal_start = start;
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let was_literal = state.in_string.is_some();
            let next = chars.peek().map(|&(_, n)| n);
            match state.step(c, next) {
                Ok(CharClass::Code) => code.push(c),
                Ok(CharClass::Literal) => {
                    if !was_literal {
                        literal_start = start + i;
                    }
                    code.push(' ');
                }
                Ok(CharClass::Comment) => code.push(' '),
                Err(Unterminated) => {
                    return Err(PrepFault::at(PrepErrorKind::UnterminatedString, literal_start, start + i));
                }
            }
        }
        if has_stray_match(&code) {
            return Err(PrepFault::at(PrepErrorKind::UnsupportedMatchPosition, start, end));
        }
        Ok(())
    }

    pub fn origin(&self, start: usize, end: usize) -> Origin {
        Origin::new(self.index.line_of(start as u32), Span::new(start as u32, end as u32))
    }

    pub fn marker(&mut self, origin: Origin, payload: MarkerPayload) -> Marker {
        Marker::new(MarkerId(self.names.next("marker")), origin, payload)
    }
}

fn line_end(src: &str, pos: usize, end: usize) -> usize {
    src[pos..end].find('\n').map_or(end, |i| pos + i)
}

/// End of the line containing `pos`, clamped to `end`.
fn line_end_of(src: &str, pos: usize, end: usize) -> usize {
    line_end(src, pos.min(end), end)
}

/// `text` with its leading `kw` removed, when `kw` is a whole word.
fn keyword<'t>(text: &'t str, kw: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(kw)?;
    if rest.chars().next().is_some_and(is_ident_char) {
        return None;
    }
    Some(rest)
}

fn ident(text: &str) -> Option<(&str, &str)> {
    if !text.chars().next().is_some_and(is_ident_start) {
        return None;
    }
    let len = text.find(|c: char| !is_ident_char(c)).unwrap_or(text.len());
    Some((&text[..len], &text[len..]))
}

/// Whether `rest`, the text after a `match` keyword, starts a scrutinee
/// rather than using `match` as an ordinary identifier.
fn starts_scrutinee(rest: &str) -> bool {
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return false;
    }
    match rest.trim_start().chars().next() {
        None => false,
        Some(c) => !matches!(c, '=' | ':' | ',' | ';' | ')' | '}' | ']' | '.' | '+' | '/' | '>' | '|' | '%'),
    }
}

/// Offset of `match` in `text` if what follows it opens a scrutinee.
fn match_keyword(text: &str, base: usize) -> Option<usize> {
    let rest = keyword(text, "match")?;
    starts_scrutinee(rest).then_some(base)
}

/// Recognize a construct at the start of a trimmed line.
pub(crate) fn detect(line: &str) -> Option<Construct> {
    if let Some(rest) = keyword(line, "enum") {
        let name = rest.trim_start();
        if rest.len() != name.len() && name.starts_with(is_ident_start) {
            return Some(Construct::Enum);
        }
        return None;
    }

    if let Some(keyword) = match_keyword(line, 0) {
        return Some(Construct::Match {
            target: MatchTarget::Statement,
            keyword,
            ty: None,
        });
    }

    if let Some(rest) = keyword(line, "return") {
        let after = rest.trim_start();
        let keyword = match_keyword(after, line.len() - after.len())?;
        return Some(Construct::Match {
            target: MatchTarget::Return,
            keyword,
            ty: None,
        });
    }

    for decl in ["var", "let"] {
        if let Some(rest) = keyword(line, decl) {
            return declaration(line, rest, decl == "let");
        }
    }

    let (name, rest) = ident(line)?;
    let rest = rest.trim_start();
    let (declare, value) = if let Some(value) = rest.strip_prefix(":=") {
        (true, value)
    } else if let Some(value) = rest.strip_prefix('=').filter(|v| !v.starts_with('=')) {
        (false, value)
    } else {
        return None;
    };
    let value = value.trim_start();
    let keyword = match_keyword(value, line.len() - value.len())?;
    Some(Construct::Match {
        target: MatchTarget::Assign {
            name: name.to_string(),
            declare,
            annotated: false,
        },
        keyword,
        ty: None,
    })
}

/// `var x [T] = match` or `let x[: T] = match`.
fn declaration(line: &str, rest: &str, colon_type: bool) -> Option<Construct> {
    let (name, rest) = ident(rest.trim_start())?;
    let eq = rest.find('=')?;
    if rest[eq + 1..].starts_with('=') {
        return None;
    }
    let mut ty = rest[..eq].trim();
    if colon_type && !ty.is_empty() {
        ty = ty.strip_prefix(':')?.trim();
    }
    let value = rest[eq + 1..].trim_start();
    let keyword = match_keyword(value, line.len() - value.len())?;
    Some(Construct::Match {
        target: MatchTarget::Assign {
            name: name.to_string(),
            declare: true,
            annotated: !ty.is_empty(),
        },
        keyword,
        ty: (!ty.is_empty()).then(|| ty.to_string()),
    })
}

/// Whether a code-only line uses `match` as an expression keyword.
fn has_stray_match(code: &str) -> bool {
    let mut search = 0;
    while let Some(found) = code[search..].find("match") {
        let at = search + found;
        search = at + "match".len();
        let before_ok = code[..at].chars().next_back().map_or(true, |c| !is_ident_char(c) && c != '.');
        if before_ok && match_keyword(&code[at..], at).is_some() {
            let next = code[search..].trim_start().chars().next();
            if next.is_some_and(|c| is_ident_start(c) || c == '(') {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(name: &str, declare: bool, annotated: bool) -> MatchTarget {
        MatchTarget::Assign {
            name: name.into(),
            declare,
            annotated,
        }
    }

    #[test]
    fn detects_every_match_form() {
        let cases = [
            ("match s {", MatchTarget::Statement, 0, None),
            ("return match s {", MatchTarget::Return, 7, None),
            ("return  match (a, b) {", MatchTarget::Return, 8, None),
            ("x := match s {", assign("x", true, false), 5, None),
            ("x = match s {", assign("x", false, false), 4, None),
            ("var x = match s {", assign("x", true, false), 8, None),
            ("var x float64 = match s {", assign("x", true, true), 16, Some("float64")),
            ("let x = match s {", assign("x", true, false), 8, None),
            ("let x: Option[int] = match s {", assign("x", true, true), 21, Some("Option[int]")),
        ];
        for (line, target, keyword, ty) in cases {
            assert_eq!(
                detect(line),
                Some(Construct::Match {
                    target,
                    keyword,
                    ty: ty.map(String::from)
                }),
                "{line}"
            );
            assert!(line[keyword..].starts_with("match"), "{line}");
        }
    }

    #[test]
    fn ordinary_code_is_not_a_construct() {
        for line in [
            "match := 3",
            "match = other",
            "matcher(x)",
            "x == match",
            "return matchAll(x)",
            "enumerate(xs)",
            "enum := 1",
            "var x = matches",
            "fmt.Println(x)",
        ] {
            assert_eq!(detect(line), None, "{line}");
        }
        assert_eq!(detect("enum Shape {"), Some(Construct::Enum));
    }

    #[test]
    fn stray_match_keywords() {
        assert!(has_stray_match("foo(match x {"));
        assert!(has_stray_match("if match (a, b) {"));
        assert!(!has_stray_match("x.match (y)"));
        assert!(!has_stray_match("match := 1"));
        assert!(!has_stray_match("rematch x"));
    }
}
