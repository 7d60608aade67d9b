//! Splitting a `match` block into arms.
//!
//! An arm is `pattern [if guard] => body`. The pattern ends at the first
//! top-level `=>`; a block body runs to its matching brace and an expression
//! body runs to the next top-level comma. Commas and arrows inside string,
//! rune and raw literals or comments never count.

use std::ops::Range;

use sable_common::{Pattern, Span};

use crate::error::{PrepErrorKind, PrepFault};
use crate::pattern::parse_pattern;
use crate::scan::{is_ident_char, matching_brace, CharClass, ScanState, Scanner};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArmBody {
    /// Source range of the expression, trimmed.
    Expr(Range<usize>),
    /// Source range between the braces.
    Block(Range<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArmSrc {
    pub span: Span,
    pub pattern: Pattern,
    /// Source range of the guard expression, trimmed.
    pub guard: Option<Range<usize>>,
    pub body: ArmBody,
}

/// Parse the arms in `src[range]`, the inside of a match block.
pub(crate) fn parse_arms(src: &str, range: Range<usize>) -> Result<Vec<ArmSrc>, PrepFault> {
    let mut arms = Vec::new();
    let mut pos = skip_trivia(src, range.start, range.end);
    while pos < range.end {
        let arm = parse_arm(src, pos, range.end)?;
        pos = skip_trivia(src, arm.1, range.end);
        arms.push(arm.0);
    }
    Ok(arms)
}

/// Parse one arm starting at `start`; returns the arm and the offset after
/// its terminating comma (or block).
fn parse_arm(src: &str, start: usize, end: usize) -> Result<(ArmSrc, usize), PrepFault> {
    let arrow = find_arrow(src, start, end)?.ok_or_else(|| {
        let line_end = src[start..end].find('\n').map_or(end, |i| start + i);
        PrepFault::at(PrepErrorKind::MissingArrow, start, line_end)
    })?;

    let (pattern_range, guard) = split_guard(src, start, arrow)?;
    let pattern_text = &src[pattern_range.clone()];
    if pattern_text.trim().is_empty() {
        return Err(PrepFault::at(
            PrepErrorKind::InvalidPattern("missing pattern".into()),
            start,
            arrow,
        ));
    }
    let pattern = parse_pattern(pattern_text, pattern_range.start)?;
    if let Some(guard) = &guard {
        if guard.is_empty() {
            return Err(PrepFault::at(
                PrepErrorKind::InvalidPattern("`if` without a guard condition".into()),
                guard.start,
                arrow,
            ));
        }
    }

    let body_start = skip_trivia(src, arrow + 2, end);
    let (body, next) = if src[body_start..end].starts_with('{') {
        let close = matching_brace(src, body_start, end)
            .map_err(unterminated_string)?
            .ok_or_else(|| {
                PrepFault::at(PrepErrorKind::UnterminatedBlock { construct: "arm" }, body_start, body_start + 1)
            })?;
        let mut next = skip_trivia(src, close + 1, end);
        if src[next..end].starts_with(',') {
            next += 1;
        }
        (ArmBody::Block(body_start + 1..close), next)
    } else {
        let (body_end, next) = expression_end(src, body_start, end)?;
        let body = trim_range(src, body_start..body_end);
        if body.is_empty() {
            return Err(PrepFault::at(PrepErrorKind::EmptyArmBody, start, arrow + 2));
        }
        (ArmBody::Expr(body), next)
    };

    let arm_end = match &body {
        ArmBody::Expr(r) => r.end,
        ArmBody::Block(r) => r.end + 1,
    };
    let arm = ArmSrc {
        span: Span::new(start as u32, arm_end as u32),
        pattern,
        guard,
        body,
    };
    Ok((arm, next))
}

/// Offset of the first top-level `=>` in `src[start..end]`.
fn find_arrow(src: &str, start: usize, end: usize) -> Result<Option<usize>, PrepFault> {
    let mut scanner = Scanner::new(src, start..end);
    while let Some(c) = scanner.next_code().map_err(unterminated_string)? {
        if c.ch == '=' && c.depth == 0 && src[c.pos + 1..end].starts_with('>') {
            return Ok(Some(c.pos));
        }
    }
    Ok(None)
}

/// Split an arm head at a whole-word, top-level `if`.
fn split_guard(
    src: &str,
    start: usize,
    end: usize,
) -> Result<(Range<usize>, Option<Range<usize>>), PrepFault> {
    let mut scanner = Scanner::new(src, start..end);
    while let Some(c) = scanner.next_code().map_err(unterminated_string)? {
        if c.ch != 'i' || c.depth != 0 || !src[c.pos..end].starts_with("if") {
            continue;
        }
        let before_ok = src[start..c.pos]
            .chars()
            .next_back()
            .map_or(true, |p| !is_ident_char(p));
        let after_ok = src[c.pos + 2..end]
            .chars()
            .next()
            .map_or(true, |n| !is_ident_char(n));
        if before_ok && after_ok {
            let guard = trim_range(src, c.pos + 2..end);
            return Ok((start..c.pos, Some(guard)));
        }
    }
    Ok((start..end, None))
}

/// End of an expression body and the offset where the next arm may start.
fn expression_end(src: &str, start: usize, end: usize) -> Result<(usize, usize), PrepFault> {
    let mut scanner = Scanner::new(src, start..end);
    while let Some(c) = scanner.next_code().map_err(unterminated_string)? {
        if c.depth != 0 {
            continue;
        }
        match c.ch {
            ',' => return Ok((c.pos, c.pos + 1)),
            '=' if src[c.pos + 1..end].starts_with('>') => {
                return Err(PrepFault::at(PrepErrorKind::MissingComma, start, c.pos));
            }
            _ => {}
        }
    }
    Ok((end, end))
}

/// Skip whitespace and comments. Stops on the opening delimiter of a
/// literal, which belongs to whatever comes next.
pub(crate) fn skip_trivia(src: &str, start: usize, end: usize) -> usize {
    let mut state = ScanState::default();
    let mut pos = start;
    while pos < end {
        let mut chars = src[pos..end].chars();
        let Some(ch) = chars.next() else {
            break;
        };
        match state.step(ch, chars.next()) {
            Ok(CharClass::Comment) => {}
            Ok(CharClass::Code) if ch.is_whitespace() => {}
            Ok(_) | Err(_) => return pos,
        }
        pos += ch.len_utf8();
    }
    end
}

pub(crate) fn trim_range(src: &str, range: Range<usize>) -> Range<usize> {
    let text = &src[range.clone()];
    let start = range.start + (text.len() - text.trim_start().len());
    let end = range.end - (text.len() - text.trim_end().len());
    start..end.max(start)
}

pub(crate) fn unterminated_string(at: usize) -> PrepFault {
    PrepFault::at(PrepErrorKind::UnterminatedString, at, at + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arms(src: &str) -> Vec<ArmSrc> {
        parse_arms(src, 0..src.len()).unwrap()
    }

    fn err(src: &str) -> PrepErrorKind {
        parse_arms(src, 0..src.len()).unwrap_err().kind
    }

    fn body_text<'a>(src: &'a str, arm: &ArmSrc) -> &'a str {
        match &arm.body {
            ArmBody::Expr(r) | ArmBody::Block(r) => &src[r.clone()],
        }
    }

    #[test]
    fn expression_and_block_bodies() {
        let src = "\n  Some(x) => x + 1,\n  None => {\n    log()\n    0\n  }\n";
        let parsed = arms(src);
        assert_eq!(parsed.len(), 2);
        assert_eq!(body_text(src, &parsed[0]), "x + 1");
        assert!(matches!(parsed[1].body, ArmBody::Block(_)));
        assert!(body_text(src, &parsed[1]).contains("log()"));
    }

    #[test]
    fn commas_inside_literals_do_not_split_arms() {
        let src = r#"Ok(s) => fmt.Sprintf("a, b => %s", s), Err(_) => `x, y`"#;
        let parsed = arms(src);
        assert_eq!(parsed.len(), 2);
        assert_eq!(body_text(src, &parsed[0]), r#"fmt.Sprintf("a, b => %s", s)"#);
        assert_eq!(body_text(src, &parsed[1]), "`x, y`");
    }

    #[test]
    fn bodies_may_start_with_a_literal() {
        let src = "Some(_) => \"a, b\",\n1 => 'x', // one\nNone => `n, o`";
        let parsed = arms(src);
        assert_eq!(parsed.len(), 3);
        assert_eq!(body_text(src, &parsed[0]), "\"a, b\"");
        assert_eq!(body_text(src, &parsed[1]), "'x'");
        assert_eq!(body_text(src, &parsed[2]), "`n, o`");
    }

    #[test]
    fn literal_patterns_follow_comments() {
        let src = "// first\n\"a\" => 1, /* then */ \"b\" => 2";
        let parsed = arms(src);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].pattern.to_string(), "\"b\"");
    }

    #[test]
    fn trivia_skip_stops_at_literals() {
        let src = "  // c\n  \"s\" x";
        assert_eq!(&src[skip_trivia(src, 0, src.len())..], "\"s\" x");
        assert_eq!(skip_trivia("   ", 0, 3), 3);
    }

    #[test]
    fn guard_is_split_at_whole_word_if() {
        let src = "Circle(r) if r > 10.0 => 0.0, iffy => 1";
        let parsed = arms(src);
        let guard = parsed[0].guard.clone().unwrap();
        assert_eq!(&src[guard], "r > 10.0");
        assert_eq!(parsed[1].guard, None);
        assert_eq!(parsed[1].pattern, Pattern::Binding("iffy".into()));
    }

    #[test]
    fn missing_comma_is_reported() {
        assert_eq!(err("A => 1\nB => 2"), PrepErrorKind::MissingComma);
    }

    #[test]
    fn missing_arrow_is_reported() {
        assert_eq!(err("A -> 1"), PrepErrorKind::MissingArrow);
    }

    #[test]
    fn empty_body_is_reported() {
        assert_eq!(err("A => , B => 2"), PrepErrorKind::EmptyArmBody);
    }

    #[test]
    fn nested_match_body_keeps_its_arrows() {
        let src = "Some(x) => match x { 1 => a, _ => b }, None => c";
        let parsed = arms(src);
        assert_eq!(parsed.len(), 2);
        assert_eq!(body_text(src, &parsed[0]), "match x { 1 => a, _ => b }");
    }
}
