//! `match` parsing and skeleton emission.

use std::ops::Range;

use sable_common::{MarkerPayload, MatchTarget, Pattern, Span};

use crate::arms::{parse_arms, trim_range, unterminated_string, ArmBody, ArmSrc};
use crate::error::{PrepErrorKind, PrepFault};
use crate::scan::{matching_brace, only_trivia, split_top_level, Scanner};
use crate::unit::Unit;

pub use sable_common::marker::INFER_PLACEHOLDER;

/// A parsed `match`, positioned in the original source.
#[derive(Debug)]
pub(crate) struct MatchSrc {
    /// Source ranges of the scrutinee slots, trimmed.
    pub slots: Vec<Range<usize>>,
    pub tuple: bool,
    pub arms: Vec<ArmSrc>,
    /// Offset just past the closing brace.
    pub end: usize,
}

impl<'a> Unit<'a> {
    /// Parse the `match` whose keyword starts at `keyword`.
    pub(crate) fn parse_match(&mut self, keyword: usize, limit: usize) -> Result<MatchSrc, PrepFault> {
        let src = self.src;
        let after = keyword + "match".len();
        let mut scanner = Scanner::new(src, after..limit);
        let mut open = None;
        while let Some(c) = scanner.next_code().map_err(unterminated_string)? {
            if c.ch == '{' && c.depth == 0 {
                open = Some(c.pos);
                break;
            }
        }
        let unterminated = || {
            PrepFault::at(PrepErrorKind::UnterminatedBlock { construct: "match" }, keyword, after)
        };
        let open = open.ok_or_else(unterminated)?;
        let close = matching_brace(src, open, limit)
            .map_err(unterminated_string)?
            .ok_or_else(unterminated)?;

        let scrutinee = trim_range(src, after..open);
        if scrutinee.is_empty() {
            return Err(PrepFault::at(PrepErrorKind::MissingScrutinee, keyword, open));
        }
        let (slots, tuple) = self.scrutinee_slots(scrutinee)?;

        let arms = parse_arms(src, open + 1..close)?;
        if arms.is_empty() {
            return Err(PrepFault::at(PrepErrorKind::EmptyMatch, keyword, close + 1));
        }
        let arity = if tuple { slots.len() } else { 1 };
        for arm in &arms {
            check_arity(&arm.pattern, arity, tuple).map_err(|kind| {
                PrepFault::at(kind, arm.span.start as usize, arm.span.end as usize)
            })?;
        }
        Ok(MatchSrc {
            slots,
            tuple,
            arms,
            end: close + 1,
        })
    }

    /// `(a, b)` splits into one slot per element; anything else is one slot.
    fn scrutinee_slots(&self, range: Range<usize>) -> Result<(Vec<Range<usize>>, bool), PrepFault> {
        let src = self.src;
        let text = &src[range.clone()];
        let single = Ok((vec![range.clone()], false));
        if !text.starts_with('(') {
            return single;
        }
        match matching_paren(text) {
            Some(close) if close == text.len() - 1 => {}
            _ => return single,
        }
        let inner = range.start + 1..range.end - 1;
        let parts = split_top_level(&src[inner.clone()], &[',']).map_err(|at| unterminated_string(inner.start + at))?;
        if parts.len() < 2 {
            return single;
        }
        let mut slots: Vec<Range<usize>> = parts
            .into_iter()
            .map(|r| trim_range(src, inner.start + r.start..inner.start + r.end))
            .collect();
        if slots.last().is_some_and(|r| r.is_empty()) {
            slots.pop();
        }
        if slots.iter().any(|r| r.is_empty()) {
            return Err(PrepFault::at(PrepErrorKind::MissingScrutinee, range.start, range.end));
        }
        if slots.len() > self.options.max_tuple_arity {
            return Err(PrepFault::at(
                PrepErrorKind::TupleArityExceeded {
                    arity: slots.len(),
                    max: self.options.max_tuple_arity,
                },
                range.start,
                range.end,
            ));
        }
        Ok((slots, true))
    }

    /// Emit the skeleton for `parsed` with the given target.
    pub(crate) fn emit_match(
        &mut self,
        parsed: &MatchSrc,
        target: MatchTarget,
        ty: Option<String>,
        span: Span,
        indent: &str,
    ) -> Result<(), PrepFault> {
        let src = self.src;
        let match_id = self.names.next("match");
        let scrut = self.names.fresh("scrut");
        let whole = self.origin(span.start as usize, span.end as usize);

        if let MatchTarget::Assign { name, declare: true, .. } = &target {
            let marker = self.marker(
                whole,
                MarkerPayload::Target {
                    match_id,
                    name: name.clone(),
                },
            );
            self.out.push_marker(indent, &marker)?;
            let ty = ty.as_deref().unwrap_or(INFER_PLACEHOLDER);
            self.out.push(format!("{indent}var {name} {ty}"), whole.line);
        }

        for (slot, range) in parsed.slots.iter().enumerate() {
            let binding = if parsed.tuple {
                format!("{scrut}_{slot}")
            } else {
                scrut.clone()
            };
            let origin = self.origin(range.start, range.end);
            let marker = self.marker(
                origin,
                MarkerPayload::Scrutinee {
                    match_id,
                    slot: slot as u32,
                    text: src[range.clone()].to_string(),
                },
            );
            self.out.push_marker(indent, &marker)?;
            self.out
                .push_source(src, range.clone(), self.index, &format!("{indent}{binding} := "), "");
        }

        let has_wildcard = parsed
            .arms
            .iter()
            .any(|arm| arm.guard.is_none() && arm.pattern.is_irrefutable());
        let marker = self.marker(
            whole,
            MarkerPayload::Dispatch {
                match_id,
                arity: parsed.slots.len() as u32,
                arms: parsed.arms.len() as u32,
                target: target.clone(),
                has_wildcard,
            },
        );
        self.out.push_marker(indent, &marker)?;
        if parsed.tuple {
            self.out.push(format!("{indent}switch {{"), whole.line);
        } else {
            self.out.push(format!("{indent}switch {scrut} {{"), whole.line);
        }

        let inherited = inherit(&target);
        for (index, arm) in parsed.arms.iter().enumerate() {
            let origin = self.origin(arm.span.start as usize, arm.span.end as usize);
            let marker = self.marker(
                origin,
                MarkerPayload::Arm {
                    match_id,
                    index: index as u32,
                    pattern: arm.pattern.clone(),
                    guard: arm.guard.clone().map(|g| src[g].to_string()),
                    bindings: arm.pattern.bindings(),
                    block: matches!(arm.body, ArmBody::Block(_)),
                },
            );
            self.out.push_marker(indent, &marker)?;
            self.out.push(format!("{indent}case {index}:"), origin.line);

            let mut body_indent = format!("{indent}\t");
            if let Some(guard) = &arm.guard {
                let prefix = format!("{body_indent}if ");
                self.out.push_source(src, guard.clone(), self.index, &prefix, " {");
                body_indent.push('\t');
            }
            self.arm_body(arm, &inherited, &body_indent)?;
            if arm.guard.is_some() {
                self.out.push(format!("{indent}\t}}"), origin.line);
            }
        }
        self.out.push(format!("{indent}}}"), self.index.line_of(span.end.saturating_sub(1)));
        Ok(())
    }

    fn arm_body(&mut self, arm: &ArmSrc, target: &MatchTarget, indent: &str) -> Result<(), PrepFault> {
        let src = self.src;
        match &arm.body {
            ArmBody::Block(range) => {
                let tail = match target {
                    MatchTarget::Statement => None,
                    other => Some(other),
                };
                self.region(range.clone(), tail)
            }
            ArmBody::Expr(range) => {
                if starts_with_match(&src[range.clone()]) {
                    let nested = self.parse_match(range.start, range.end)?;
                    if !only_trivia(src, nested.end..range.end) {
                        let text = src[nested.end..range.end].trim().to_string();
                        return Err(PrepFault::at(
                            PrepErrorKind::TrailingText(text),
                            nested.end,
                            range.end,
                        ));
                    }
                    let span = Span::new(range.start as u32, nested.end as u32);
                    return self.emit_match(&nested, target.clone(), None, span, indent);
                }
                let prefix = match target {
                    MatchTarget::Statement => indent.to_string(),
                    MatchTarget::Return => format!("{indent}return "),
                    MatchTarget::Assign { name, .. } => format!("{indent}{name} = "),
                };
                self.out.push_source(src, range.clone(), self.index, &prefix, "");
                Ok(())
            }
        }
    }
}

/// Target seen by the arms of a match: nested matches assign to the same
/// variable without declaring it again.
fn inherit(target: &MatchTarget) -> MatchTarget {
    match target {
        MatchTarget::Assign { name, .. } => MatchTarget::Assign {
            name: name.clone(),
            declare: false,
            annotated: false,
        },
        other => other.clone(),
    }
}

fn starts_with_match(text: &str) -> bool {
    text.strip_prefix("match")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace() || c == '('))
}

/// Offset of the `)` closing the `(` at the start of `text`.
fn matching_paren(text: &str) -> Option<usize> {
    let mut scanner = Scanner::new(text, 0..text.len());
    while let Ok(Some(c)) = scanner.next_code() {
        if c.ch == ')' && c.depth == 1 {
            return Some(c.pos);
        }
    }
    None
}

fn check_arity(pattern: &Pattern, arity: usize, tuple: bool) -> Result<(), PrepErrorKind> {
    match pattern {
        Pattern::Or(alts) => alts.iter().try_for_each(|alt| check_arity(alt, arity, tuple)),
        Pattern::Wildcard => Ok(()),
        Pattern::Tuple(elems) if !tuple || elems.len() != arity => Err(PrepErrorKind::TupleArityMismatch {
            expected: arity,
            found: elems.len(),
        }),
        Pattern::Tuple(_) => Ok(()),
        Pattern::Binding(name) if tuple => Err(PrepErrorKind::InvalidPattern(format!(
            "a tuple of {arity} values cannot be bound to `{name}`"
        ))),
        _ if tuple => Err(PrepErrorKind::TupleArityMismatch {
            expected: arity,
            found: 1,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_patterns_must_match_arity() {
        let pair = Pattern::Tuple(vec![Pattern::Wildcard, Pattern::Wildcard]);
        assert_eq!(check_arity(&pair, 2, true), Ok(()));
        assert_eq!(
            check_arity(&pair, 3, true),
            Err(PrepErrorKind::TupleArityMismatch { expected: 3, found: 2 })
        );
        assert_eq!(
            check_arity(&pair, 1, false),
            Err(PrepErrorKind::TupleArityMismatch { expected: 1, found: 2 })
        );
        assert!(check_arity(&Pattern::Binding("t".into()), 2, true).is_err());
        assert_eq!(check_arity(&Pattern::Wildcard, 2, true), Ok(()));
    }

    #[test]
    fn nested_match_detection() {
        assert!(starts_with_match("match x { _ => 1 }"));
        assert!(starts_with_match("match(a, b) {"));
        assert!(!starts_with_match("matches(x)"));
    }
}
