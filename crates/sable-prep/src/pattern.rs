//! Arm pattern parser.
//!
//! Turns the text between the start of an arm and its `=>` (or guard) into a
//! [`Pattern`]. Patterns are small and line-local, so this is a hand-written
//! recursive descent over characters rather than a token stream.

use rustc_hash::FxHashSet;

use sable_common::{LitKind, Literal, Pattern, VariantFields};

use crate::error::{PrepErrorKind, PrepFault};
use crate::scan::{is_ident_char, is_ident_start};

/// Parse and validate the pattern in `text`, which starts at byte `base` of
/// the original source.
pub(crate) fn parse_pattern(text: &str, base: usize) -> Result<Pattern, PrepFault> {
    let mut parser = PatternParser { text, pos: 0, base };
    let pattern = parser.or_pattern()?;
    parser.skip_ws();
    if parser.pos < text.len() {
        let rest = text[parser.pos..].trim();
        return Err(parser.error(format!("unexpected `{rest}`")));
    }
    check_bindings(&pattern)
        .map_err(|kind| PrepFault::at(kind, base, base + text.len()))?;
    Ok(pattern)
}

struct PatternParser<'a> {
    text: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> PatternParser<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), PrepFault> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`")))
        }
    }

    fn error(&self, message: String) -> PrepFault {
        let at = self.base + self.pos;
        PrepFault::at(PrepErrorKind::InvalidPattern(message), at, at)
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let start = self.pos;
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        Some(&self.text[start..self.pos])
    }

    fn or_pattern(&mut self) -> Result<Pattern, PrepFault> {
        let mut alts = vec![self.primary()?];
        while self.eat('|') {
            alts.push(self.primary()?);
        }
        if alts.len() == 1 {
            Ok(alts.remove(0))
        } else {
            Ok(Pattern::Or(alts))
        }
    }

    fn primary(&mut self) -> Result<Pattern, PrepFault> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.bump();
                let mut elems = Vec::new();
                let mut trailing_comma = false;
                while !self.eat(')') {
                    elems.push(self.or_pattern()?);
                    trailing_comma = self.eat(',');
                    if !trailing_comma {
                        self.expect(')')?;
                        break;
                    }
                }
                if elems.is_empty() {
                    return Err(self.error("empty tuple pattern".into()));
                }
                if elems.len() == 1 && !trailing_comma {
                    Ok(elems.remove(0))
                } else {
                    Ok(Pattern::Tuple(elems))
                }
            }
            Some('"' | '`' | '\'') => self.quoted(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => self.named(),
            Some(c) => Err(self.error(format!("unexpected `{c}`"))),
            None => Err(self.error("expected a pattern".into())),
        }
    }

    fn quoted(&mut self) -> Result<Pattern, PrepFault> {
        let start = self.pos;
        let Some(open) = self.bump() else {
            return Err(self.error("expected a literal".into()));
        };
        loop {
            match self.bump() {
                Some('\\') if open != '`' => {
                    self.bump();
                }
                Some(c) if c == open => break,
                Some(_) => {}
                None => {
                    let at = self.base + start;
                    return Err(PrepFault::at(PrepErrorKind::UnterminatedString, at, at));
                }
            }
        }
        let kind = if open == '\'' { LitKind::Rune } else { LitKind::String };
        Ok(Pattern::Literal(Literal::new(kind, &self.text[start..self.pos])))
    }

    fn number(&mut self) -> Result<Pattern, PrepFault> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
            self.skip_ws();
        }
        let digits = self.pos;
        let hex = self.text[digits..].starts_with("0x") || self.text[digits..].starts_with("0X");
        let mut float = false;
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-') && !hex && self.text[..self.pos].ends_with(['e', 'E']);
            if c == '.' || (!hex && matches!(c, 'e' | 'E')) {
                float = true;
            } else if !exponent_sign && !is_ident_char(c) {
                break;
            }
            self.bump();
        }
        if self.pos == digits {
            return Err(self.error("expected a number after `-`".into()));
        }
        let text: String = self.text[start..self.pos].split_whitespace().collect();
        let kind = if float { LitKind::Float } else { LitKind::Int };
        Ok(Pattern::Literal(Literal::new(kind, text)))
    }

    fn named(&mut self) -> Result<Pattern, PrepFault> {
        let start = self.pos;
        let Some(first) = self.ident() else {
            return Err(self.error("expected a pattern".into()));
        };
        match first {
            "_" => return Ok(Pattern::Wildcard),
            "true" | "false" => return Ok(Pattern::Literal(Literal::new(LitKind::Bool, first))),
            "nil" => {
                let at = self.base + start;
                return Err(PrepFault::at(
                    PrepErrorKind::InvalidPattern("`nil` cannot be matched, use `None`".into()),
                    at,
                    at + 3,
                ));
            }
            _ => {}
        }

        let (qualifier, name) = if self.peek() == Some('.') {
            self.bump();
            let Some(name) = self.ident() else {
                return Err(self.error(format!("expected a variant name after `{first}.`")));
            };
            (Some(first.to_string()), name)
        } else {
            (None, first)
        };

        let starts_upper = name.chars().next().is_some_and(char::is_uppercase);
        self.skip_ws();
        let opens_fields = matches!(self.peek(), Some('(' | '{'));
        if qualifier.is_none() && !starts_upper {
            if opens_fields {
                return Err(self.error(format!("variant `{name}` must start with an uppercase letter")));
            }
            return Ok(Pattern::Binding(name.to_string()));
        }
        if !starts_upper {
            return Err(self.error(format!("variant `{name}` must start with an uppercase letter")));
        }

        let fields = match self.peek() {
            Some('(') => {
                self.bump();
                let mut pats = Vec::new();
                while !self.eat(')') {
                    pats.push(self.or_pattern()?);
                    if !self.eat(',') {
                        self.expect(')')?;
                        break;
                    }
                }
                VariantFields::Positional(pats)
            }
            Some('{') => {
                self.bump();
                VariantFields::Named(self.named_fields()?)
            }
            _ => VariantFields::Unit,
        };
        Ok(Pattern::Variant {
            qualifier,
            name: name.to_string(),
            fields,
        })
    }

    fn named_fields(&mut self) -> Result<Vec<(String, Pattern)>, PrepFault> {
        let mut fields = Vec::new();
        loop {
            if self.eat('}') {
                return Ok(fields);
            }
            self.skip_ws();
            if self.text[self.pos..].starts_with("..") {
                self.pos += 2;
                self.expect('}')?;
                return Ok(fields);
            }
            let Some(field) = self.ident() else {
                return Err(self.error("expected a field name".into()));
            };
            let pattern = if self.eat(':') {
                self.or_pattern()?
            } else {
                Pattern::Binding(field.to_string())
            };
            fields.push((field.to_string(), pattern));
            if !self.eat(',') {
                self.expect('}')?;
                return Ok(fields);
            }
        }
    }
}

/// Reject repeated names and or-patterns whose alternatives disagree.
fn check_bindings(pattern: &Pattern) -> Result<Vec<String>, PrepErrorKind> {
    match pattern {
        Pattern::Wildcard | Pattern::Literal(_) => Ok(Vec::new()),
        Pattern::Binding(name) => Ok(vec![name.clone()]),
        Pattern::Variant { fields, .. } => match fields {
            VariantFields::Unit => Ok(Vec::new()),
            VariantFields::Positional(pats) => disjoint(pats.iter()),
            VariantFields::Named(pats) => disjoint(pats.iter().map(|(_, p)| p)),
        },
        Pattern::Tuple(elems) => disjoint(elems.iter()),
        Pattern::Or(alts) => {
            let mut expected: Option<Vec<String>> = None;
            for alt in alts {
                let mut names = check_bindings(alt)?;
                names.sort();
                match &expected {
                    None => expected = Some(names),
                    Some(first) if *first != names => {
                        return Err(PrepErrorKind::OrPatternBindingMismatch)
                    }
                    Some(_) => {}
                }
            }
            Ok(expected.unwrap_or_default())
        }
    }
}

fn disjoint<'p>(pats: impl Iterator<Item = &'p Pattern>) -> Result<Vec<String>, PrepErrorKind> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for p in pats {
        for name in check_bindings(p)? {
            if !seen.insert(name.clone()) {
                return Err(PrepErrorKind::DuplicateBinding(name));
            }
            out.push(name);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Pattern {
        parse_pattern(text, 0).unwrap()
    }

    fn kind(text: &str) -> PrepErrorKind {
        parse_pattern(text, 0).unwrap_err().kind
    }

    #[test]
    fn parses_every_surface_form() {
        for text in [
            "_",
            "r",
            "Point",
            "Shape.Point",
            "Circle(r)",
            "Rect { w, h: height }",
            "(Some(x), None)",
            "Some(\"a, b\")",
            "-1",
            "2.5",
            "'x'",
            "true",
            "Circle(_) | Point",
        ] {
            assert_eq!(parse(text).to_string(), text, "round trip of {text}");
        }
    }

    #[test]
    fn rest_in_named_fields_is_accepted() {
        let pat = parse("Rect { w, .. }");
        let Pattern::Variant { fields: VariantFields::Named(fields), .. } = pat else {
            panic!("expected named fields");
        };
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn parenthesized_pattern_is_not_a_tuple() {
        assert_eq!(parse("(x)"), Pattern::Binding("x".into()));
        assert!(matches!(parse("(x,)"), Pattern::Tuple(ref elems) if elems.len() == 1));
    }

    #[test]
    fn negative_numbers_keep_their_sign() {
        assert_eq!(
            parse("- 3"),
            Pattern::Literal(Literal::new(LitKind::Int, "-3"))
        );
        assert_eq!(
            parse("1e-3"),
            Pattern::Literal(Literal::new(LitKind::Float, "1e-3"))
        );
    }

    #[test]
    fn rejects_nil_and_lowercase_variants() {
        assert!(matches!(kind("nil"), PrepErrorKind::InvalidPattern(_)));
        assert!(matches!(kind("some(x)"), PrepErrorKind::InvalidPattern(_)));
        assert!(matches!(kind("Circle(r"), PrepErrorKind::InvalidPattern(_)));
        assert!(matches!(kind("Circle(r) extra"), PrepErrorKind::InvalidPattern(_)));
    }

    #[test]
    fn duplicate_bindings_are_rejected() {
        assert_eq!(kind("(x, x)"), PrepErrorKind::DuplicateBinding("x".into()));
        assert_eq!(
            kind("Rect { w, h: w }"),
            PrepErrorKind::DuplicateBinding("w".into())
        );
    }

    #[test]
    fn or_alternatives_must_agree() {
        assert_eq!(kind("Circle(r) | Point"), PrepErrorKind::OrPatternBindingMismatch);
        assert!(parse_pattern("Circle(r) | Square(r)", 0).is_ok());
    }

    #[test]
    fn error_offsets_are_absolute() {
        let err = parse_pattern("Circle(", 100).unwrap_err();
        assert_eq!(err.span.start, 107);
    }
}
