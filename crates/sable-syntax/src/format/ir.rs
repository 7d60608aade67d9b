//! Wadler-Lindig document IR for printing host code.
//!
//! The walker lowers the syntax tree into this IR; the printer decides the
//! layout. Groups render flat when they fit the configured width and broken
//! otherwise.

/// A document IR node in the Wadler-Lindig style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatIR {
    /// Literal text to emit verbatim.
    Text(String),
    /// A space in flat mode; a newline + indent in broken mode.
    Space,
    /// Always emits a newline + current indentation, regardless of mode.
    Hardline,
    /// Increase indentation of the child by one level.
    Indent(Box<FormatIR>),
    /// Try to render the child flat; break it if it does not fit.
    Group(Box<FormatIR>),
    /// Emit different content depending on the enclosing group's mode.
    IfBreak {
        flat: Box<FormatIR>,
        broken: Box<FormatIR>,
    },
    /// A sequence of IR nodes rendered in order.
    Concat(Vec<FormatIR>),
    /// Records the output line this position lands on under the given id.
    Anchor(usize),
    /// Produces no output.
    Empty,
}

// ── Helper constructors ─────────────────────────────────────────────────

pub fn text(s: impl Into<String>) -> FormatIR {
    FormatIR::Text(s.into())
}

pub fn space() -> FormatIR {
    FormatIR::Space
}

pub fn hardline() -> FormatIR {
    FormatIR::Hardline
}

/// Nothing when flat, a newline when broken.
pub fn softline() -> FormatIR {
    if_break(FormatIR::Empty, hardline())
}

pub fn indent(ir: FormatIR) -> FormatIR {
    FormatIR::Indent(Box::new(ir))
}

pub fn group(ir: FormatIR) -> FormatIR {
    FormatIR::Group(Box::new(ir))
}

pub fn concat(parts: Vec<FormatIR>) -> FormatIR {
    FormatIR::Concat(parts)
}

pub fn if_break(flat: FormatIR, broken: FormatIR) -> FormatIR {
    FormatIR::IfBreak {
        flat: Box::new(flat),
        broken: Box::new(broken),
    }
}

/// Interleave `parts` with `sep`.
pub fn join(parts: impl IntoIterator<Item = FormatIR>, sep: FormatIR) -> FormatIR {
    let mut out = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(sep.clone());
        }
        out.push(part);
    }
    concat(out)
}

/// `open items close`, one item per line with a trailing comma when broken.
pub fn delimited(open: &str, items: Vec<FormatIR>, close: &str) -> FormatIR {
    if items.is_empty() {
        return text(format!("{open}{close}"));
    }
    group(concat(vec![
        text(open),
        indent(concat(vec![
            softline(),
            join(items, concat(vec![text(","), space()])),
            if_break(FormatIR::Empty, text(",")),
        ])),
        softline(),
        text(close),
    ]))
}
