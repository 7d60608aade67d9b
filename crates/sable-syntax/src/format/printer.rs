//! Wadler-Lindig printer for the format IR.
//!
//! The printer converts a `FormatIR` tree into a string by deciding at each
//! `Group` boundary whether to render flat or broken. Indentation is emitted
//! lazily, so blank lines never carry trailing whitespace.

use super::ir::FormatIR;

/// Configuration for the printed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    /// Indent with one tab per level. Default: true.
    pub indent_with_tabs: bool,
    /// Spaces per level when not using tabs, and the width of a tab when
    /// measuring lines. Default: 4.
    pub indent_size: usize,
    /// Maximum line width before groups break. Default: 100.
    pub max_width: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_with_tabs: true,
            indent_size: 4,
            max_width: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

#[derive(Debug)]
struct PrintCmd<'a> {
    /// Indentation in levels.
    level: usize,
    mode: Mode,
    ir: &'a FormatIR,
}

/// Printed text plus the 1-based line each anchor landed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintOutput {
    pub text: String,
    pub anchors: Vec<(usize, u32)>,
}

/// Render a `FormatIR` tree as a string.
pub fn print(ir: &FormatIR, config: &FormatConfig) -> String {
    print_with_anchors(ir, config).text
}

/// Render a `FormatIR` tree and report where each `Anchor` landed.
pub fn print_with_anchors(ir: &FormatIR, config: &FormatConfig) -> PrintOutput {
    let mut out = String::new();
    let mut anchors = Vec::new();
    let mut col: usize = 0;
    let mut line: u32 = 1;
    // Indentation owed to the current line, written before the next text.
    let mut owed_indent: Option<usize> = None;
    let mut stack: Vec<PrintCmd> = vec![PrintCmd {
        level: 0,
        mode: Mode::Break,
        ir,
    }];

    let newline = |out: &mut String, level: usize, col: &mut usize, line: &mut u32| {
        out.push('\n');
        *line += 1;
        *col = level * config.indent_size;
        level
    };

    while let Some(cmd) = stack.pop() {
        match cmd.ir {
            FormatIR::Empty => {}

            FormatIR::Anchor(id) => anchors.push((*id, line)),

            FormatIR::Text(s) => {
                if s.is_empty() {
                    continue;
                }
                if let Some(level) = owed_indent.take() {
                    out.push_str(&indent_str(level, config));
                }
                out.push_str(s);
                col += s.chars().count();
            }

            FormatIR::Space => match cmd.mode {
                Mode::Flat => {
                    if let Some(level) = owed_indent.take() {
                        out.push_str(&indent_str(level, config));
                    }
                    out.push(' ');
                    col += 1;
                }
                Mode::Break => {
                    owed_indent = Some(newline(&mut out, cmd.level, &mut col, &mut line));
                }
            },

            FormatIR::Hardline => {
                owed_indent = Some(newline(&mut out, cmd.level, &mut col, &mut line));
            }

            FormatIR::Indent(child) => stack.push(PrintCmd {
                level: cmd.level + 1,
                mode: cmd.mode,
                ir: child,
            }),

            FormatIR::Group(child) => {
                let flat_width = measure_flat(child);
                let mode = if flat_width != usize::MAX && col + flat_width <= config.max_width {
                    Mode::Flat
                } else {
                    Mode::Break
                };
                stack.push(PrintCmd {
                    level: cmd.level,
                    mode,
                    ir: child,
                });
            }

            FormatIR::IfBreak { flat, broken } => {
                let ir = match cmd.mode {
                    Mode::Flat => flat,
                    Mode::Break => broken,
                };
                stack.push(PrintCmd {
                    level: cmd.level,
                    mode: cmd.mode,
                    ir,
                });
            }

            FormatIR::Concat(parts) => {
                for part in parts.iter().rev() {
                    stack.push(PrintCmd {
                        level: cmd.level,
                        mode: cmd.mode,
                        ir: part,
                    });
                }
            }
        }
    }

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    PrintOutput { text: out, anchors }
}

fn indent_str(level: usize, config: &FormatConfig) -> String {
    if config.indent_with_tabs {
        "\t".repeat(level)
    } else {
        " ".repeat(level * config.indent_size)
    }
}

/// Width of an IR node rendered flat; `usize::MAX` if it contains a `Hardline`.
fn measure_flat(ir: &FormatIR) -> usize {
    match ir {
        FormatIR::Empty | FormatIR::Anchor(_) => 0,
        FormatIR::Text(s) => s.chars().count(),
        FormatIR::Space => 1,
        FormatIR::Hardline => usize::MAX,
        FormatIR::Indent(child) | FormatIR::Group(child) => measure_flat(child),
        FormatIR::IfBreak { flat, .. } => measure_flat(flat),
        FormatIR::Concat(parts) => {
            let mut total: usize = 0;
            for part in parts {
                let w = measure_flat(part);
                if w == usize::MAX {
                    return usize::MAX;
                }
                total = total.saturating_add(w);
            }
            total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ir::*;

    fn narrow(max_width: usize) -> FormatConfig {
        FormatConfig {
            max_width,
            ..FormatConfig::default()
        }
    }

    #[test]
    fn group_fits_renders_flat() {
        let ir = group(concat(vec![text("a"), space(), text("b")]));
        assert_eq!(print(&ir, &FormatConfig::default()), "a b\n");
    }

    #[test]
    fn group_exceeds_width_breaks() {
        let ir = group(concat(vec![
            text("hello"),
            space(),
            text("beautiful"),
            space(),
            text("world"),
        ]));
        assert_eq!(print(&ir, &narrow(10)), "hello\nbeautiful\nworld\n");
    }

    #[test]
    fn indent_uses_tabs_by_default() {
        let ir = concat(vec![
            text("func f() {"),
            indent(concat(vec![hardline(), text("return")])),
            hardline(),
            text("}"),
        ]);
        assert_eq!(print(&ir, &FormatConfig::default()), "func f() {\n\treturn\n}\n");
    }

    #[test]
    fn indent_with_spaces() {
        let config = FormatConfig {
            indent_with_tabs: false,
            indent_size: 2,
            max_width: 100,
        };
        let ir = concat(vec![
            text("a"),
            indent(concat(vec![
                hardline(),
                text("b"),
                indent(concat(vec![hardline(), text("c")])),
            ])),
            hardline(),
            text("d"),
        ]);
        assert_eq!(print(&ir, &config), "a\n  b\n    c\nd\n");
    }

    #[test]
    fn blank_lines_carry_no_indentation() {
        let ir = concat(vec![
            text("{"),
            indent(concat(vec![hardline(), text("a"), hardline(), hardline(), text("b")])),
            hardline(),
            text("}"),
        ]);
        assert_eq!(print(&ir, &FormatConfig::default()), "{\n\ta\n\n\tb\n}\n");
    }

    #[test]
    fn delimited_adds_trailing_comma_when_broken() {
        let items = vec![text("alpha"), text("beta")];
        let ir = concat(vec![text("f"), delimited("(", items.clone(), ")")]);
        assert_eq!(print(&ir, &FormatConfig::default()), "f(alpha, beta)\n");
        let ir = concat(vec![text("f"), delimited("(", items, ")")]);
        assert_eq!(print(&ir, &narrow(8)), "f(\n\talpha,\n\tbeta,\n)\n");
    }

    #[test]
    fn anchors_record_lines() {
        let ir = concat(vec![
            FormatIR::Anchor(0),
            text("a"),
            hardline(),
            text("b"),
            hardline(),
            FormatIR::Anchor(1),
            text("c"),
        ]);
        let out = print_with_anchors(&ir, &FormatConfig::default());
        assert_eq!(out.text, "a\nb\nc\n");
        assert_eq!(out.anchors, vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn measure_flat_hardline_returns_max() {
        let ir = concat(vec![text("a"), hardline(), text("b")]);
        assert_eq!(measure_flat(&ir), usize::MAX);
    }
}
