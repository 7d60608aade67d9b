//! Character-level scanner state.
//!
//! The preprocessor never tokenizes the host language. For each character it
//! only needs to know whether the character is code or sits inside a string,
//! rune, raw string, or comment, and how deeply brackets are nested at that
//! point. [`ScanState`] carries exactly that, and [`ScanState::step`] is the
//! only place it changes.

use std::ops::Range;

/// Opening delimiter of the literal the scanner is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringDelim {
    /// `"..."`, single line, backslash escapes.
    Double,
    /// `'x'`, single line, backslash escapes.
    Rune,
    /// `` `...` ``, may span lines, no escapes.
    Raw,
}

impl StringDelim {
    fn open(c: char) -> Option<Self> {
        match c {
            '"' => Some(StringDelim::Double),
            '\'' => Some(StringDelim::Rune),
            '`' => Some(StringDelim::Raw),
            _ => None,
        }
    }

    fn close(self) -> char {
        match self {
            StringDelim::Double => '"',
            StringDelim::Rune => '\'',
            StringDelim::Raw => '`',
        }
    }
}

/// Classification of one stepped character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Code,
    /// Inside a string or rune literal, delimiters included.
    Literal,
    /// Inside a comment, delimiters included.
    Comment,
}

/// A `"` or `'` literal ran into the end of its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unterminated;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Pending {
    #[default]
    None,
    /// Previous char was a backslash inside a literal.
    Escape,
    /// Second char of `//` or `/*`.
    CommentOpen,
    /// Second char of `*/`.
    CommentClose,
}

/// Lexical position of the scanner between two characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub brace_depth: u32,
    pub paren_depth: u32,
    pub bracket_depth: u32,
    pub in_string: Option<StringDelim>,
    pub in_block_comment: bool,
    in_line_comment: bool,
    pending: Pending,
}

impl ScanState {
    /// Advance over `c`. `next` is the character after it, if any.
    pub fn step(&mut self, c: char, next: Option<char>) -> Result<CharClass, Unterminated> {
        match std::mem::take(&mut self.pending) {
            Pending::None => {}
            Pending::Escape => return Ok(CharClass::Literal),
            Pending::CommentOpen => return Ok(CharClass::Comment),
            Pending::CommentClose => {
                self.in_block_comment = false;
                return Ok(CharClass::Comment);
            }
        }

        if self.in_line_comment {
            if c == '\n' {
                self.in_line_comment = false;
                return Ok(CharClass::Code);
            }
            return Ok(CharClass::Comment);
        }

        if self.in_block_comment {
            if c == '*' && next == Some('/') {
                self.pending = Pending::CommentClose;
            }
            return Ok(CharClass::Comment);
        }

        if let Some(delim) = self.in_string {
            match delim {
                StringDelim::Raw => {
                    if c == '`' {
                        self.in_string = None;
                    }
                }
                StringDelim::Double | StringDelim::Rune => {
                    if c == '\\' {
                        self.pending = Pending::Escape;
                    } else if c == '\n' {
                        self.in_string = None;
                        return Err(Unterminated);
                    } else if c == delim.close() {
                        self.in_string = None;
                    }
                }
            }
            return Ok(CharClass::Literal);
        }

        if let Some(delim) = StringDelim::open(c) {
            self.in_string = Some(delim);
            return Ok(CharClass::Literal);
        }

        match (c, next) {
            ('/', Some('/')) => {
                self.in_line_comment = true;
                self.pending = Pending::CommentOpen;
                return Ok(CharClass::Comment);
            }
            ('/', Some('*')) => {
                self.in_block_comment = true;
                self.pending = Pending::CommentOpen;
                return Ok(CharClass::Comment);
            }
            ('{', _) => self.brace_depth += 1,
            ('}', _) => self.brace_depth = self.brace_depth.saturating_sub(1),
            ('(', _) => self.paren_depth += 1,
            (')', _) => self.paren_depth = self.paren_depth.saturating_sub(1),
            ('[', _) => self.bracket_depth += 1,
            (']', _) => self.bracket_depth = self.bracket_depth.saturating_sub(1),
            _ => {}
        }
        Ok(CharClass::Code)
    }

    /// Total bracket nesting.
    pub fn depth(&self) -> u32 {
        self.brace_depth + self.paren_depth + self.bracket_depth
    }

    /// Whether the next character starts outside any literal or comment.
    pub fn in_code(&self) -> bool {
        self.in_string.is_none() && !self.in_block_comment && !self.in_line_comment
    }
}

/// A code character yielded by [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CodeChar {
    pub pos: usize,
    pub ch: char,
    /// Nesting depth before this character.
    pub depth: u32,
}

/// Iterates the code characters of `src[start..end]`, skipping literals and
/// comments. Offsets are absolute.
pub(crate) struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    end: usize,
    state: ScanState,
    literal_start: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str, range: Range<usize>) -> Self {
        Self {
            src,
            pos: range.start,
            end: range.end,
            state: ScanState::default(),
            literal_start: range.start,
        }
    }

    /// Next code character. An unterminated literal yields `Err` with the
    /// offset where that literal started.
    pub fn next_code(&mut self) -> Result<Option<CodeChar>, usize> {
        while self.pos < self.end {
            let mut chars = self.src[self.pos..self.end].chars();
            let Some(ch) = chars.next() else {
                break;
            };
            let next = chars.next();
            let at = self.pos;
            let depth = self.state.depth();
            let was_literal = self.state.in_string.is_some();
            self.pos += ch.len_utf8();
            match self.state.step(ch, next) {
                Ok(CharClass::Code) => return Ok(Some(CodeChar { pos: at, ch, depth })),
                Ok(CharClass::Literal) => {
                    if !was_literal {
                        self.literal_start = at;
                    }
                }
                Ok(CharClass::Comment) => {}
                Err(Unterminated) => return Err(self.literal_start),
            }
        }
        if self.state.in_string.is_some() {
            return Err(self.literal_start);
        }
        Ok(None)
    }
}

/// Split `text` at top-level occurrences of any of `seps`. Returned ranges
/// are relative to `text` and exclude the separators.
pub(crate) fn split_top_level(text: &str, seps: &[char]) -> Result<Vec<Range<usize>>, usize> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut scanner = Scanner::new(text, 0..text.len());
    while let Some(c) = scanner.next_code()? {
        if c.depth == 0 && seps.contains(&c.ch) {
            parts.push(start..c.pos);
            start = c.pos + c.ch.len_utf8();
        }
    }
    parts.push(start..text.len());
    Ok(parts)
}

/// Offset of the `}` matching the `{` at `open`, searching up to `end`.
pub(crate) fn matching_brace(src: &str, open: usize, end: usize) -> Result<Option<usize>, usize> {
    let mut scanner = Scanner::new(src, open..end);
    while let Some(c) = scanner.next_code()? {
        if c.ch == '}' && c.depth == 1 {
            return Ok(Some(c.pos));
        }
    }
    Ok(None)
}

/// Whether `src[range]` holds nothing but whitespace, comments, and `;`.
pub(crate) fn only_trivia(src: &str, range: Range<usize>) -> bool {
    let mut scanner = Scanner::new(src, range);
    loop {
        match scanner.next_code() {
            Ok(Some(c)) if c.ch.is_whitespace() || c.ch == ';' => {}
            Ok(None) => return true,
            Ok(Some(_)) | Err(_) => return false,
        }
    }
}

/// Copy of `text` with every comment character replaced by a space.
/// Newlines are kept so offsets and line structure survive.
pub(crate) fn blank_comments(text: &str) -> String {
    let mut state = ScanState::default();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match state.step(c, next) {
            Ok(CharClass::Comment) if c != '\n' => {
                for _ in 0..c.len_utf8() {
                    out.push(' ');
                }
            }
            Ok(_) => out.push(c),
            Err(Unterminated) => {
                state = ScanState::default();
                out.push(c);
            }
        }
    }
    out
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(text: &str) -> String {
        let mut state = ScanState::default();
        let mut chars = text.chars().peekable();
        let mut out = String::new();
        while let Some(c) = chars.next() {
            let class = state.step(c, chars.peek().copied()).unwrap();
            out.push(match class {
                CharClass::Code => 'c',
                CharClass::Literal => 'l',
                CharClass::Comment => '/',
            });
        }
        out
    }

    #[test]
    fn classifies_literals_and_comments() {
        assert_eq!(classes(r#"a "b\"" c"#), "cclllllcc");
        assert_eq!(classes("x // y"), "cc////");
        assert_eq!(classes("a /* b */ c"), "cc///////cc");
        assert_eq!(classes("'}'"), "lll");
    }

    #[test]
    fn block_comment_opener_does_not_close_itself() {
        assert_eq!(classes("/*/ x */y"), "////////c");
    }

    #[test]
    fn raw_strings_span_lines() {
        let mut state = ScanState::default();
        for c in "`a\n".chars() {
            state.step(c, None).unwrap();
        }
        assert_eq!(state.in_string, Some(StringDelim::Raw));
        assert!(!state.in_code());
        state.step('`', None).unwrap();
        assert!(state.in_code());
    }

    #[test]
    fn double_quoted_string_stops_at_newline() {
        let mut state = ScanState::default();
        state.step('"', Some('a')).unwrap();
        state.step('a', Some('\n')).unwrap();
        assert_eq!(state.step('\n', None), Err(Unterminated));
        assert!(state.in_code());
    }

    #[test]
    fn depth_tracks_code_only() {
        let mut state = ScanState::default();
        let text = r#"f({"}", [1]}"#;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            state.step(c, chars.peek().copied()).unwrap();
        }
        assert_eq!(state.paren_depth, 1);
        assert_eq!(state.brace_depth, 0);
        assert_eq!(state.bracket_depth, 0);
    }

    #[test]
    fn split_ignores_commas_in_literals_and_nesting() {
        let text = r#"a, "b, c", f(d, e), ',' // x, y"#;
        let parts: Vec<&str> = split_top_level(text, &[','])
            .unwrap()
            .into_iter()
            .map(|r| text[r].trim())
            .collect();
        assert_eq!(parts, vec!["a", r#""b, c""#, "f(d, e)", "',' // x, y"]);
    }

    #[test]
    fn finds_matching_brace_past_literals() {
        let src = r#"{ "}" { '}' } }x"#;
        assert_eq!(matching_brace(src, 0, src.len()), Ok(Some(14)));
        assert_eq!(matching_brace("{ {", 0, 3), Ok(None));
        assert_eq!(matching_brace("{ \"abc", 0, 6), Err(2));
    }

    #[test]
    fn trivia_detection() {
        let src = "} ; // done\n";
        assert!(only_trivia(src, 1..src.len()));
        assert!(!only_trivia("}.Foo()", 1..7));
    }

    #[test]
    fn blanking_keeps_offsets() {
        let text = "a // b\nc /* d */ e";
        let blanked = blank_comments(text);
        assert_eq!(blanked.len(), text.len());
        assert_eq!(blanked, "a     \nc         e");
    }
}
