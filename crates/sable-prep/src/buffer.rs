//! Output buffer for skeleton text.

use std::ops::Range;

use sable_common::{LineIndex, Marker, TransformMetadata};

use crate::error::{PrepErrorKind, PrepFault};
use crate::Preprocessed;

/// Skeleton lines, each remembering the original line it came from.
#[derive(Debug, Default)]
pub(crate) struct Skeleton {
    lines: Vec<String>,
    origins: Vec<u32>,
    metadata: Vec<TransformMetadata>,
}

impl Skeleton {
    pub fn push(&mut self, text: impl Into<String>, origin: u32) {
        self.lines.push(text.into());
        self.origins.push(origin);
    }

    /// Push `prefix + src[range] + suffix`, keeping the line breaks of the
    /// source text and the origin of every line.
    pub fn push_source(&mut self, src: &str, range: Range<usize>, index: &LineIndex, prefix: &str, suffix: &str) {
        let text = &src[range.clone()];
        let mut offset = range.start;
        let mut segments = text.split('\n').peekable();
        let mut first = true;
        while let Some(segment) = segments.next() {
            let origin = index.line_of(offset as u32);
            let mut line = String::new();
            if first {
                line.push_str(prefix);
                first = false;
            }
            line.push_str(segment);
            if segments.peek().is_none() {
                line.push_str(suffix);
            }
            self.push(line, origin);
            offset += segment.len() + 1;
        }
    }

    /// Encode `marker` on its own line and record where it landed.
    pub fn push_marker(&mut self, indent: &str, marker: &Marker) -> Result<(), PrepFault> {
        let encoded = marker.encode().map_err(|err| {
            let span = marker.origin.span;
            PrepFault::at(
                PrepErrorKind::MarkerEncoding(err.message),
                span.start as usize,
                span.end as usize,
            )
        })?;
        self.metadata.push(TransformMetadata {
            id: marker.id,
            kind: marker.kind(),
            original_line: marker.origin.line,
            original_span: marker.origin.span,
            generated_line: self.lines.len() as u32 + 1,
        });
        self.push(format!("{indent}{encoded}"), marker.origin.line);
        Ok(())
    }

    pub fn marker_count(&self) -> usize {
        self.metadata.len()
    }

    pub fn finish(self) -> Preprocessed {
        let mut text = self.lines.join("\n");
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        Preprocessed {
            text,
            metadata: self.metadata,
            line_origins: self.origins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_lines_keep_their_origins() {
        let src = "a\nbb\nccc(x,\n  y)\n";
        let index = LineIndex::new(src);
        let mut out = Skeleton::default();
        out.push_source(src, 5..src.len() - 1, &index, "return ", ";");
        let done = out.finish();
        assert_eq!(done.text, "return ccc(x,\n  y);\n");
        assert_eq!(done.line_origins, vec![3, 4]);
    }
}
