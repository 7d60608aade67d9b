//! Pattern preprocessor for Sable.
//!
//! The host parser knows nothing about `enum` or `match`. This crate rewrites
//! both constructs at the text level into host code that parses (the
//! skeleton), leaving a marker comment on each logical unit so the tree
//! transform can finish the job:
//!
//! - `enum` declarations become a struct type whose nested structs carry the
//!   variant payload types.
//! - `match` becomes hoisted scrutinee bindings plus a `switch` with one
//!   numbered case per arm. Guards become `if` statements inside the case.
//!
//! Everything else is copied through line by line, so line numbers of
//! untouched code only shift by the marker lines inserted above them.
//! [`Preprocessed::line_origins`] maps every skeleton line back.

mod arms;
mod buffer;
mod enums;
pub mod error;
mod matches;
mod pattern;
pub mod scan;
mod unit;

pub use error::{PrepErrorKind, PreprocessError};
pub use matches::INFER_PLACEHOLDER;

use sable_common::{LineIndex, NameGen, TransformMetadata};

use buffer::Skeleton;
use unit::Unit;

/// Preprocessor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepOptions {
    /// Largest tuple scrutinee accepted. Default: 6.
    pub max_tuple_arity: usize,
}

impl Default for PrepOptions {
    fn default() -> Self {
        Self { max_tuple_arity: 6 }
    }
}

/// Result of preprocessing one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    /// Skeleton source, parseable by the host parser.
    pub text: String,
    /// One record per emitted marker, in emission order.
    pub metadata: Vec<TransformMetadata>,
    /// Original 1-based line of each skeleton line.
    pub line_origins: Vec<u32>,
}

impl Preprocessed {
    /// Original line of a 1-based skeleton line.
    pub fn original_line(&self, generated_line: u32) -> Option<u32> {
        let idx = (generated_line as usize).checked_sub(1)?;
        self.line_origins.get(idx).copied()
    }
}

#[derive(Debug, Default)]
pub struct Preprocessor {
    options: PrepOptions,
    units: u32,
}

impl Preprocessor {
    pub fn new(options: PrepOptions) -> Self {
        Self { options, units: 0 }
    }

    /// Rewrite every `enum` and `match` in `source`.
    ///
    /// Marker ids, match ids and scrutinee names are drawn from `names`, so
    /// one generator must be shared by all phases of the same unit.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn process(&mut self, source: &str, names: &mut NameGen) -> Result<Preprocessed, PreprocessError> {
        self.units += 1;
        let index = LineIndex::new(source);
        let mut unit = Unit {
            src: source,
            index: &index,
            names,
            options: &self.options,
            out: Skeleton::default(),
        };
        unit.region(0..source.len(), None)
            .map_err(|err| err.locate(&index))?;
        tracing::debug!(unit = self.units, markers = unit.out.marker_count(), "preprocessed");
        Ok(unit.out.finish())
    }
}
