//! The Sable transpiler driver.
//!
//! Wires the stages together for one translation unit:
//!
//! ```text
//! source -> Preprocessor -> parse -> Transformer -> inject declarations -> print
//! ```
//!
//! [`Session`] exposes each stage; [`compile_source`] runs them all with a
//! fresh session.

pub mod config;
pub mod diagnostics;
mod session;

use std::fmt;
use std::path::PathBuf;
use std::sync::Once;

use sable_lower::LowerError;
use sable_prep::PreprocessError;
use sable_syntax::ParseError;

pub use config::{ConfigError, SableConfig};
pub use session::{Compiled, Session};

/// Any failure that stops a unit from being lowered.
#[derive(Debug)]
pub enum CompileError {
    Config(ConfigError),
    Io { path: PathBuf, source: std::io::Error },
    Preprocess(PreprocessError),
    /// The skeleton did not parse. `line` is the original line the failing
    /// skeleton line was generated from.
    Parse { error: ParseError, line: Option<u32> },
    Lower(LowerError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Config(err) => write!(f, "{err}"),
            CompileError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            CompileError::Preprocess(err) => write!(f, "{err}"),
            CompileError::Parse { error, line: Some(line) } => write!(f, "line {line}: {}", error.message),
            CompileError::Parse { error, line: None } => write!(f, "{}", error.message),
            CompileError::Lower(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Config(err) => Some(err),
            CompileError::Io { source, .. } => Some(source),
            CompileError::Preprocess(err) => Some(err),
            CompileError::Parse { error, .. } => Some(error),
            CompileError::Lower(err) => Some(err),
        }
    }
}

impl From<PreprocessError> for CompileError {
    fn from(err: PreprocessError) -> Self {
        CompileError::Preprocess(err)
    }
}

impl From<LowerError> for CompileError {
    fn from(err: LowerError) -> Self {
        CompileError::Lower(err)
    }
}

impl From<ConfigError> for CompileError {
    fn from(err: ConfigError) -> Self {
        CompileError::Config(err)
    }
}

/// Lower `source` with a fresh session.
pub fn compile_source(source: &str, config: &SableConfig) -> Result<Compiled, CompileError> {
    Session::new(config)?.compile(source)
}

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_lowers_a_unit() {
        let out = compile_source(
            "package p\n\nfunc first(xs []int) Option[int] {\n\tif len(xs) == 0 {\n\t\treturn None\n\t}\n\treturn Some(xs[0])\n}\n",
            &SableConfig::default(),
        )
        .unwrap();
        assert!(out.code.contains("func first(xs []int) Option_int {"));
        assert!(out.code.contains("return Option_int{tag: OptionTagNone}"));
        assert!(out.code.contains("some0: &xs[0]"));
        assert!(out.code.contains("func (o Option_int) IsSome() bool {"));
    }

    #[test]
    fn helpers_can_be_switched_off() {
        let config = SableConfig::from_str("[transpile]\nemit_helpers = false\n").unwrap();
        let out = compile_source("package p\n\nfunc none() Option[string] {\n\treturn None\n}\n", &config).unwrap();
        assert!(out.code.contains("type Option_string struct {"));
        assert!(!out.code.contains("IsSome"));
    }

    #[test]
    fn preprocess_errors_keep_their_line() {
        let err = compile_source("package p\n\nenum E {\n}\n", &SableConfig::default()).unwrap_err();
        let CompileError::Preprocess(inner) = &err else {
            panic!("expected a preprocess error, got {err}");
        };
        assert_eq!(inner.line, 3);
        let text = diagnostics::render_error(&err, "package p\n\nenum E {\n}\n");
        assert!(text.contains("[E0001] Error:"));
    }

    #[test]
    fn tracing_init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
