//! One translation unit, end to end.

use sable_common::{LineIndex, NameGen, TransformMetadata};
use sable_lower::{Diagnostic, Transformer};
use sable_prep::{Preprocessed, Preprocessor};
use sable_syntax::ast::{Decl, SourceFile};
use sable_syntax::{FormatConfig, Mapping};
use sable_typeck::TypeOracle;

use crate::config::SableConfig;
use crate::CompileError;

/// Output of [`Session::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// Host source with every generated declaration injected.
    pub code: String,
    /// Generated line to original position, for nodes that carry an origin.
    pub mappings: Vec<Mapping>,
    pub metadata: Vec<TransformMetadata>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compiled {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Owns the per-unit state: name counters, generated declarations and
/// inference scopes. Lower several units with one session each.
pub struct Session {
    names: NameGen,
    prep: Preprocessor,
    transformer: Transformer,
    format: FormatConfig,
    line_origins: Vec<u32>,
}

impl Session {
    pub fn new(config: &SableConfig) -> Result<Self, CompileError> {
        let lower = config.lower_options().map_err(CompileError::Config)?;
        Ok(Self {
            names: NameGen::new(),
            prep: Preprocessor::new(config.prep_options()),
            transformer: Transformer::new(lower),
            format: config.format_config(),
            line_origins: Vec::new(),
        })
    }

    /// Consult `oracle` for expression types before structural inference.
    pub fn with_oracle(mut self, oracle: Box<dyn TypeOracle>) -> Self {
        self.transformer = self.transformer.with_oracle(oracle);
        self
    }

    /// Rewrite Sable constructs into a marked host skeleton.
    pub fn process(&mut self, source: &str) -> Result<Preprocessed, CompileError> {
        let prep = self.prep.process(source, &mut self.names)?;
        self.line_origins = prep.line_origins.clone();
        Ok(prep)
    }

    /// Parse skeleton text produced by [`Session::process`].
    pub fn parse(&self, text: &str) -> Result<SourceFile, CompileError> {
        sable_syntax::parse(text).map_err(|error| {
            let skeleton_line = LineIndex::new(text).line_of(error.span.start);
            let line = self.line_origins.get(skeleton_line as usize - 1).copied();
            CompileError::Parse { error, line }
        })
    }

    /// Lower every marked construct in `file`.
    pub fn transform(&mut self, file: &mut SourceFile) -> Result<(), CompileError> {
        self.transformer.transform(file, &mut self.names)?;
        Ok(())
    }

    /// Generated declarations not handed out yet.
    pub fn pending_declarations(&mut self) -> Vec<Decl> {
        self.transformer.pending_declarations()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.transformer.diagnostics()
    }

    /// Preprocess, parse, lower, inject declarations after the imports and
    /// print.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
    pub fn compile(&mut self, source: &str) -> Result<Compiled, CompileError> {
        let prep = self.process(source)?;
        tracing::debug!(markers = prep.metadata.len(), "preprocessed");
        let mut file = self.parse(&prep.text)?;
        self.transform(&mut file)?;
        let generated = self.pending_declarations();
        tracing::debug!(declarations = generated.len(), "injecting declarations");
        file.decls.splice(0..0, generated);
        let printed = sable_syntax::print_file(&file, &self.format);
        Ok(Compiled {
            code: printed.code,
            mappings: printed.mappings,
            metadata: prep.metadata,
            diagnostics: self.transformer.take_diagnostics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&SableConfig::default()).unwrap()
    }

    #[test]
    fn declarations_follow_the_imports() {
        let out = session()
            .compile("package p\n\nimport \"strconv\"\n\nfunc parse(s string) Result[int, error] {\n\tn, err := strconv.Atoi(s)\n\tif err != nil {\n\t\treturn Err(err)\n\t}\n\treturn Ok(n)\n}\n")
            .unwrap();
        let import = out.code.find("import \"strconv\"").unwrap();
        let tag = out.code.find("type ResultTag uint8").unwrap();
        let func = out.code.find("func parse(s string) Result_int_error {").unwrap();
        assert!(import < tag && tag < func);
        assert!(out.code.contains("return Result_int_error{tag: ResultTagOk, ok0: &n}"));
        assert!(!out.has_errors());
    }

    #[test]
    fn parse_errors_point_at_the_original_line() {
        let err = session()
            .compile("package p\n\nfunc f(o Option[int]) int {\n\ty := match o {\n\t\tSome(x) => x,\n\t\tNone => 0,\n\t}\n\tz := )\n\treturn y + z\n}\n")
            .unwrap_err();
        match err {
            CompileError::Parse { line, .. } => assert_eq!(line, Some(8)),
            other => panic!("expected a parse error, got {other}"),
        }
    }

    #[test]
    fn metadata_describes_each_marker() {
        let out = session()
            .compile("package p\n\nfunc f(o Option[int]) int {\n\treturn match o {\n\t\tSome(x) => x,\n\t\tNone => 0,\n\t}\n}\n")
            .unwrap();
        // scrutinee, dispatch and two arms
        assert_eq!(out.metadata.len(), 4);
        assert!(out.metadata.iter().all(|m| m.original_line >= 4));
        assert!(out.mappings.iter().any(|m| m.origin.line == 4));
    }

    #[test]
    fn lowered_output_is_a_fixed_point() {
        let first = session()
            .compile("package p\n\nenum Dir {\n\tUp,\n\tDown,\n}\n\nfunc flip(d Dir) Dir {\n\treturn match d {\n\t\tUp => Dir.Down,\n\t\tDown => Dir.Up,\n\t}\n}\n")
            .unwrap();
        let second = session().compile(&first.code).unwrap();
        assert_eq!(second.code, first.code);
        assert!(second.metadata.is_empty());
    }
}
