//! Tree transform for Sable.
//!
//! Takes the host-language tree parsed from preprocessor output, with its
//! markers attached, and lowers every Sable construct to plain host code:
//!
//! - [`enums`]: enum skeletons to tagged unions ([`tagged`])
//! - [`containers`]: `Result[T, E]` and `Option[T]` to per-instantiation
//!   tagged unions, constructor calls to composite literals
//! - [`matching`]: match skeletons to decision trees ([`pattern`])
//!
//! Declarations the transform generates are not inserted into the tree; they
//! collect in the [`DeclarationRegistry`] and are handed out once through
//! [`Transformer::pending_declarations`].
//!
//! ## Pipeline
//!
//! ```text
//! SourceFile -> ledger -> enums -> containers -> matching -> ledger check
//! ```

pub mod containers;
pub mod enums;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod pattern;
pub mod plugin;
pub mod registry;
pub mod shape;
pub mod synth;
pub mod tagged;

use sable_common::NameGen;
use sable_syntax::ast::{Decl, SourceFile};
use sable_typeck::{TypeInference, TypeOracle};

pub use containers::ContainerPlugin;
pub use enums::EnumPlugin;
pub use error::{Diagnostic, DiagnosticCode, LowerError, Severity, Violation};
pub use ledger::MarkerLedger;
pub use matching::MatchPlugin;
pub use plugin::{LowerContext, LowerOptions, Plugin};
pub use registry::{DeclKey, DeclarationRegistry};
pub use shape::UnionCatalog;

/// Lowers one unit.
///
/// Holds the per-unit state: inference scopes, generated declarations, the
/// union catalog and the diagnostics reported so far.
pub struct Transformer {
    options: LowerOptions,
    infer: TypeInference,
    registry: DeclarationRegistry,
    catalog: UnionCatalog,
    diagnostics: Vec<Diagnostic>,
}

impl Transformer {
    pub fn new(options: LowerOptions) -> Self {
        let infer = TypeInference::new(options.default_error_type.clone());
        Self {
            options,
            infer,
            registry: DeclarationRegistry::new(),
            catalog: UnionCatalog::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Consult `oracle` before structural inference.
    pub fn with_oracle(mut self, oracle: Box<dyn TypeOracle>) -> Self {
        self.infer.set_oracle(Some(oracle));
        self
    }

    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    /// Run every plugin over `file`, then check that each marker was
    /// consumed exactly once.
    #[tracing::instrument(level = "debug", skip_all, fields(decls = file.decls.len()))]
    pub fn transform(&mut self, file: &mut SourceFile, names: &mut NameGen) -> Result<(), LowerError> {
        let mut ledger = MarkerLedger::collect(file)?;
        tracing::debug!(markers = ledger.len(), "markers collected");

        let mut plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(EnumPlugin::new()),
            Box::new(ContainerPlugin::new()),
            Box::new(MatchPlugin::new()),
        ];
        let mut cx = LowerContext {
            options: &self.options,
            names,
            infer: &mut self.infer,
            registry: &mut self.registry,
            catalog: &mut self.catalog,
            ledger: &mut ledger,
            diagnostics: &mut self.diagnostics,
        };
        for plugin in &mut plugins {
            let _span = tracing::debug_span!("plugin", plugin = plugin.name()).entered();
            cx.refresh(file);
            plugin.discover(file, &mut cx)?;
            cx.refresh(file);
            plugin.transform(file, &mut cx)?;
        }

        ledger.verify()?;
        tracing::debug!(
            consumed = ledger.consumed(),
            pending = self.registry.pending_len(),
            diagnostics = self.diagnostics.len(),
            "unit lowered"
        );
        Ok(())
    }

    /// Generated declarations in first-request order. Drains the registry, so
    /// a second call returns only what was requested since.
    pub fn pending_declarations(&mut self) -> Vec<Decl> {
        self.registry.drain()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn catalog(&self) -> &UnionCatalog {
        &self.catalog
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(LowerOptions::default())
    }
}
