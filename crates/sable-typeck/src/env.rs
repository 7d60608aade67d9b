//! Lexical scopes for local bindings.
//!
//! Maps names to what is known about them. Entering a function or block
//! pushes a frame and leaving pops it; lookups search from the innermost
//! frame outward.

use rustc_hash::FxHashMap;

use sable_syntax::ast::TypeExpr;

/// What a name in scope denotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// `None` when the type could not be inferred.
    pub ty: Option<TypeExpr>,
    /// Declared with `const` (not addressable).
    pub is_const: bool,
}

impl Binding {
    pub fn var(ty: Option<TypeExpr>) -> Self {
        Self { ty, is_const: false }
    }

    pub fn constant(ty: Option<TypeExpr>) -> Self {
        Self { ty, is_const: true }
    }
}

/// A stack of scopes. Index 0 is the outermost frame of the current unit.
#[derive(Debug)]
pub struct TypeEnv {
    scopes: Vec<FxHashMap<String, Binding>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pop the innermost frame. The outermost frame is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind `name` in the innermost frame, shadowing outer bindings.
    pub fn insert(&mut self, name: String, binding: Binding) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Drop every frame and start over with one empty frame.
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.scopes.push(FxHashMap::default());
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Option<TypeExpr> {
        Some(TypeExpr::named("int"))
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut env = TypeEnv::new();
        env.insert("x".into(), Binding::var(int()));
        env.push_scope();
        env.insert("x".into(), Binding::constant(Some(TypeExpr::named("string"))));
        assert!(env.lookup("x").unwrap().is_const);
        env.pop_scope();
        assert_eq!(env.lookup("x").unwrap().ty, int());
    }

    #[test]
    fn outermost_scope_survives_pop() {
        let mut env = TypeEnv::new();
        env.pop_scope();
        assert_eq!(env.depth(), 1);
        env.insert("y".into(), Binding::var(None));
        assert!(env.lookup("y").is_some());
    }

    #[test]
    fn blank_identifier_is_never_bound() {
        let mut env = TypeEnv::new();
        env.insert("_".into(), Binding::var(int()));
        assert!(env.lookup("_").is_none());
    }
}
