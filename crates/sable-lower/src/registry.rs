//! Deduplicated, ordered storage for generated declarations.
//!
//! Passes request declarations by key; the first request builds and queues
//! them, later requests for the same key are no-ops. The queue is drained
//! once into the output file, right after the imports.

use std::fmt;

use rustc_hash::FxHashSet;

use sable_syntax::ast::Decl;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclKey {
    /// Discriminant type and its constants, per enum or container family.
    Tag(String),
    /// The union struct type.
    Union(String),
    /// Variant constructors and predicates of an enum.
    Constructors(String),
    /// Container helper methods of one instantiation.
    Helpers(String),
}

impl fmt::Display for DeclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKey::Tag(name) => write!(f, "tag {name}"),
            DeclKey::Union(name) => write!(f, "union {name}"),
            DeclKey::Constructors(name) => write!(f, "constructors {name}"),
            DeclKey::Helpers(name) => write!(f, "helpers {name}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    seen: FxHashSet<DeclKey>,
    pending: Vec<(DeclKey, Vec<Decl>)>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &DeclKey) -> bool {
        self.seen.contains(key)
    }

    /// Queue the declarations for `key` unless it was requested before.
    ///
    /// `build` runs only for a new key. Returns whether it ran.
    pub fn request<E>(
        &mut self,
        key: DeclKey,
        build: impl FnOnce() -> Result<Vec<Decl>, E>,
    ) -> Result<bool, E> {
        if self.seen.contains(&key) {
            return Ok(false);
        }
        let decls = build()?;
        tracing::trace!(key = %key, decls = decls.len(), "declarations queued");
        self.seen.insert(key.clone());
        self.pending.push((key, decls));
        Ok(true)
    }

    /// Number of keys waiting to be drained.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queued declarations, for rewriting before they are drained.
    pub fn pending_mut(&mut self) -> impl Iterator<Item = &mut Decl> {
        self.pending.iter_mut().flat_map(|(_, decls)| decls.iter_mut())
    }

    /// Take every queued declaration in first-request order.
    ///
    /// Keys stay registered, so draining does not allow re-emission.
    pub fn drain(&mut self) -> Vec<Decl> {
        self.pending.drain(..).flat_map(|(_, decls)| decls).collect()
    }

    /// Forget everything, for the next unit.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_syntax::ast::DeclKind;

    fn comment(text: &str) -> Decl {
        Decl::new(DeclKind::Comment(format!("// {text}")))
    }

    #[test]
    fn repeated_requests_are_no_ops() {
        let mut registry = DeclarationRegistry::new();
        let first: Result<bool, ()> = registry.request(DeclKey::Tag("Result".into()), || Ok(vec![comment("tag")]));
        assert_eq!(first, Ok(true));
        let second: Result<bool, ()> = registry.request(DeclKey::Tag("Result".into()), || panic!("built twice"));
        assert_eq!(second, Ok(false));
        assert_eq!(registry.pending_len(), 1);
    }

    #[test]
    fn drain_keeps_first_use_order_and_is_final() {
        let mut registry = DeclarationRegistry::new();
        for name in ["b", "a", "c"] {
            registry
                .request::<()>(DeclKey::Union(name.into()), || Ok(vec![comment(name)]))
                .unwrap();
        }
        let drained = registry.drain();
        let names: Vec<_> = drained
            .iter()
            .map(|d| match &d.kind {
                DeclKind::Comment(text) => text.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, ["// b", "// a", "// c"]);
        assert!(registry.drain().is_empty());
        assert!(registry.contains(&DeclKey::Union("a".into())));
    }

    #[test]
    fn failed_build_does_not_register() {
        let mut registry = DeclarationRegistry::new();
        let err = registry.request(DeclKey::Helpers("Option_int".into()), || Err("bad"));
        assert_eq!(err, Err("bad"));
        assert!(!registry.contains(&DeclKey::Helpers("Option_int".into())));
    }
}
