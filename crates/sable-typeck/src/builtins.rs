//! Known result types of builtins and standard library functions.
//!
//! The structural fallback cannot see into imported packages, so the
//! functions that commonly feed `Ok(..)`/`Some(..)` and match scrutinees are
//! registered here by package and name.

use rustc_hash::FxHashMap;

use sable_syntax::ast::TypeExpr;

/// Result types of package-qualified functions, keyed by `package.name`.
#[derive(Debug)]
pub struct Library {
    funcs: FxHashMap<String, Vec<TypeExpr>>,
}

impl Library {
    /// The standard table.
    pub fn standard() -> Self {
        let mut lib = Library {
            funcs: FxHashMap::default(),
        };
        register_library(&mut lib);
        lib
    }

    fn add(&mut self, pkg: &str, name: &str, results: &[&str]) {
        let results = results.iter().map(|r| TypeExpr::named(*r)).collect();
        self.funcs.insert(format!("{pkg}.{name}"), results);
    }

    fn add_typed(&mut self, pkg: &str, name: &str, results: Vec<TypeExpr>) {
        self.funcs.insert(format!("{pkg}.{name}"), results);
    }

    /// Result types of `pkg.name(...)`, if known.
    pub fn results(&self, pkg: &str, name: &str) -> Option<&[TypeExpr]> {
        self.funcs.get(&format!("{pkg}.{name}")).map(Vec::as_slice)
    }
}

fn register_library(lib: &mut Library) {
    // ── errors ──────────────────────────────────────────────────────

    lib.add("errors", "New", &["error"]);
    lib.add("errors", "Unwrap", &["error"]);
    lib.add("errors", "Join", &["error"]);
    lib.add("errors", "Is", &["bool"]);
    lib.add("errors", "As", &["bool"]);

    // ── fmt ─────────────────────────────────────────────────────────

    lib.add("fmt", "Errorf", &["error"]);
    lib.add("fmt", "Sprintf", &["string"]);
    lib.add("fmt", "Sprint", &["string"]);
    lib.add("fmt", "Sprintln", &["string"]);
    lib.add("fmt", "Println", &["int", "error"]);
    lib.add("fmt", "Printf", &["int", "error"]);

    // ── strconv ─────────────────────────────────────────────────────

    lib.add("strconv", "Itoa", &["string"]);
    lib.add("strconv", "Quote", &["string"]);
    lib.add("strconv", "FormatBool", &["string"]);
    lib.add("strconv", "FormatInt", &["string"]);
    lib.add("strconv", "FormatFloat", &["string"]);
    lib.add("strconv", "Atoi", &["int", "error"]);
    lib.add("strconv", "ParseInt", &["int64", "error"]);
    lib.add("strconv", "ParseUint", &["uint64", "error"]);
    lib.add("strconv", "ParseFloat", &["float64", "error"]);
    lib.add("strconv", "ParseBool", &["bool", "error"]);
    lib.add("strconv", "Unquote", &["string", "error"]);

    // ── strings ─────────────────────────────────────────────────────

    for name in [
        "ToUpper", "ToLower", "TrimSpace", "Trim", "TrimPrefix", "TrimSuffix", "TrimLeft", "TrimRight",
        "Repeat", "Replace", "ReplaceAll", "Join", "Title",
    ] {
        lib.add("strings", name, &["string"]);
    }
    for name in ["Contains", "HasPrefix", "HasSuffix", "EqualFold", "ContainsRune", "ContainsAny"] {
        lib.add("strings", name, &["bool"]);
    }
    for name in ["Index", "LastIndex", "Count", "Compare", "IndexByte", "IndexRune"] {
        lib.add("strings", name, &["int"]);
    }
    let strings = TypeExpr::Slice(Box::new(TypeExpr::named("string")));
    lib.add_typed("strings", "Split", vec![strings.clone()]);
    lib.add_typed("strings", "Fields", vec![strings.clone()]);
    lib.add_typed("strings", "SplitN", vec![strings]);

    // ── os ──────────────────────────────────────────────────────────

    let bytes = TypeExpr::Slice(Box::new(TypeExpr::named("byte")));
    lib.add_typed("os", "ReadFile", vec![bytes, TypeExpr::named("error")]);
    lib.add("os", "Getenv", &["string"]);
    lib.add("os", "LookupEnv", &["string", "bool"]);
    lib.add("os", "Getwd", &["string", "error"]);
    lib.add("os", "Hostname", &["string", "error"]);

    // ── time, math ──────────────────────────────────────────────────

    lib.add_typed(
        "time",
        "Since",
        vec![TypeExpr::Named {
            pkg: Some("time".into()),
            name: "Duration".into(),
            args: Vec::new(),
        }],
    );
    for name in ["Sqrt", "Abs", "Floor", "Ceil", "Pow", "Max", "Min", "Round", "Mod", "Inf"] {
        lib.add("math", name, &["float64"]);
    }
}

/// Predeclared functions whose result type does not depend on arguments.
pub fn builtin_result(name: &str) -> Option<TypeExpr> {
    match name {
        "len" | "cap" | "copy" => Some(TypeExpr::named("int")),
        "recover" => Some(TypeExpr::named("any")),
        "real" | "imag" => Some(TypeExpr::named("float64")),
        "complex" => Some(TypeExpr::named("complex128")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_constructors_yield_error() {
        let lib = Library::standard();
        assert_eq!(lib.results("errors", "New"), Some(&[TypeExpr::named("error")][..]));
        assert_eq!(lib.results("fmt", "Errorf"), Some(&[TypeExpr::named("error")][..]));
    }

    #[test]
    fn multi_result_functions_keep_every_result() {
        let lib = Library::standard();
        let atoi = lib.results("strconv", "Atoi").unwrap();
        assert_eq!(atoi, &[TypeExpr::named("int"), TypeExpr::named("error")]);
        assert!(lib.results("strconv", "Frobnicate").is_none());
    }

    #[test]
    fn len_is_int() {
        assert_eq!(builtin_result("len"), Some(TypeExpr::named("int")));
        assert_eq!(builtin_result("append"), None);
    }
}
