//! Parent index: where each match skeleton lives.
//!
//! Every statement list (block bodies and case clause bodies) gets a
//! [`ListId`] in pre-order. For each match id the index records the list
//! holding its dispatch and the positions of its target declaration and
//! scrutinee bindings. The transform walks the tree in the same order, so it
//! can check that what it finds at a dispatch is what discovery saw.

use rustc_hash::FxHashMap;

use sable_common::{Marker, MarkerPayload, MatchTarget, Origin};
use sable_syntax::ast::{Block, CaseClause, FuncType, SourceFile, Stmt, TypeExpr};
use sable_syntax::walk::Visit;

use crate::error::{LowerError, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub u32);

/// Position of one statement: its list and index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmtPos {
    pub list: ListId,
    pub index: usize,
}

/// Everything discovery learned about one match.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteEntry {
    pub match_id: u32,
    pub origin: Origin,
    pub dispatch: Option<StmtPos>,
    pub arity: usize,
    pub arm_count: usize,
    pub target: MatchTarget,
    /// `var x T` of an assignment-form match that declares its variable.
    pub target_decl: Option<StmtPos>,
    /// Scrutinee binding per slot, in slot order.
    pub scrutinees: Vec<(u32, StmtPos)>,
    /// Arm indices found on case clauses.
    pub arms: Vec<u32>,
}

impl SiteEntry {
    fn new(match_id: u32, origin: Origin) -> Self {
        Self {
            match_id,
            origin,
            dispatch: None,
            arity: 0,
            arm_count: 0,
            target: MatchTarget::Statement,
            target_decl: None,
            scrutinees: Vec::new(),
            arms: Vec::new(),
        }
    }

    /// Check the skeleton shape: scrutinee bindings immediately before the
    /// dispatch in slot order, the target declaration before those, and one
    /// clause per arm.
    fn validate(&mut self) -> Result<(), LowerError> {
        let (match_id, origin) = (self.match_id, self.origin);
        let malformed = |detail: String| {
            Err(LowerError::marker(
                Violation::Malformed,
                None,
                None,
                format!("match {match_id}: {detail}"),
                Some(origin),
            ))
        };
        let Some(dispatch) = self.dispatch else {
            return Err(LowerError::marker(
                Violation::Missing,
                None,
                None,
                format!("match {match_id} has no dispatch"),
                Some(origin),
            ));
        };
        self.scrutinees.sort_by_key(|(slot, _)| *slot);
        if self.scrutinees.len() != self.arity {
            return malformed(format!(
                "expected {} scrutinee binding(s), found {}",
                self.arity,
                self.scrutinees.len()
            ));
        }
        for (offset, (slot, pos)) in self.scrutinees.iter().enumerate() {
            let expected = dispatch.index.checked_sub(self.arity - offset);
            if *slot as usize != offset || pos.list != dispatch.list || Some(pos.index) != expected {
                return malformed(format!("scrutinee slot {slot} is not in front of the dispatch"));
            }
        }
        if let Some(decl) = self.target_decl {
            let first = dispatch.index - self.arity;
            if decl.list != dispatch.list || decl.index >= first {
                return malformed("target declaration is not in front of the scrutinees".into());
            }
        }
        let declares = matches!(self.target, MatchTarget::Assign { declare: true, .. });
        if declares != self.target_decl.is_some() {
            return malformed("target declaration does not agree with the dispatch".into());
        }
        let mut arms = self.arms.clone();
        arms.sort_unstable();
        if arms != (0..self.arm_count as u32).collect::<Vec<_>>() {
            return malformed(format!("expected {} arm clause(s), found {}", self.arm_count, self.arms.len()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ParentIndex {
    sites: FxHashMap<u32, SiteEntry>,
    lists: u32,
}

impl ParentIndex {
    /// Index every match skeleton in `file`.
    pub fn build(file: &SourceFile) -> Result<Self, LowerError> {
        let mut discovery = Discovery {
            index: ParentIndex::default(),
        };
        discovery.visit_file(file);
        let mut index = discovery.index;
        for site in index.sites.values_mut() {
            site.validate()?;
        }
        Ok(index)
    }

    pub fn site(&self, match_id: u32) -> Option<&SiteEntry> {
        self.sites.get(&match_id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Number of statement lists seen.
    pub fn list_count(&self) -> u32 {
        self.lists
    }
}

struct Discovery {
    index: ParentIndex,
}

impl Discovery {
    fn next_list(&mut self) -> ListId {
        let id = ListId(self.index.lists);
        self.index.lists += 1;
        id
    }

    fn entry(&mut self, marker: &Marker, match_id: u32) -> &mut SiteEntry {
        self.index
            .sites
            .entry(match_id)
            .or_insert_with(|| SiteEntry::new(match_id, marker.origin))
    }

    fn list(&mut self, list: ListId, stmts: &[Stmt]) {
        for (index, stmt) in stmts.iter().enumerate() {
            let pos = StmtPos { list, index };
            for marker in &stmt.markers {
                match &marker.payload {
                    MarkerPayload::Target { match_id, .. } => {
                        self.entry(marker, *match_id).target_decl = Some(pos);
                    }
                    MarkerPayload::Scrutinee { match_id, slot, .. } => {
                        self.entry(marker, *match_id).scrutinees.push((*slot, pos));
                    }
                    MarkerPayload::Dispatch {
                        match_id,
                        arity,
                        arms,
                        target,
                        ..
                    } => {
                        let entry = self.entry(marker, *match_id);
                        entry.origin = marker.origin;
                        entry.dispatch = Some(pos);
                        entry.arity = *arity as usize;
                        entry.arm_count = *arms as usize;
                        entry.target = target.clone();
                    }
                    MarkerPayload::EnumDecl { .. } | MarkerPayload::Arm { .. } => {}
                }
            }
            self.visit_stmt(stmt);
        }
    }
}

impl<'ast> Visit<'ast> for Discovery {
    fn visit_block(&mut self, block: &'ast Block) {
        let id = self.next_list();
        self.list(id, &block.stmts);
    }

    fn visit_clause(&mut self, clause: &'ast CaseClause) {
        for expr in &clause.exprs {
            self.visit_expr(expr);
        }
        for marker in &clause.markers {
            if let MarkerPayload::Arm { match_id, index, .. } = &marker.payload {
                self.entry(marker, *match_id).arms.push(*index);
            }
        }
        let id = self.next_list();
        self.list(id, &clause.body);
    }

    fn visit_type(&mut self, _ty: &'ast TypeExpr) {}

    fn visit_signature(&mut self, _sig: &'ast FuncType) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_common::NameGen;
    use sable_prep::{PrepOptions, Preprocessor};

    fn index(source: &str) -> Result<ParentIndex, LowerError> {
        let mut names = NameGen::new();
        let prep = Preprocessor::new(PrepOptions::default())
            .process(source, &mut names)
            .unwrap();
        let file = sable_syntax::parse(&prep.text).unwrap();
        ParentIndex::build(&file)
    }

    #[test]
    fn sites_record_their_skeleton() {
        let index = index(
            "package p\n\nfunc f(o Option[int]) int {\n\tx := match o {\n\t\tSome(v) => v,\n\t\tNone => 0,\n\t}\n\treturn x\n}\n",
        )
        .unwrap();
        assert_eq!(index.len(), 1);
        let site = index.site(0).unwrap();
        let dispatch = site.dispatch.unwrap();
        assert_eq!(site.arity, 1);
        assert_eq!(site.arm_count, 2);
        assert_eq!(site.target_decl.map(|p| p.index), Some(dispatch.index - 2));
        assert_eq!(site.scrutinees[0].1.index, dispatch.index - 1);
        assert!(matches!(site.target, MatchTarget::Assign { declare: true, .. }));
    }

    #[test]
    fn nested_matches_live_in_clause_lists() {
        let index = index(
            "package p\n\nfunc f(a, b Option[int]) int {\n\treturn match a {\n\t\tSome(x) => match b {\n\t\t\tSome(y) => x + y,\n\t\t\tNone => x,\n\t\t},\n\t\tNone => 0,\n\t}\n}\n",
        )
        .unwrap();
        let outer = index.site(0).unwrap().dispatch.unwrap();
        let inner = index.site(1).unwrap().dispatch.unwrap();
        assert!(inner.list > outer.list);
        assert_eq!(inner.index, 1);
    }

    #[test]
    fn a_moved_scrutinee_is_malformed() {
        let mut names = NameGen::new();
        let prep = Preprocessor::new(PrepOptions::default())
            .process("package p\n\nfunc f(o Option[int]) {\n\tmatch o {\n\t\t_ => {}\n\t}\n}\n", &mut names)
            .unwrap();
        let mut file = sable_syntax::parse(&prep.text).unwrap();
        let sable_syntax::ast::DeclKind::Func(func) = &mut file.decls[0].kind else {
            panic!("expected a function");
        };
        let body = func.body.as_mut().unwrap();
        body.stmts.insert(1, Stmt::new(sable_syntax::ast::StmtKind::Break(None)));
        let err = ParentIndex::build(&file).unwrap_err();
        assert!(matches!(
            err,
            LowerError::Marker {
                violation: Violation::Malformed,
                ..
            }
        ));
    }
}
