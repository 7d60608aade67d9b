//! Exactly-once accounting for markers.
//!
//! The ledger is built from the parsed skeleton before any pass runs. Each
//! pass consumes the markers it lowers; after the last pass every marker
//! must have been consumed exactly once.

use std::collections::BTreeMap;

use sable_common::{Marker, MarkerId, MarkerKind, Origin};
use sable_syntax::ast::{CaseClause, Decl, SourceFile, Stmt};
use sable_syntax::walk::{walk_clause, walk_decl, walk_stmt, Visit};

use crate::error::{LowerError, Violation};

/// Node kind a marker is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Decl,
    Stmt,
    Clause,
}

#[derive(Debug)]
struct Entry {
    kind: MarkerKind,
    origin: Origin,
    consumed: bool,
}

#[derive(Debug, Default)]
pub struct MarkerLedger {
    entries: BTreeMap<MarkerId, Entry>,
}

impl MarkerLedger {
    /// Record every marker in `file`.
    ///
    /// Fails on duplicate ids and on markers attached to a node kind their
    /// payload cannot belong to.
    pub fn collect(file: &SourceFile) -> Result<Self, LowerError> {
        let mut collector = Collector {
            ledger: MarkerLedger::default(),
            error: None,
        };
        collector.visit_file(file);
        match collector.error {
            Some(err) => Err(err),
            None => Ok(collector.ledger),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.entries.values().filter(|e| e.consumed).count()
    }

    /// Mark `marker` as lowered.
    pub fn consume(&mut self, marker: &Marker) -> Result<(), LowerError> {
        let Some(entry) = self.entries.get_mut(&marker.id) else {
            return Err(LowerError::marker(
                Violation::Dangling,
                Some(marker.id),
                Some(marker.kind()),
                "marker is not part of this unit",
                Some(marker.origin),
            ));
        };
        if entry.consumed {
            return Err(LowerError::marker(
                Violation::Duplicate,
                Some(marker.id),
                Some(entry.kind),
                "marker consumed twice",
                Some(entry.origin),
            ));
        }
        entry.consumed = true;
        Ok(())
    }

    /// Fail on the first marker nobody consumed.
    pub fn verify(&self) -> Result<(), LowerError> {
        match self.entries.iter().find(|(_, e)| !e.consumed) {
            Some((id, entry)) => Err(LowerError::marker(
                Violation::Unconsumed,
                Some(*id),
                Some(entry.kind),
                "no pass lowered this construct",
                Some(entry.origin),
            )),
            None => Ok(()),
        }
    }

    fn record(&mut self, marker: &Marker, anchor: Anchor) -> Result<(), LowerError> {
        let expected = match marker.kind() {
            MarkerKind::EnumDecl => Anchor::Decl,
            MarkerKind::Arm => Anchor::Clause,
            MarkerKind::Target | MarkerKind::Scrutinee | MarkerKind::Dispatch => Anchor::Stmt,
        };
        if expected != anchor {
            return Err(LowerError::marker(
                Violation::Dangling,
                Some(marker.id),
                Some(marker.kind()),
                format!("attached to a {anchor:?} instead of a {expected:?}").to_lowercase(),
                Some(marker.origin),
            ));
        }
        if self.entries.contains_key(&marker.id) {
            return Err(LowerError::marker(
                Violation::Duplicate,
                Some(marker.id),
                Some(marker.kind()),
                "id used by more than one marker",
                Some(marker.origin),
            ));
        }
        self.entries.insert(
            marker.id,
            Entry {
                kind: marker.kind(),
                origin: marker.origin,
                consumed: false,
            },
        );
        Ok(())
    }
}

struct Collector {
    ledger: MarkerLedger,
    error: Option<LowerError>,
}

impl Collector {
    fn record_all(&mut self, markers: &[Marker], anchor: Anchor) {
        for marker in markers {
            if self.error.is_some() {
                return;
            }
            if let Err(err) = self.ledger.record(marker, anchor) {
                self.error = Some(err);
            }
        }
    }
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_decl(&mut self, decl: &'ast Decl) {
        self.record_all(&decl.markers, Anchor::Decl);
        walk_decl(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        self.record_all(&stmt.markers, Anchor::Stmt);
        walk_stmt(self, stmt);
    }

    fn visit_clause(&mut self, clause: &'ast CaseClause) {
        self.record_all(&clause.markers, Anchor::Clause);
        walk_clause(self, clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_common::{MarkerPayload, Span};
    use sable_syntax::ast::DeclKind;

    fn marker(id: u32, payload: MarkerPayload) -> Marker {
        Marker::new(MarkerId(id), Origin::new(1, Span::new(0, 1)), payload)
    }

    fn target(id: u32) -> Marker {
        marker(
            id,
            MarkerPayload::Target {
                match_id: 0,
                name: "x".into(),
            },
        )
    }

    fn file_with_stmt_markers(markers: Vec<Marker>) -> SourceFile {
        let mut file = sable_syntax::parse("package p\n\nfunc f() {\n\tx := 1\n\t_ = x\n}\n").unwrap();
        let DeclKind::Func(func) = &mut file.decls[0].kind else {
            unreachable!()
        };
        func.body.as_mut().unwrap().stmts[0].markers = markers;
        file
    }

    #[test]
    fn every_marker_must_be_consumed() {
        let file = file_with_stmt_markers(vec![target(0), target(1)]);
        let mut ledger = MarkerLedger::collect(&file).unwrap();
        assert_eq!(ledger.len(), 2);
        ledger.consume(&target(0)).unwrap();
        let err = ledger.verify().unwrap_err();
        assert!(matches!(
            err,
            LowerError::Marker {
                violation: Violation::Unconsumed,
                id: Some(MarkerId(1)),
                ..
            }
        ));
        ledger.consume(&target(1)).unwrap();
        ledger.verify().unwrap();
        assert_eq!(ledger.consumed(), 2);
    }

    #[test]
    fn double_consumption_is_rejected() {
        let file = file_with_stmt_markers(vec![target(0)]);
        let mut ledger = MarkerLedger::collect(&file).unwrap();
        ledger.consume(&target(0)).unwrap();
        assert!(matches!(
            ledger.consume(&target(0)),
            Err(LowerError::Marker {
                violation: Violation::Duplicate,
                ..
            })
        ));
    }

    #[test]
    fn duplicate_ids_fail_collection() {
        let file = file_with_stmt_markers(vec![target(3), target(3)]);
        assert!(matches!(
            MarkerLedger::collect(&file),
            Err(LowerError::Marker {
                violation: Violation::Duplicate,
                ..
            })
        ));
    }

    #[test]
    fn misplaced_marker_is_dangling() {
        let enum_marker = marker(
            0,
            MarkerPayload::EnumDecl {
                name: "Shape".into(),
                type_params: Vec::new(),
                variants: Vec::new(),
            },
        );
        let file = file_with_stmt_markers(vec![enum_marker]);
        let err = MarkerLedger::collect(&file).unwrap_err();
        assert!(err.to_string().contains("attached to a stmt instead of a decl"));
    }
}
