//! Binding records → deduplicated binding graph.
//!
//! Each record contributes one binding node, one node per subject and one
//! node for its role reference, plus binding → subject and binding → roleRef
//! edges. Subject and role nodes are keyed by `(kind, name)`, so the same
//! subject referenced by many bindings is a single node with many incoming
//! edges. Edges are never collapsed.
//!
//! Malformed input degrades locally: the offending record, subject or role
//! reference is skipped and a [`Diagnostic`] is recorded.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{
    present, BindingRecord, EdgeKind, Graph, Node, NodeId, NodeKey, RoleRef, Subject,
};

/// Why part of a binding record was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum MalformedRecord {
    #[error("binding is missing `{field}`")]
    MissingField { field: &'static str },

    #[error("binding has no subjects")]
    NoSubjects,

    #[error("subject #{index} is missing `{field}`")]
    InvalidSubject {
        index: usize,
        field: &'static str,
        subject: Subject,
    },

    #[error("binding has no roleRef")]
    MissingRoleRef,

    #[error("roleRef is missing `{field}`")]
    InvalidRoleRef {
        field: &'static str,
        role_ref: RoleRef,
    },

    #[error("node id `{id}` is already owned by a different entity")]
    IdCollision { id: String },
}

/// A skipped element together with the record it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("record #{record_index}: {problem}")]
pub struct Diagnostic {
    /// Position of the record in the input snapshot.
    pub record_index: usize,
    pub problem: MalformedRecord,
    pub record: BindingRecord,
}

/// Output of a build: the graph plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub graph: Graph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turns binding records into a [`Graph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self
    }

    /// Build a graph from a full snapshot of binding records.
    ///
    /// Only an internal invariant violation is returned as `Err`; malformed
    /// records end up in [`BuildReport::diagnostics`].
    pub fn build(&self, records: &[BindingRecord]) -> Result<BuildReport> {
        let mut report = BuildReport {
            graph: Graph::with_capacity(records.len() * 3, records.len() * 2),
            diagnostics: Vec::new(),
        };

        for (index, record) in records.iter().enumerate() {
            let mut pass = RecordPass {
                index,
                record,
                report: &mut report,
            };
            pass.run()?;
        }

        tracing::debug!(
            records = records.len(),
            nodes = report.graph.node_count(),
            edges = report.graph.edge_count(),
            skipped = report.diagnostics.len(),
            "built binding graph"
        );
        Ok(report)
    }
}

/// Processing state for a single record.
struct RecordPass<'a> {
    index: usize,
    record: &'a BindingRecord,
    report: &'a mut BuildReport,
}

impl RecordPass<'_> {
    fn run(&mut self) -> Result<()> {
        let record = self.record;
        let Some(name) = present(&record.name) else {
            self.skip(MalformedRecord::MissingField { field: "name" });
            return Ok(());
        };
        let Some(kind) = present(&record.kind) else {
            self.skip(MalformedRecord::MissingField { field: "kind" });
            return Ok(());
        };
        let subjects = match record.subjects.as_deref() {
            None => {
                self.skip(MalformedRecord::MissingField { field: "subjects" });
                return Ok(());
            }
            Some([]) => {
                self.skip(MalformedRecord::NoSubjects);
                return Ok(());
            }
            Some(subjects) => subjects,
        };

        let binding = Node::new(NodeKey::binding(name), Some(kind.to_owned()), name);
        let Some(binding_id) = self.insert(binding) else {
            return Ok(());
        };

        for (index, subject) in subjects.iter().enumerate() {
            let fields = [
                ("kind", &subject.kind),
                ("apiGroup", &subject.api_group),
                ("name", &subject.name),
            ];
            match required(&fields) {
                Err(field) => self.skip(MalformedRecord::InvalidSubject {
                    index,
                    field,
                    subject: subject.clone(),
                }),
                Ok([kind, _, name]) => {
                    if let Some(subject_id) = self.insert_entity(kind, name) {
                        self.report
                            .graph
                            .connect(&binding_id, &subject_id, EdgeKind::Subject)?;
                    }
                }
            }
        }

        let Some(role_ref) = &record.role_ref else {
            self.skip(MalformedRecord::MissingRoleRef);
            return Ok(());
        };
        let fields = [
            ("kind", &role_ref.kind),
            ("apiGroup", &role_ref.api_group),
            ("name", &role_ref.name),
        ];
        match required(&fields) {
            Err(field) => self.skip(MalformedRecord::InvalidRoleRef {
                field,
                role_ref: role_ref.clone(),
            }),
            Ok([kind, _, name]) => {
                if let Some(role_id) = self.insert_entity(kind, name) {
                    self.report
                        .graph
                        .connect(&binding_id, &role_id, EdgeKind::RoleRef)?;
                }
            }
        }
        Ok(())
    }

    fn insert_entity(&mut self, kind: &str, name: &str) -> Option<NodeId> {
        let node = Node::new(NodeKey::entity(kind, name), None, format!("{kind} - {name}"));
        self.insert(node)
    }

    /// Insert or reuse a node; a collision is reported and yields `None`.
    fn insert(&mut self, node: Node) -> Option<NodeId> {
        let id = node.id.clone();
        match self.report.graph.insert_node(node) {
            Ok(_) => Some(id),
            Err(Error::IdCollision { id }) => {
                self.skip(MalformedRecord::IdCollision { id });
                None
            }
            Err(_) => None,
        }
    }

    fn skip(&mut self, problem: MalformedRecord) {
        tracing::warn!(
            record = self.index,
            name = self.record.name.as_deref().unwrap_or_default(),
            %problem,
            "skipping malformed binding element"
        );
        self.report.diagnostics.push(Diagnostic {
            record_index: self.index,
            problem,
            record: self.record.clone(),
        });
    }
}

/// Returns every field value, or the name of the first missing one.
fn required<'a>(
    fields: &[(&'static str, &'a Option<String>); 3],
) -> std::result::Result<[&'a str; 3], &'static str> {
    let mut values = [""; 3];
    for (slot, &(field, value)) in values.iter_mut().zip(fields.iter()) {
        *slot = present(value).ok_or(field)?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Subject {
        Subject::new("User", "rbac", "alice")
    }

    fn edit() -> RoleRef {
        RoleRef::new("Role", "rbac", "edit")
    }

    fn build(records: &[BindingRecord]) -> BuildReport {
        GraphBuilder::new().build(records).unwrap()
    }

    fn has_edge(graph: &Graph, source: &str, target: &str) -> usize {
        graph
            .edges()
            .iter()
            .filter(|e| e.source_id.as_str() == source && e.target_id.as_str() == target)
            .count()
    }

    #[test]
    fn test_empty_input() {
        let report = build(&[]);
        assert!(report.graph.is_empty());
        assert_eq!(report.graph.edge_count(), 0);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_single_binding() {
        let report = build(&[BindingRecord::new(
            "b1",
            "RoleBinding",
            vec![alice()],
            Some(edit()),
        )]);
        let graph = &report.graph;

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains("b1"));
        assert!(graph.contains("User-alice"));
        assert!(graph.contains("Role-edit"));
        assert_eq!(has_edge(graph, "b1", "User-alice"), 1);
        assert_eq!(has_edge(graph, "b1", "Role-edit"), 1);
        assert!(report.diagnostics.is_empty());

        let b1 = graph.node("b1").unwrap();
        assert_eq!(b1.kind.as_deref(), Some("RoleBinding"));
        assert_eq!(b1.label, "b1");

        let user = graph.node("User-alice").unwrap();
        assert_eq!(user.kind, None);
        assert_eq!(user.label, "User - alice");
    }

    #[test]
    fn test_shared_subject_collapses() {
        let report = build(&[
            BindingRecord::new("b1", "RoleBinding", vec![alice()], Some(edit())),
            BindingRecord::new("b2", "ClusterRoleBinding", vec![alice()], Some(edit())),
        ]);
        let graph = &report.graph;

        assert_eq!(graph.node_count(), 4);
        let into_alice = graph
            .edges()
            .iter()
            .filter(|e| e.target_id.as_str() == "User-alice")
            .count();
        assert_eq!(into_alice, 2);
    }

    #[test]
    fn test_missing_role_ref_keeps_subjects() {
        let report = build(&[BindingRecord::new("b1", "RoleBinding", vec![alice()], None)]);

        assert_eq!(report.graph.node_count(), 2);
        assert_eq!(report.graph.edge_count(), 1);
        assert_eq!(has_edge(&report.graph, "b1", "User-alice"), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].problem, MalformedRecord::MissingRoleRef);
    }

    #[test]
    fn test_invalid_role_ref_skips_only_edge() {
        let role_ref = RoleRef {
            name: None,
            ..edit()
        };
        let report = build(&[BindingRecord::new(
            "b1",
            "RoleBinding",
            vec![alice()],
            Some(role_ref),
        )]);

        assert_eq!(report.graph.node_count(), 2);
        assert_eq!(report.graph.edge_count(), 1);
        assert!(matches!(
            report.diagnostics[0].problem,
            MalformedRecord::InvalidRoleRef { field: "name", .. }
        ));
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let mut nameless = BindingRecord::new("x", "RoleBinding", vec![alice()], Some(edit()));
        nameless.name = None;
        let mut kindless = BindingRecord::new("y", "", vec![alice()], Some(edit()));
        kindless.id = Some(7);
        let no_subjects = BindingRecord::new("z", "RoleBinding", Vec::new(), Some(edit()));
        let mut null_subjects = BindingRecord::new("w", "RoleBinding", Vec::new(), Some(edit()));
        null_subjects.subjects = None;

        let report = build(&[
            nameless,
            kindless,
            no_subjects,
            null_subjects,
            BindingRecord::new("ok", "RoleBinding", vec![alice()], Some(edit())),
        ]);

        assert_eq!(report.graph.node_count(), 3);
        assert_eq!(report.graph.edge_count(), 2);

        let problems: Vec<_> = report.diagnostics.iter().map(|d| &d.problem).collect();
        assert_eq!(
            problems,
            vec![
                &MalformedRecord::MissingField { field: "name" },
                &MalformedRecord::MissingField { field: "kind" },
                &MalformedRecord::NoSubjects,
                &MalformedRecord::MissingField { field: "subjects" },
            ]
        );
        assert_eq!(report.diagnostics[1].record_index, 1);
        assert_eq!(report.diagnostics[1].record.id, Some(7));
    }

    #[test]
    fn test_invalid_subject_is_skipped() {
        let service_account = Subject {
            api_group: Some(String::new()),
            ..Subject::new("ServiceAccount", "", "builder")
        };
        let report = build(&[BindingRecord::new(
            "b1",
            "RoleBinding",
            vec![service_account, alice()],
            Some(edit()),
        )]);

        assert_eq!(report.graph.node_count(), 3);
        assert!(!report.graph.contains("ServiceAccount-builder"));
        assert_eq!(report.diagnostics.len(), 1);
        assert!(matches!(
            report.diagnostics[0].problem,
            MalformedRecord::InvalidSubject {
                index: 0,
                field: "apiGroup",
                ..
            }
        ));
    }

    #[test]
    fn test_id_collision_is_reported() {
        let report = build(&[
            BindingRecord::new(
                "User-alice",
                "RoleBinding",
                vec![Subject::new("User", "rbac", "bob")],
                Some(edit()),
            ),
            BindingRecord::new("b2", "RoleBinding", vec![alice()], Some(edit())),
        ]);

        let binding = report.graph.node("User-alice").unwrap();
        assert!(binding.is_binding());
        assert_eq!(report.graph.node_count(), 4);
        assert_eq!(has_edge(&report.graph, "b2", "User-alice"), 0);
        assert_eq!(has_edge(&report.graph, "b2", "Role-edit"), 1);
        assert_eq!(
            report.diagnostics[0].problem,
            MalformedRecord::IdCollision {
                id: "User-alice".into()
            }
        );
    }

    #[test]
    fn test_repeated_binding_name_reuses_node() {
        let report = build(&[
            BindingRecord::new("dup", "RoleBinding", vec![alice()], Some(edit())),
            BindingRecord::new("dup", "ClusterRoleBinding", vec![alice()], Some(edit())),
        ]);

        assert_eq!(report.graph.node_count(), 3);
        assert_eq!(report.graph.edge_count(), 4);
        assert_eq!(
            report.graph.node("dup").unwrap().kind.as_deref(),
            Some("RoleBinding")
        );
    }

    #[test]
    fn test_order_independent_nodes() {
        let records = vec![
            BindingRecord::new("b1", "RoleBinding", vec![alice()], Some(edit())),
            BindingRecord::new(
                "b2",
                "ClusterRoleBinding",
                vec![Subject::new("Group", "rbac", "ops"), alice()],
                Some(RoleRef::new("ClusterRole", "rbac", "admin")),
            ),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = build(&records).graph;
        let backward = build(&reversed).graph;
        assert!(forward.same_elements(&backward));
    }

    #[test]
    fn test_diagnostic_display() {
        let report = build(&[BindingRecord::new("b1", "RoleBinding", vec![alice()], None)]);
        assert_eq!(report.diagnostics[0].to_string(), "record #0: binding has no roleRef");
    }
}
