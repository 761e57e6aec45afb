//! Structure analysis of a document population.
//!
//! One pass over every document records, per field group, which fields ever
//! carry a non-null value (and of what type) and the largest number of
//! instances a single parent instance holds. Nothing here decides table
//! shape; the report only grows while documents are observed.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::trace;

use commons_model::{ColumnType, FieldGroupTree, GroupId};

use crate::error::DecomposeError;
use crate::value::{Slot, classify};

/// What was seen for one field across the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldStats {
    pub column_type: ColumnType,
    pub non_null: usize,
}

/// Population-wide structure facts consumed by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureReport {
    documents: usize,
    fields: BTreeMap<GroupId, BTreeMap<String, FieldStats>>,
    max_counts: BTreeMap<GroupId, usize>,
}

impl StructureReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents observed.
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn fields(&self, group: GroupId) -> Option<&BTreeMap<String, FieldStats>> {
        self.fields.get(&group)
    }

    pub fn field(&self, group: GroupId, field: &str) -> Option<&FieldStats> {
        self.fields.get(&group)?.get(field)
    }

    /// Largest instance count of `group` under one parent instance.
    pub fn max_count(&self, group: GroupId) -> Option<usize> {
        self.max_counts.get(&group).copied()
    }

    /// A group is observed once it had at least one instance somewhere.
    pub fn is_observed(&self, group: GroupId) -> bool {
        self.max_counts.contains_key(&group) || self.fields.contains_key(&group)
    }

    /// Observed field names keyed by group name.
    pub fn fields_by_group(&self, tree: &FieldGroupTree) -> BTreeMap<String, BTreeSet<String>> {
        self.fields
            .iter()
            .map(|(group, fields)| {
                (
                    tree.name(*group).to_string(),
                    fields.keys().cloned().collect(),
                )
            })
            .collect()
    }

    /// Cardinality map keyed by group name.
    pub fn max_count_by_group(&self, tree: &FieldGroupTree) -> BTreeMap<String, usize> {
        self.max_counts
            .iter()
            .map(|(group, count)| (tree.name(*group).to_string(), *count))
            .collect()
    }

    /// Record a non-null value of `field` in `group`.
    pub fn record_field(&mut self, group: GroupId, field: &str, column_type: ColumnType) {
        let fields = self.fields.entry(group).or_default();
        match fields.get_mut(field) {
            Some(stats) => {
                stats.column_type = stats.column_type.widen(column_type);
                stats.non_null += 1;
            }
            None => {
                fields.insert(
                    field.to_string(),
                    FieldStats {
                        column_type,
                        non_null: 1,
                    },
                );
            }
        }
    }

    /// Record that one parent instance held `count` instances of `group`.
    pub fn record_count(&mut self, group: GroupId, count: usize) {
        let entry = self.max_counts.entry(group).or_insert(count);
        if count > *entry {
            *entry = count;
        }
    }
}

/// Incremental population scanner.
pub struct StructureAnalyzer<'a> {
    tree: &'a FieldGroupTree,
    report: StructureReport,
}

impl<'a> StructureAnalyzer<'a> {
    pub fn new(tree: &'a FieldGroupTree) -> Self {
        Self {
            tree,
            report: StructureReport::new(),
        }
    }

    /// Scan one more document.
    ///
    /// On error the report keeps whatever the failing document contributed
    /// before the problem was found; callers abort the plan in that case.
    pub fn observe(&mut self, document: &Value) -> Result<(), DecomposeError> {
        let Value::Object(map) = document else {
            return Err(DecomposeError::NotAnObject);
        };
        let root = self.tree.root();
        self.report.record_count(root, 1);
        self.visit(root, map)?;
        self.report.documents += 1;
        Ok(())
    }

    pub fn report(&self) -> &StructureReport {
        &self.report
    }

    pub fn finish(self) -> StructureReport {
        self.report
    }

    fn visit(&mut self, group: GroupId, map: &Map<String, Value>) -> Result<(), DecomposeError> {
        let tree = self.tree;
        let node = tree.node(group);
        for (key, value) in map {
            let child = tree.child_by_key(group, key);
            match classify(&node.name, key, value, child.is_some())? {
                Slot::Empty => {}
                Slot::Leaf(leaf) => {
                    if node.is_excluded(key) {
                        continue;
                    }
                    if let Some(column_type) = ColumnType::of_scalar(&leaf) {
                        self.report.record_field(group, key, column_type);
                    }
                }
                Slot::One(record) => {
                    let child = require_child(tree, group, key, child)?;
                    self.report.record_count(child, 1);
                    self.visit(child, record)?;
                }
                Slot::Many(records) => {
                    let child = require_child(tree, group, key, child)?;
                    trace!(group = %tree.name(child), count = records.len(), "nested list");
                    self.report.record_count(child, records.len());
                    for record in records {
                        self.visit(child, record)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Scan a whole population in one call.
pub fn analyze<'d, I>(tree: &FieldGroupTree, documents: I) -> Result<StructureReport, DecomposeError>
where
    I: IntoIterator<Item = &'d Value>,
{
    let mut analyzer = StructureAnalyzer::new(tree);
    for (index, document) in documents.into_iter().enumerate() {
        analyzer
            .observe(document)
            .map_err(|error| error.in_document(index))?;
    }
    Ok(analyzer.finish())
}

pub(crate) fn require_child(
    tree: &FieldGroupTree,
    group: GroupId,
    key: &str,
    child: Option<GroupId>,
) -> Result<GroupId, DecomposeError> {
    child.ok_or_else(|| DecomposeError::UnknownFieldGroup {
        parent: tree.name(group).to_string(),
        key: key.to_string(),
    })
}
