//! Table set and column-order planning.
//!
//! A [`Plan`] is the immutable result of planning one population: which field
//! groups become standalone tables, which ones are merged into an ancestor
//! table, and the ordered schema of every table. Plans are built once and then
//! shared read-only by every per-document decomposition.
//!
//! Column layout happens in two phases:
//!
//! 1. every observed natural field gets a global ordinal rank, walking the
//!    field-group tree in declaration order (configured columns first, then
//!    unconfigured fields by name);
//! 2. each table collects the fields of its own group and of all groups merged
//!    into it, ordered by rank, and the reference injector inserts synthetic
//!    columns right after the table's id column.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use commons_model::{ColumnType, FieldGroupTree, GroupId, SchemaField};

use crate::analyzer::StructureReport;
use crate::error::DecomposeError;
use crate::references::inject_reference_columns;

/// Where the rows of a field group end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// The group is materialised as its own table.
    Standalone,
    /// The group's fields are flattened into the table of `into`.
    Merged { into: GroupId },
}

/// Origin of a planned column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// A field read from documents.
    Field { group: GroupId, field: String },
    /// Id of the root document the row descends from.
    RootReference,
    /// Id of the immediate parent group instance.
    ParentReference { parent: GroupId },
    /// Number of rows of `child` hanging off this row.
    Count { child: GroupId },
}

impl ColumnSource {
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, Self::Field { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    pub source: ColumnSource,
    pub schema: SchemaField,
}

impl PlannedColumn {
    pub fn name(&self) -> &str {
        &self.schema.name
    }
}

/// Ordered columns of one standalone table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub group: GroupId,
    pub name: String,
    pub(crate) natural: Vec<PlannedColumn>,
    pub(crate) synthetic: Vec<PlannedColumn>,
    columns: Vec<PlannedColumn>,
    pub(crate) parent_reference: Option<String>,
    pub(crate) root_reference: Option<String>,
    pub(crate) count_columns: Vec<(GroupId, String)>,
}

impl TableLayout {
    fn new(group: GroupId, name: &str, natural: Vec<PlannedColumn>) -> Self {
        Self {
            group,
            name: name.to_string(),
            natural,
            synthetic: Vec::new(),
            columns: Vec::new(),
            parent_reference: None,
            root_reference: None,
            count_columns: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(PlannedColumn::name).collect()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|planned| planned.name() == column)
    }

    pub fn schema(&self) -> Vec<SchemaField> {
        self.columns.iter().map(|planned| planned.schema.clone()).collect()
    }

    /// Column holding the immediate parent's id, for tables deeper than two.
    pub fn parent_reference(&self) -> Option<&str> {
        self.parent_reference.as_deref()
    }

    /// Column holding the root document id, for every non-root table.
    pub fn root_reference(&self) -> Option<&str> {
        self.root_reference.as_deref()
    }

    /// Count columns as `(child group, column name)`.
    pub fn count_columns(&self) -> &[(GroupId, String)] {
        &self.count_columns
    }

    /// Index of the table's own id column among the natural fields.
    pub(crate) fn natural_id_index(&self, id_key: &str) -> usize {
        self.natural
            .iter()
            .position(|planned| {
                matches!(&planned.source, ColumnSource::Field { group, field }
                    if *group == self.group && field == id_key)
            })
            .unwrap_or(0)
    }

    /// Splice synthetic columns in right after the id column.
    fn assemble(&mut self, id_key: &str) -> Result<(), DecomposeError> {
        let at = if self.natural.is_empty() {
            0
        } else {
            self.natural_id_index(id_key) + 1
        };
        let mut columns = self.natural.clone();
        columns.splice(at..at, self.synthetic.iter().cloned());
        let mut seen = BTreeSet::new();
        for planned in &columns {
            if !seen.insert(planned.name()) {
                return Err(DecomposeError::ColumnCollision {
                    table: self.name.clone(),
                    column: planned.name().to_string(),
                });
            }
        }
        self.columns = columns;
        Ok(())
    }
}

/// Serializable overview of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub documents: usize,
    pub tables: Vec<TableSummary>,
    /// Merged group name -> table it was flattened into.
    pub merged: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub max_count: Option<usize>,
    pub columns: Vec<SchemaField>,
}

/// Immutable decomposition plan for one population.
#[derive(Debug, Clone)]
pub struct Plan {
    tree: FieldGroupTree,
    documents: usize,
    max_counts: BTreeMap<GroupId, usize>,
    placements: BTreeMap<GroupId, Placement>,
    table_order: Vec<GroupId>,
    tables: BTreeMap<GroupId, TableLayout>,
    field_columns: BTreeMap<GroupId, BTreeMap<String, String>>,
}

impl Plan {
    /// Decide the table set from observed cardinalities and lay out columns.
    ///
    /// The root and every group seen with more than one instance under a
    /// single parent instance become standalone tables.
    pub fn build(tree: &FieldGroupTree, report: &StructureReport) -> Result<Self, DecomposeError> {
        let mut standalone = BTreeSet::new();
        for &group in tree.preorder() {
            if report.max_count(group).is_some_and(|count| count > 1) {
                standalone.insert(group);
            }
        }
        Self::from_placements(tree, &standalone, report)
    }

    /// Build a plan with an explicit set of standalone groups.
    ///
    /// The root is always standalone whether listed or not. Groups named here
    /// are placed even when the report never observed them. Handles that do
    /// not belong to `tree` are rejected.
    pub fn from_placements(
        tree: &FieldGroupTree,
        standalone: &BTreeSet<GroupId>,
        report: &StructureReport,
    ) -> Result<Self, DecomposeError> {
        if let Some(foreign) = standalone.iter().find(|group| !tree.contains(**group)) {
            return Err(DecomposeError::ForeignGroup {
                index: foreign.index(),
            });
        }
        let root = tree.root();
        let mut placed: BTreeSet<GroupId> = BTreeSet::from([root]);
        for &group in tree.preorder() {
            if report.is_observed(group) || standalone.contains(&group) {
                placed.insert(group);
                placed.extend(tree.ancestors(group));
            }
        }

        let mut placements = BTreeMap::new();
        let mut table_order = Vec::new();
        for &group in tree.preorder() {
            if !placed.contains(&group) {
                continue;
            }
            let placement = if group == root || standalone.contains(&group) {
                table_order.push(group);
                Placement::Standalone
            } else {
                let into = tree
                    .ancestors(group)
                    .find(|ancestor| *ancestor == root || standalone.contains(ancestor))
                    .unwrap_or(root);
                Placement::Merged { into }
            };
            debug!(group = %tree.name(group), ?placement, "placed field group");
            placements.insert(group, placement);
        }

        let ranked = rank_natural_fields(tree, report, &placements);
        let mut field_columns: BTreeMap<GroupId, BTreeMap<String, String>> = BTreeMap::new();
        let mut natural_by_table: BTreeMap<GroupId, Vec<(usize, PlannedColumn)>> =
            BTreeMap::new();
        for field in ranked {
            let home = home_of(&placements, field.group);
            let column = column_name(tree, home, field.group, &field.field);
            field_columns
                .entry(field.group)
                .or_default()
                .insert(field.field.clone(), column.clone());
            let node = tree.node(field.group);
            let mut schema = SchemaField::new(column, field.column_type)
                .with_description(node.description(&field.field).unwrap_or_default());
            if field.group == home && field.field == node.id_key {
                schema = schema.required();
            }
            natural_by_table.entry(home).or_default().push((
                field.rank,
                PlannedColumn {
                    source: ColumnSource::Field {
                        group: field.group,
                        field: field.field,
                    },
                    schema,
                },
            ));
        }

        let mut tables = BTreeMap::new();
        for &group in &table_order {
            let mut natural = natural_by_table.remove(&group).unwrap_or_default();
            natural.sort_by(|(a_rank, a), (b_rank, b)| {
                a_rank.cmp(b_rank).then_with(|| a.name().cmp(b.name()))
            });
            let natural = natural.into_iter().map(|(_, planned)| planned).collect();
            tables.insert(group, TableLayout::new(group, tree.name(group), natural));
        }

        inject_reference_columns(tree, &placements, &table_order, &mut tables);
        for (group, layout) in &mut tables {
            layout.assemble(&tree.node(*group).id_key)?;
        }

        let plan = Self {
            tree: tree.clone(),
            documents: report.documents(),
            max_counts: tree
                .preorder()
                .iter()
                .filter_map(|group| report.max_count(*group).map(|count| (*group, count)))
                .collect(),
            placements,
            table_order,
            tables,
            field_columns,
        };
        info!(
            documents = plan.documents,
            tables = plan.table_order.len(),
            merged = plan.placements.len() - plan.table_order.len(),
            "built decomposition plan"
        );
        Ok(plan)
    }

    pub fn tree(&self) -> &FieldGroupTree {
        &self.tree
    }

    /// Number of documents the plan was derived from.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Placement of `group`; `None` when the population never contained it.
    pub fn placement(&self, group: GroupId) -> Option<Placement> {
        self.placements.get(&group).copied()
    }

    pub fn is_standalone(&self, group: GroupId) -> bool {
        matches!(self.placement(group), Some(Placement::Standalone))
    }

    /// Standalone table that stores the fields of `group`.
    pub fn home(&self, group: GroupId) -> Option<GroupId> {
        self.placement(group).map(|placement| match placement {
            Placement::Standalone => group,
            Placement::Merged { into } => into,
        })
    }

    /// Standalone tables, parents before children.
    pub fn tables(&self) -> impl Iterator<Item = &TableLayout> {
        self.table_order
            .iter()
            .filter_map(|group| self.tables.get(group))
    }

    pub fn table(&self, group: GroupId) -> Option<&TableLayout> {
        self.tables.get(&group)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableLayout> {
        self.tree.lookup(name).and_then(|group| self.table(group))
    }

    pub fn table_names(&self) -> BTreeSet<String> {
        self.tables().map(|layout| layout.name.clone()).collect()
    }

    /// Output column of `field` in `group`, if the plan knows it.
    pub fn field_column(&self, group: GroupId, field: &str) -> Option<&str> {
        self.field_columns
            .get(&group)?
            .get(field)
            .map(String::as_str)
    }

    /// Ordered schema of every table, keyed by table name.
    pub fn schema(&self) -> BTreeMap<String, Vec<SchemaField>> {
        self.tables()
            .map(|layout| (layout.name.clone(), layout.schema()))
            .collect()
    }

    /// Column positions of every table, keyed by table name.
    pub fn column_order(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        self.tables()
            .map(|layout| {
                let positions = layout
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, planned)| (planned.name().to_string(), idx))
                    .collect();
                (layout.name.clone(), positions)
            })
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        let tables = self
            .tables()
            .map(|layout| TableSummary {
                name: layout.name.clone(),
                max_count: self.max_counts.get(&layout.group).copied(),
                columns: layout.schema(),
            })
            .collect();
        let merged = self
            .placements
            .iter()
            .filter_map(|(group, placement)| match placement {
                Placement::Merged { into } => Some((
                    self.tree.name(*group).to_string(),
                    self.tree.name(*into).to_string(),
                )),
                Placement::Standalone => None,
            })
            .collect();
        PlanSummary {
            documents: self.documents,
            tables,
            merged,
        }
    }
}

struct RankedField {
    group: GroupId,
    field: String,
    column_type: ColumnType,
    rank: usize,
}

/// Phase 1: global ordinal ranks for every observed natural field.
fn rank_natural_fields(
    tree: &FieldGroupTree,
    report: &StructureReport,
    placements: &BTreeMap<GroupId, Placement>,
) -> Vec<RankedField> {
    let mut ranked = Vec::new();
    let mut rank = 0usize;
    for &group in tree.preorder() {
        if !placements.contains_key(&group) {
            continue;
        }
        let node = tree.node(group);
        let observed = report.fields(group);
        let type_of = |field: &str| {
            observed
                .and_then(|fields| fields.get(field))
                .map(|stats| stats.column_type)
        };
        for field in &node.columns {
            if node.is_excluded(field) {
                continue;
            }
            let column_type = match type_of(field) {
                Some(column_type) => column_type,
                // The id column exists even if this population never filled it.
                None if *field == node.id_key => ColumnType::String,
                None => continue,
            };
            ranked.push(RankedField {
                group,
                field: field.clone(),
                column_type,
                rank,
            });
            rank += 1;
        }
        if let Some(fields) = observed {
            for (field, stats) in fields {
                if node.column_position(field).is_some() || node.is_excluded(field) {
                    continue;
                }
                warn!(group = %node.name, field = %field, "field missing from configured column order");
                ranked.push(RankedField {
                    group,
                    field: field.clone(),
                    column_type: stats.column_type,
                    rank,
                });
                rank += 1;
            }
        }
    }
    ranked
}

fn home_of(placements: &BTreeMap<GroupId, Placement>, group: GroupId) -> GroupId {
    match placements.get(&group) {
        Some(Placement::Merged { into }) => *into,
        _ => group,
    }
}

/// Fields keep their bare name in their own table and are prefixed by their
/// group's prefix once merged into another table.
fn column_name(tree: &FieldGroupTree, home: GroupId, group: GroupId, field: &str) -> String {
    if home == group {
        field.to_string()
    } else {
        format!("{}__{}", tree.node(group).prefix, field)
    }
}
