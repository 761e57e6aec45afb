//! Synthetic reference and count columns for standalone tables.
//!
//! Every non-root standalone table gets the root document id; tables deeper
//! than two levels also get the id of their immediate parent group instance.
//! The nearest standalone ancestor of each such table gets a `{key}_count`
//! column, or `{prefix}_count` when two of its counted tables share a
//! document key. All of them are queued as synthetic columns, which the
//! layout splices in directly after the table's own id column.

use std::collections::BTreeMap;

use commons_model::{ColumnType, FieldGroupTree, GroupId, SchemaField};

use crate::plan::{ColumnSource, Placement, PlannedColumn, TableLayout};

pub(crate) fn inject_reference_columns(
    tree: &FieldGroupTree,
    placements: &BTreeMap<GroupId, Placement>,
    table_order: &[GroupId],
    tables: &mut BTreeMap<GroupId, TableLayout>,
) {
    let root = tree.root();
    let root_node = tree.node(root);
    let root_id_type = id_type(tables, root, root, &root_node.id_key);

    let mut keys_per_anchor: BTreeMap<(GroupId, &str), usize> = BTreeMap::new();
    for &group in table_order {
        if let Some(anchor) = count_anchor(tree, placements, group) {
            *keys_per_anchor
                .entry((anchor, tree.node(group).key.as_str()))
                .or_insert(0) += 1;
        }
    }

    // Preorder: an ancestor's own references are queued before any count
    // column its descendants add to it.
    for &group in table_order {
        if group == root {
            continue;
        }
        let (Some(parent), Some(anchor)) =
            (tree.parent(group), count_anchor(tree, placements, group))
        else {
            continue;
        };
        let node = tree.node(group);
        let parent_node = tree.node(parent);

        let parent_reference = if tree.depth(group) > 2 {
            let parent_id_type = id_type(tables, anchor, parent, &parent_node.id_key);
            let name = parent_node.id_key.clone();
            let column = PlannedColumn {
                source: ColumnSource::ParentReference { parent },
                schema: SchemaField::new(name.clone(), parent_id_type)
                    .with_description(format!(
                        "Id of the parent {} record",
                        parent_node.name
                    ))
                    .required(),
            };
            Some((name, column))
        } else {
            None
        };

        let root_column = PlannedColumn {
            source: ColumnSource::RootReference,
            schema: SchemaField::new(root_node.id_key.clone(), root_id_type)
                .with_description(format!("Id of the {} record", root_node.name))
                .required(),
        };
        if let Some(layout) = tables.get_mut(&group) {
            if let Some((name, column)) = parent_reference {
                layout.parent_reference = Some(name);
                layout.synthetic.push(column);
            }
            layout.root_reference = Some(root_node.id_key.clone());
            layout.synthetic.push(root_column);
        }

        let shared_key = keys_per_anchor
            .get(&(anchor, node.key.as_str()))
            .is_some_and(|count| *count > 1);
        let count_name = if shared_key {
            format!("{}_count", node.prefix)
        } else {
            format!("{}_count", node.key)
        };
        if let Some(ancestor) = tables.get_mut(&anchor) {
            ancestor.count_columns.push((group, count_name.clone()));
            ancestor.synthetic.push(PlannedColumn {
                source: ColumnSource::Count { child: group },
                schema: SchemaField::new(count_name, ColumnType::Int64)
                    .with_description(format!("Number of {} records", node.name))
                    .required(),
            });
        }
    }
}

/// Table that holds the count column of the standalone table `group`.
fn count_anchor(
    tree: &FieldGroupTree,
    placements: &BTreeMap<GroupId, Placement>,
    group: GroupId,
) -> Option<GroupId> {
    let parent = tree.parent(group)?;
    match placements.get(&parent) {
        Some(Placement::Merged { into }) => Some(*into),
        _ => Some(parent),
    }
}

/// Type of `group`'s id column as laid out in the table `table`.
fn id_type(
    tables: &BTreeMap<GroupId, TableLayout>,
    table: GroupId,
    group: GroupId,
    id_key: &str,
) -> ColumnType {
    tables
        .get(&table)
        .and_then(|layout| {
            layout.natural.iter().find(|planned| {
                matches!(&planned.source, ColumnSource::Field { group: owner, field }
                    if *owner == group && field == id_key)
            })
        })
        .map_or(ColumnType::String, |planned| planned.schema.column_type)
}
