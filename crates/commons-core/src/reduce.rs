//! Merge and count reduction of a flattened document.

use std::collections::BTreeMap;

use serde_json::Value;

use commons_model::{CaseTables, GroupId, Row};

use crate::error::DecomposeError;
use crate::flatten::{FlattenedCase, flatten_case};
use crate::plan::Plan;

/// Turn flattened records into table rows.
///
/// Records of merged groups are folded into the row of their standalone home
/// record. Standalone rows receive their reference columns and one count per
/// directly attached standalone child table, `0` when there are none.
pub fn reduce_case(flattened: FlattenedCase, plan: &Plan) -> CaseTables {
    let mut records = flattened.into_records();

    // Records are pushed parent-first, so a parent's home is always known
    // before any of its children is looked at.
    let mut home: Vec<usize> = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let owner = match record.parent {
            Some(parent) if !plan.is_standalone(record.group) => home[parent],
            _ => idx,
        };
        home.push(owner);
    }

    let mut counts: BTreeMap<(usize, GroupId), u64> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        if home[idx] != idx {
            continue;
        }
        if let Some(parent) = record.parent {
            *counts.entry((home[parent], record.group)).or_insert(0) += 1;
        }
    }

    for idx in 0..records.len() {
        let owner = home[idx];
        if owner != idx {
            let row = std::mem::take(&mut records[idx].row);
            records[owner].row.absorb(row);
        }
    }

    let mut tables = CaseTables::new();
    for (idx, record) in records.into_iter().enumerate() {
        if home[idx] != idx {
            continue;
        }
        let Some(layout) = plan.table(record.group) else {
            continue;
        };
        let mut row: Row = record.row;
        if let Some(column) = layout.parent_reference() {
            row.insert(column, record.parent_id);
        }
        if let Some(column) = layout.root_reference() {
            row.insert(column, record.case_id);
        }
        for (child, column) in layout.count_columns() {
            let count = counts.get(&(idx, *child)).copied().unwrap_or(0);
            row.insert(column.as_str(), Value::from(count));
        }
        tables.push_row(&layout.name, row);
    }
    tables
}

/// Flatten and reduce one document.
pub fn decompose_case(document: &Value, plan: &Plan) -> Result<CaseTables, DecomposeError> {
    let flattened = flatten_case(document, plan)?;
    Ok(reduce_case(flattened, plan))
}
