//! Per-document flattening.
//!
//! Walks one document and emits a [`FlatRecord`] for the root and for every
//! element of every nested list, in traversal order. Embedded 1:1 objects
//! write their fields into the record currently being filled. Records carry
//! the root id and the id of their immediate parent group instance; the
//! reducer later decides which of them survive as rows.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use commons_model::{GroupId, Row};

use crate::analyzer::require_child;
use crate::error::DecomposeError;
use crate::plan::Plan;
use crate::value::{Slot, classify, record_id};

/// One flattened group instance.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub group: GroupId,
    /// Index of the record this one was found in; `None` for the root.
    pub parent: Option<usize>,
    /// Id of the root document.
    pub case_id: Value,
    /// Id of the immediate parent group instance (the root id for the root).
    pub parent_id: Value,
    /// Own id-key value.
    pub id: Value,
    /// Field values keyed by their planned column name.
    pub row: Row,
}

/// All records of one document, in traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedCase {
    records: Vec<FlatRecord>,
}

impl FlattenedCase {
    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FlatRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows grouped by the field group that produced them, merged groups included.
    pub fn rows_by_group(&self, plan: &Plan) -> BTreeMap<String, Vec<&Row>> {
        let mut grouped: BTreeMap<String, Vec<&Row>> = BTreeMap::new();
        for record in &self.records {
            grouped
                .entry(plan.tree().name(record.group).to_string())
                .or_default()
                .push(&record.row);
        }
        grouped
    }
}

/// Flatten one document against a previously built plan.
///
/// Fails instead of dropping data when the document holds a field group or
/// a non-null field the plan does not know about, or more than one instance
/// of a group the plan merged into its parent.
pub fn flatten_case(document: &Value, plan: &Plan) -> Result<FlattenedCase, DecomposeError> {
    let Value::Object(map) = document else {
        return Err(DecomposeError::NotAnObject);
    };
    let root = plan.tree().root();
    let case_id = require_id(plan, root, map)?;
    let mut flattener = Flattener {
        plan,
        case_id: case_id.clone(),
        records: vec![FlatRecord {
            group: root,
            parent: None,
            case_id: case_id.clone(),
            parent_id: case_id.clone(),
            id: case_id.clone(),
            row: Row::new(),
        }],
    };
    flattener.visit(root, map, 0, &case_id)?;
    trace!(records = flattener.records.len(), "flattened document");
    Ok(FlattenedCase {
        records: flattener.records,
    })
}

struct Flattener<'p> {
    plan: &'p Plan,
    case_id: Value,
    records: Vec<FlatRecord>,
}

impl Flattener<'_> {
    /// Write the content of one group instance into `record`.
    ///
    /// `instance_id` is the id of the instance being visited; nested records
    /// found here use it as their parent id.
    fn visit(
        &mut self,
        group: GroupId,
        map: &Map<String, Value>,
        record: usize,
        instance_id: &Value,
    ) -> Result<(), DecomposeError> {
        let plan = self.plan;
        let tree = plan.tree();
        let node = tree.node(group);
        for (key, value) in map {
            let child = tree.child_by_key(group, key);
            match classify(&node.name, key, value, child.is_some())? {
                Slot::Empty => {}
                Slot::Leaf(leaf) => {
                    if node.is_excluded(key) {
                        continue;
                    }
                    let column = plan.field_column(group, key).ok_or_else(|| {
                        DecomposeError::UnplannedField {
                            group: node.name.clone(),
                            field: key.clone(),
                        }
                    })?;
                    self.records[record].row.insert(column, leaf);
                }
                Slot::One(instance) => {
                    let child = self.require_planned(group, key, child)?;
                    if plan.is_standalone(child) {
                        self.push_record(child, instance, record, instance_id)?;
                    } else {
                        let id = require_id(plan, child, instance)?;
                        self.visit(child, instance, record, &id)?;
                    }
                }
                Slot::Many(instances) => {
                    let child = self.require_planned(group, key, child)?;
                    // A merged group has a single home row per parent instance.
                    if instances.len() > 1 && !plan.is_standalone(child) {
                        return Err(DecomposeError::UnplannedCardinality {
                            group: tree.name(child).to_string(),
                            count: instances.len(),
                        });
                    }
                    for instance in instances {
                        self.push_record(child, instance, record, instance_id)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn push_record(
        &mut self,
        group: GroupId,
        map: &Map<String, Value>,
        parent: usize,
        parent_id: &Value,
    ) -> Result<(), DecomposeError> {
        let id = require_id(self.plan, group, map)?;
        let index = self.records.len();
        self.records.push(FlatRecord {
            group,
            parent: Some(parent),
            case_id: self.case_id.clone(),
            parent_id: parent_id.clone(),
            id: id.clone(),
            row: Row::new(),
        });
        self.visit(group, map, index, &id)
    }

    fn require_planned(
        &self,
        group: GroupId,
        key: &str,
        child: Option<GroupId>,
    ) -> Result<GroupId, DecomposeError> {
        let tree = self.plan.tree();
        let child = require_child(tree, group, key, child)?;
        if self.plan.placement(child).is_none() {
            return Err(DecomposeError::UnplannedFieldGroup {
                group: tree.name(child).to_string(),
            });
        }
        Ok(child)
    }
}

fn require_id(
    plan: &Plan,
    group: GroupId,
    map: &Map<String, Value>,
) -> Result<Value, DecomposeError> {
    let node = plan.tree().node(group);
    record_id(map, &node.id_key).ok_or_else(|| DecomposeError::MissingRecordId {
        group: node.name.clone(),
        id_key: node.id_key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use commons_model::{FieldGroupConfig, FieldGroupTree};
    use serde_json::json;

    use super::*;
    use crate::analyzer::analyze;

    #[test]
    fn records_carry_root_and_parent_ids() {
        let tree = FieldGroupTree::new(vec![
            FieldGroupConfig::new("cases", "case_id"),
            FieldGroupConfig::new("cases.diagnoses", "diagnosis_id").with_parent("cases"),
            FieldGroupConfig::new("cases.diagnoses.treatments", "treatment_id")
                .with_parent("cases.diagnoses"),
        ])
        .expect("tree");
        let doc = json!({
            "case_id": "C1",
            "diagnoses": [
                {"diagnosis_id": "D1", "treatments": [{"treatment_id": "T1"}, {"treatment_id": "T2"}]},
                {"diagnosis_id": "D2"},
            ],
        });
        let report = analyze(&tree, [&doc]).expect("analyze");
        let plan = Plan::build(&tree, &report).expect("plan");

        let flattened = flatten_case(&doc, &plan).expect("flatten");
        let ids: Vec<(&Value, &Value, Option<usize>)> = flattened
            .records()
            .iter()
            .map(|record| (&record.id, &record.parent_id, record.parent))
            .collect();
        assert_eq!(
            ids,
            vec![
                (&json!("C1"), &json!("C1"), None),
                (&json!("D1"), &json!("C1"), Some(0)),
                (&json!("T1"), &json!("D1"), Some(1)),
                (&json!("T2"), &json!("D1"), Some(1)),
                (&json!("D2"), &json!("C1"), Some(0)),
            ]
        );
        assert!(flattened.records().iter().all(|record| record.case_id == json!("C1")));

        let grouped = flattened.rows_by_group(&plan);
        assert_eq!(grouped["cases.diagnoses"].len(), 2);
        assert_eq!(grouped["cases.diagnoses.treatments"].len(), 2);
    }

    #[test]
    fn standalone_dict_is_a_single_record() {
        let tree = FieldGroupTree::new(vec![
            FieldGroupConfig::new("cases", "case_id"),
            FieldGroupConfig::new("cases.samples", "sample_id").with_parent("cases"),
        ])
        .expect("tree");
        let samples = tree.lookup("cases.samples").expect("samples");
        let plan = Plan::from_placements(
            &tree,
            &[samples].into_iter().collect(),
            &crate::StructureReport::new(),
        )
        .expect("plan");
        let doc = json!({"case_id": "C1", "samples": {"sample_id": "S1"}});
        let flattened = flatten_case(&doc, &plan).expect("flatten");
        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened.records()[1].group, samples);
        assert_eq!(flattened.records()[1].row.get("sample_id"), Some(&json!("S1")));
    }
}
