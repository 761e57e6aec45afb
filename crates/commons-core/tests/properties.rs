//! Property tests over generated case populations.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use serde_json::{Value, json};

use commons_core::{
    ErrorKind, ErrorPolicy, Plan, PopulationTables, decompose_case, decompose_population,
    plan_population,
};
use commons_model::{FieldGroupConfig, FieldGroupTree, Row};

/// Per case, per diagnosis: number of treatments and whether a grade is set.
type CaseShape = Vec<(usize, bool)>;

fn tree() -> FieldGroupTree {
    FieldGroupTree::new(vec![
        FieldGroupConfig::new("cases", "case_id"),
        FieldGroupConfig::new("cases.diagnoses", "diagnosis_id")
            .with_parent("cases")
            .with_prefix("diag")
            .with_columns(["diagnosis_id", "grade"]),
        FieldGroupConfig::new("cases.diagnoses.treatments", "treatment_id")
            .with_parent("cases.diagnoses")
            .with_prefix("diag__treat")
            .with_columns(["treatment_id", "treatment_type"]),
    ])
    .expect("tree")
}

fn population() -> impl Strategy<Value = Vec<CaseShape>> {
    prop::collection::vec(
        prop::collection::vec((0usize..3, any::<bool>()), 0..3),
        1..6,
    )
}

fn build_documents(shapes: &[CaseShape]) -> Vec<Value> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, diagnoses)| {
            let diagnoses: Vec<Value> = diagnoses
                .iter()
                .enumerate()
                .map(|(j, (treatments, graded))| {
                    let treatments: Vec<Value> = (0..*treatments)
                        .map(|k| {
                            json!({
                                "treatment_id": format!("C{i}-D{j}-T{k}"),
                                "treatment_type": "Surgery",
                            })
                        })
                        .collect();
                    json!({
                        "diagnosis_id": format!("C{i}-D{j}"),
                        "grade": if *graded { json!("G2") } else { Value::Null },
                        "treatments": treatments,
                    })
                })
                .collect();
            json!({"case_id": format!("C{i}"), "diagnoses": diagnoses})
        })
        .collect()
}

fn decompose(docs: &[Value]) -> (Plan, PopulationTables) {
    let tree = tree();
    let plan = plan_population(&tree, docs).expect("plan");
    let output = decompose_population(&plan, docs, ErrorPolicy::FailFast).expect("decompose");
    (plan, output)
}

/// Values of `group`'s field `field`, wherever the plan put them.
fn field_values<'a>(
    plan: &Plan,
    rows: impl Fn(&str) -> &'a [Row],
    group: &str,
    field: &str,
) -> Vec<&'a Value> {
    let Some(group) = plan.tree().lookup(group) else {
        return Vec::new();
    };
    let (Some(home), Some(column)) = (plan.home(group), plan.field_column(group, field)) else {
        return Vec::new();
    };
    rows(plan.tree().name(home))
        .iter()
        .filter_map(|row| row.get(column))
        .collect()
}

fn check_links(plan: &Plan, output: &PopulationTables) -> Result<(), TestCaseError> {
    let tree = plan.tree();
    for layout in plan.tables() {
        let Some(parent) = tree.parent(layout.group) else {
            continue;
        };
        let anchor = plan.home(parent).expect("parent is planned");
        let anchor_name = tree.name(anchor);
        let anchor_key = plan
            .field_column(parent, &tree.node(parent).id_key)
            .expect("parent id column");
        let reference = layout
            .parent_reference()
            .or(layout.root_reference())
            .expect("reference column");
        let count_column = plan
            .table(anchor)
            .and_then(|table| {
                table
                    .count_columns()
                    .iter()
                    .find(|(child, _)| *child == layout.group)
            })
            .map(|(_, column)| column.as_str())
            .expect("count column");

        let children = output.rows(&layout.name);
        for child in children {
            let target = child.get(reference).expect("reference value");
            let owners = output
                .rows(anchor_name)
                .iter()
                .filter(|row| row.get(anchor_key) == Some(target))
                .count();
            prop_assert_eq!(owners, 1, "{} row points at {}", layout.name, target);

            let case_id = child.get("case_id").expect("root reference");
            let cases = output
                .rows("cases")
                .iter()
                .filter(|row| row.get("case_id") == Some(case_id))
                .count();
            prop_assert_eq!(cases, 1);
        }

        for row in output.rows(anchor_name) {
            let expected = match row.get(anchor_key) {
                Some(key) => children
                    .iter()
                    .filter(|child| child.get(reference) == Some(key))
                    .count(),
                None => 0,
            };
            prop_assert_eq!(row.get(count_column), Some(&json!(expected)));
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn references_resolve_and_counts_match(shapes in population()) {
        let docs = build_documents(&shapes);
        let (plan, output) = decompose(&docs);
        check_links(&plan, &output)?;
    }

    #[test]
    fn no_instance_or_value_is_lost(shapes in population()) {
        let docs = build_documents(&shapes);
        let (plan, output) = decompose(&docs);

        let diagnoses: usize = shapes.iter().map(Vec::len).sum();
        let treatments: usize = shapes.iter().flatten().map(|(count, _)| count).sum();
        let grades = shapes.iter().flatten().filter(|(_, graded)| *graded).count();

        prop_assert_eq!(output.rows("cases").len(), shapes.len());
        let rows = |table: &str| output.rows(table);
        prop_assert_eq!(
            field_values(&plan, rows, "cases.diagnoses", "diagnosis_id").len(),
            diagnoses
        );
        prop_assert_eq!(
            field_values(&plan, rows, "cases.diagnoses.treatments", "treatment_id").len(),
            treatments
        );
        prop_assert_eq!(
            field_values(&plan, rows, "cases.diagnoses", "grade").len(),
            grades
        );
    }

    #[test]
    fn plan_ignores_document_order(shapes in population()) {
        let tree = tree();
        let mut docs = build_documents(&shapes);
        let forward = plan_population(&tree, &docs).expect("plan");
        docs.reverse();
        let backward = plan_population(&tree, &docs).expect("plan");
        prop_assert_eq!(forward.schema(), backward.schema());
        prop_assert_eq!(forward.column_order(), backward.column_order());
    }

    #[test]
    fn repeated_decomposition_is_identical(shapes in population()) {
        let docs = build_documents(&shapes);
        let (plan, first) = decompose(&docs);
        let second = decompose_population(&plan, &docs, ErrorPolicy::FailFast).expect("decompose");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn stale_plan_rejects_or_keeps_every_value(
        shapes in population(),
        planned_cases in 1usize..6,
    ) {
        let tree = tree();
        let docs = build_documents(&shapes);
        let planned_cases = planned_cases.min(docs.len());
        let plan = plan_population(&tree, &docs[..planned_cases]).expect("plan");

        for (doc, diagnoses) in docs.iter().zip(&shapes) {
            let tables = match decompose_case(doc, &plan) {
                Ok(tables) => tables,
                Err(err) => {
                    prop_assert_eq!(err.kind(), ErrorKind::PlanMismatch);
                    continue;
                }
            };
            let rows = |table: &str| tables.rows(table);
            let treatments: usize = diagnoses.iter().map(|(count, _)| count).sum();
            let grades = diagnoses.iter().filter(|(_, graded)| *graded).count();
            prop_assert_eq!(
                field_values(&plan, rows, "cases.diagnoses", "diagnosis_id").len(),
                diagnoses.len()
            );
            prop_assert_eq!(
                field_values(&plan, rows, "cases.diagnoses.treatments", "treatment_id").len(),
                treatments
            );
            prop_assert_eq!(field_values(&plan, rows, "cases.diagnoses", "grade").len(), grades);
        }
    }
}
