//! Tests for commons-model types.

use commons_model::{ConfigError, FieldGroupConfig, FieldGroupTree};

fn gdc_like() -> Vec<FieldGroupConfig> {
    vec![
        FieldGroupConfig::new("cases", "case_id").with_columns(["case_id", "submitter_id"]),
        FieldGroupConfig::new("cases.diagnoses", "diagnosis_id")
            .with_parent("cases")
            .with_prefix("diag"),
        FieldGroupConfig::new("cases.diagnoses.treatments", "treatment_id")
            .with_parent("cases.diagnoses")
            .with_prefix("diag__treat"),
        FieldGroupConfig::new("cases.follow_ups", "follow_up_id").with_parent("cases"),
    ]
}

#[test]
fn resolves_children_by_document_key() {
    let tree = FieldGroupTree::new(gdc_like()).expect("tree");
    let root = tree.root();
    let diagnoses = tree.child_by_key(root, "diagnoses").expect("diagnoses");
    assert_eq!(tree.name(diagnoses), "cases.diagnoses");
    assert_eq!(tree.node(diagnoses).prefix, "diag");
    assert!(tree.child_by_key(root, "treatments").is_none());
    let treatments = tree.child_by_key(diagnoses, "treatments").expect("treatments");
    assert_eq!(tree.parent(treatments), Some(diagnoses));
    assert!(tree.is_within(treatments, root));
    assert!(!tree.is_within(diagnoses, treatments));
}

#[test]
fn children_keep_declaration_order() {
    let tree = FieldGroupTree::new(gdc_like()).expect("tree");
    let names: Vec<&str> = tree
        .children(tree.root())
        .iter()
        .map(|id| tree.name(*id))
        .collect();
    assert_eq!(names, vec!["cases.diagnoses", "cases.follow_ups"]);
}

#[test]
fn id_key_must_be_a_configured_column() {
    let mut config = FieldGroupConfig::new("cases", "case_id");
    config.columns = vec!["submitter_id".to_string()];
    let err = FieldGroupTree::new(vec![config]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingIdColumn {
            group: "cases".to_string(),
            id_key: "case_id".to_string(),
        }
    );
}

#[test]
fn id_key_cannot_be_excluded() {
    let config = FieldGroupConfig::new("cases", "case_id").with_excluded(["case_id"]);
    let err = FieldGroupTree::new(vec![config]).unwrap_err();
    assert!(matches!(err, ConfigError::ExcludedIdKey { .. }));
}

#[test]
fn rejects_second_root() {
    let configs = vec![
        FieldGroupConfig::new("cases", "case_id"),
        FieldGroupConfig::new("files", "file_id"),
    ];
    let err = FieldGroupTree::new(configs).unwrap_err();
    assert!(matches!(err, ConfigError::MultipleRoots { .. }));
}

#[test]
fn rejects_duplicate_sibling_keys() {
    let configs = vec![
        FieldGroupConfig::new("cases", "case_id"),
        FieldGroupConfig::new("cases.samples", "sample_id").with_parent("cases"),
        FieldGroupConfig::new("cases.other_samples", "other_id")
            .with_parent("cases")
            .with_key("samples"),
    ];
    let err = FieldGroupTree::new(configs).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateKey { .. }));
}

#[test]
fn rejects_shared_prefixes() {
    let configs = vec![
        FieldGroupConfig::new("cases", "case_id"),
        FieldGroupConfig::new("cases.diagnoses", "diagnosis_id")
            .with_parent("cases")
            .with_prefix("x"),
        FieldGroupConfig::new("cases.samples", "sample_id")
            .with_parent("cases")
            .with_prefix("x"),
    ];
    let err = FieldGroupTree::new(configs).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicatePrefix { .. }));
}

#[test]
fn empty_configuration_is_rejected() {
    assert_eq!(FieldGroupTree::new(Vec::new()).unwrap_err(), ConfigError::Empty);
}

#[test]
fn handles_of_a_larger_tree_are_not_contained() {
    let large = FieldGroupTree::new(gdc_like()).expect("tree");
    let small = FieldGroupTree::new(vec![FieldGroupConfig::new("cases", "case_id")]).expect("tree");
    let follow_ups = large.lookup("cases.follow_ups").expect("follow_ups");
    assert!(large.contains(follow_ups));
    assert!(!small.contains(follow_ups));
    assert!(small.get(follow_ups).is_none());
    assert_eq!(small.get(small.root()).map(|node| node.name.as_str()), Some("cases"));
}
