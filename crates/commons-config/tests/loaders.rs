use std::fs;
use std::path::PathBuf;

use commons_config::{ConfigLoadError, FieldGroupManifest, field_groups_from_str, load_field_groups};
use commons_model::ConfigError;

fn bundled_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/gdc_clinical.toml")
}

#[test]
fn loads_bundled_clinical_config() {
    let tree = load_field_groups(&bundled_config()).expect("load config");
    assert_eq!(tree.name(tree.root()), "cases");
    let diagnoses = tree.lookup("cases.diagnoses").expect("diagnoses");
    assert_eq!(tree.node(diagnoses).prefix, "diag");
    assert_eq!(tree.node(diagnoses).key, "diagnoses");
    let treatments = tree.lookup("cases.diagnoses.treatments").expect("treatments");
    assert_eq!(tree.depth(treatments), 3);
    assert!(tree.node(tree.root()).is_excluded("state"));
}

#[test]
fn loads_from_file_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("groups.toml");
    fs::write(
        &path,
        r#"[config]
schema = "commons.field-groups"
schema_version = 1

[[field_groups]]
name = "cases"
id_key = "case_id"
columns = ["case_id"]
"#,
    )
    .expect("write config");
    let tree = load_field_groups(&path).expect("load config");
    assert_eq!(tree.len(), 1);
}

#[test]
fn missing_file_reports_path() {
    let err = load_field_groups(&PathBuf::from("does/not/exist.toml")).unwrap_err();
    match err {
        ConfigLoadError::Io { path, .. } => assert!(path.ends_with("exist.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejects_unknown_schema() {
    let err = field_groups_from_str(
        r#"[config]
schema = "something.else"
schema_version = 1
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigLoadError::InvalidHeader { .. }));
}

#[test]
fn rejects_future_schema_version() {
    let err = field_groups_from_str(
        r#"[config]
schema = "commons.field-groups"
schema_version = 2
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigLoadError::InvalidHeader { .. }));
}

#[test]
fn surfaces_tree_validation_errors() {
    let err = field_groups_from_str(
        r#"[config]
schema = "commons.field-groups"
schema_version = 1

[[field_groups]]
name = "cases"
id_key = "case_id"
columns = ["case_id"]

[[field_groups]]
name = "cases.samples"
parent = "cases.portions"
id_key = "sample_id"
columns = ["sample_id"]
"#,
    )
    .unwrap_err();
    match err {
        ConfigLoadError::Invalid { source, .. } => {
            assert!(matches!(source, ConfigError::UnknownParent { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = field_groups_from_str("[config\nschema = ").unwrap_err();
    assert!(matches!(err, ConfigLoadError::Toml { .. }));
}

#[test]
fn notes_summary_is_optional() {
    let text = fs::read_to_string(bundled_config()).expect("read config");
    let manifest: FieldGroupManifest = toml::from_str(&text).expect("parse config");
    assert_eq!(
        manifest.summary(),
        Some("Clinical field groups of a GDC-style case document")
    );

    let bare: FieldGroupManifest = toml::from_str(
        "[config]\nschema = \"commons.field-groups\"\nschema_version = 1\n",
    )
    .expect("parse config");
    assert_eq!(bare.summary(), None);
    assert!(bare.field_groups.is_empty());
}
