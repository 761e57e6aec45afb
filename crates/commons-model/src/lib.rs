pub mod error;
pub mod field_group;
pub mod schema;
pub mod table;

pub use error::ConfigError;
pub use field_group::{Ancestors, FieldGroupConfig, FieldGroupNode, FieldGroupTree, GroupId};
pub use schema::{ColumnType, SchemaField};
pub use table::{CaseTables, Row};

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn case_tables_defaults_to_empty_rows() {
        let mut tables = CaseTables::new();
        let mut row = Row::new();
        row.insert("case_id", json!("C1"));
        tables.push_row("cases", row);
        assert_eq!(tables.rows("cases").len(), 1);
        assert!(tables.rows("cases.diagnoses").is_empty());
        assert_eq!(tables.row_count(), 1);
    }

    #[test]
    fn case_tables_serializes_as_map() {
        let mut tables = CaseTables::new();
        let row: Row = [("case_id".to_string(), json!("C1"))].into_iter().collect();
        tables.push_row("cases", row);
        let json = serde_json::to_value(&tables).expect("serialize tables");
        assert_eq!(json, json!({"cases": [{"case_id": "C1"}]}));
    }
}
