//! Reading case documents from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

/// Read a population from a JSON array, a single JSON object, or JSON Lines.
pub fn read_documents(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read documents from {}", path.display()))?;
    let documents = parse_documents(&text).with_context(|| format!("parse {}", path.display()))?;
    debug!(path = %path.display(), documents = documents.len(), "read documents");
    Ok(documents)
}

pub fn parse_documents(text: &str) -> Result<Vec<Value>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(object @ Value::Object(_)) => Ok(vec![object]),
        Ok(other) => bail!("expected case documents, found a bare {}", kind_of(&other)),
        // More than one top-level value: JSON Lines.
        Err(_) => parse_lines(text),
    }
}

fn parse_lines(text: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(line).with_context(|| format!("line {}", idx + 1))?;
        documents.push(value);
    }
    Ok(documents)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn array_and_lines_give_the_same_population() {
        let array = parse_documents(r#"[{"case_id": "C1"}, {"case_id": "C2"}]"#).expect("array");
        let lines = parse_documents("{\"case_id\": \"C1\"}\n\n{\"case_id\": \"C2\"}\n").expect("lines");
        assert_eq!(array, lines);
        assert_eq!(array[1], json!({"case_id": "C2"}));
    }

    #[test]
    fn bare_scalars_are_rejected() {
        let err = parse_documents("42").unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn bad_line_is_reported_by_number() {
        let err = parse_documents("{\"case_id\": \"C1\"}\n{oops\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2");
    }
}
