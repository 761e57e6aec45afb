//! Writing decomposed tables and their schemas.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, trace};

use commons_core::{Plan, PopulationTables};

use crate::logging::redact_value;

/// One table written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub data_path: PathBuf,
    pub schema_path: PathBuf,
}

/// Write `<table>.jsonl` and `<table>.schema.json` for every planned table.
///
/// Tables without rows still get an empty data file next to their schema.
pub fn write_tables(
    plan: &Plan,
    tables: &PopulationTables,
    output_dir: &Path,
) -> Result<Vec<WrittenTable>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;
    let mut written = Vec::new();
    for layout in plan.tables() {
        let data_path = output_dir.join(format!("{}.jsonl", layout.name));
        let schema_path = output_dir.join(format!("{}.schema.json", layout.name));
        let rows = tables.rows(&layout.name);

        let file = File::create(&data_path)
            .with_context(|| format!("create {}", data_path.display()))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            let line = serde_json::to_string(row).context("serialize row")?;
            trace!(table = %layout.name, row = %redact_value(&line), "row");
            writeln!(writer, "{line}").with_context(|| format!("write {}", data_path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("write {}", data_path.display()))?;

        write_json(&schema_path, &layout.schema())?;
        debug!(table = %layout.name, rows = rows.len(), path = %data_path.display(), "wrote table");
        written.push(WrittenTable {
            name: layout.name.clone(),
            rows: rows.len(),
            columns: layout.columns().len(),
            data_path,
            schema_path,
        });
    }
    Ok(written)
}

/// Pretty-print `value` as JSON into `path`.
pub fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("write {}", path.display()))?;
    writeln!(writer).with_context(|| format!("write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
