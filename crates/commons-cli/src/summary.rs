use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use commons_core::PlanSummary;
use commons_model::FieldGroupTree;

use crate::types::{DecomposeResult, PlanResult};

pub fn print_groups(tree: &FieldGroupTree) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field group"),
        header_cell("Key"),
        header_cell("Prefix"),
        header_cell("Id key"),
        header_cell("Columns"),
        header_cell("Excluded"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for &group in tree.preorder() {
        let node = tree.node(group);
        table.add_row(vec![
            group_cell(&node.name, node.depth),
            Cell::new(&node.key),
            Cell::new(&node.prefix),
            Cell::new(&node.id_key),
            Cell::new(node.columns.len()),
            count_cell(node.excluded.len()),
        ]);
    }
    println!("{table}");
}

pub fn print_plan(result: &PlanResult) {
    println!("Input: {}", result.input.display());
    println!("Documents: {}", result.summary.documents);
    if let Some(path) = &result.schema_path {
        println!("Schema: {}", path.display());
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Max per parent"),
        header_cell("Columns"),
        header_cell("Merged field groups"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for summary in &result.summary.tables {
        let merged = merged_into(&result.summary, &summary.name);
        table.add_row(vec![
            table_cell(&summary.name),
            summary
                .max_count
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(summary.columns.len()),
            if merged.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(merged.join("\n"))
            },
        ]);
    }
    println!("{table}");
}

pub fn print_decompose(result: &DecomposeResult) {
    println!("Input: {}", result.input.display());
    println!("Output: {}", result.output_dir.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("File"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    let mut total_rows = 0usize;
    for written in &result.tables {
        total_rows += written.rows;
        let file = written
            .data_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        table.add_row(vec![
            table_cell(&written.name),
            count_cell(written.rows),
            Cell::new(written.columns),
            Cell::new(file),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(format!("{} documents", result.documents)).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    if result.has_errors() {
        eprintln!("Skipped documents:");
        for failure in &result.failures {
            eprintln!("- {}", failure.error);
        }
    }
}

fn merged_into<'a>(summary: &'a PlanSummary, table: &str) -> Vec<&'a str> {
    summary
        .merged
        .iter()
        .filter(|(_, into)| into.as_str() == table)
        .map(|(group, _)| group.as_str())
        .collect()
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn group_cell(name: &str, depth: usize) -> Cell {
    if depth <= 1 {
        Cell::new(name)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold)
    } else {
        let indent = "  ".repeat(depth - 2);
        Cell::new(format!("{indent}  -> {name}"))
    }
}

fn table_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
