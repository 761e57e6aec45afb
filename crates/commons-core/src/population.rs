//! Population-level helpers: plan once, then decompose every document.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use commons_model::{FieldGroupTree, Row};

use crate::analyzer::analyze;
use crate::error::DecomposeError;
use crate::plan::Plan;
use crate::reduce::decompose_case;

/// What to do with a document that cannot be decomposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failing document.
    #[default]
    FailFast,
    /// Record the failure and keep going with the next document.
    SkipDocument,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub index: usize,
    pub error: DecomposeError,
}

/// Rows of a whole population, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTables {
    pub tables: BTreeMap<String, Vec<Row>>,
    pub documents: usize,
    pub failures: Vec<DocumentFailure>,
}

impl PopulationTables {
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Analyze the population and build its plan.
///
/// Any document error aborts planning; a partial plan is never returned.
pub fn plan_population<'d, I>(tree: &FieldGroupTree, documents: I) -> Result<Plan, DecomposeError>
where
    I: IntoIterator<Item = &'d Value>,
{
    let span = info_span!("plan_population", groups = tree.len());
    let _guard = span.enter();
    let report = analyze(tree, documents)?;
    info!(documents = report.documents(), "analyzed population");
    Plan::build(tree, &report)
}

/// Decompose every document with a shared plan.
///
/// Every planned table is present in the output, even when no document
/// produced a row for it.
pub fn decompose_population<'d, I>(
    plan: &Plan,
    documents: I,
    policy: ErrorPolicy,
) -> Result<PopulationTables, DecomposeError>
where
    I: IntoIterator<Item = &'d Value>,
{
    let span = info_span!("decompose_population", tables = plan.table_names().len());
    let _guard = span.enter();
    let mut output = PopulationTables {
        tables: plan
            .table_names()
            .into_iter()
            .map(|name| (name, Vec::new()))
            .collect(),
        ..PopulationTables::default()
    };
    for (index, document) in documents.into_iter().enumerate() {
        match decompose_case(document, plan) {
            Ok(case) => {
                for (table, rows) in case.into_inner() {
                    output.tables.entry(table).or_default().extend(rows);
                }
                output.documents += 1;
            }
            Err(error) => {
                let error = error.in_document(index);
                match policy {
                    ErrorPolicy::FailFast => return Err(error),
                    ErrorPolicy::SkipDocument => {
                        warn!(index, kind = ?error.kind(), %error, "skipping document");
                        output.failures.push(DocumentFailure { index, error });
                    }
                }
            }
        }
    }
    debug!(
        documents = output.documents,
        rows = output.row_count(),
        failures = output.failures.len(),
        "decomposed population"
    );
    Ok(output)
}
