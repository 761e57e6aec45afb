use std::path::PathBuf;

use commons_cli::output::WrittenTable;
use commons_core::{DocumentFailure, PlanSummary};

#[derive(Debug)]
pub struct PlanResult {
    pub input: PathBuf,
    pub summary: PlanSummary,
    pub schema_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DecomposeResult {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub documents: usize,
    pub tables: Vec<WrittenTable>,
    pub failures: Vec<DocumentFailure>,
}

impl DecomposeResult {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }
}
