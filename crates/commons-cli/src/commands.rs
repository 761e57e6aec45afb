use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use commons_cli::documents::read_documents;
use commons_cli::output::{write_json, write_tables};
use commons_config::{load_field_groups, resolve_config_path};
use commons_core::{ErrorPolicy, Plan, decompose_population, plan_population};
use commons_model::FieldGroupTree;

use crate::cli::{DecomposeArgs, PlanArgs};
use crate::summary::print_groups;
use crate::types::{DecomposeResult, PlanResult};

pub fn run_groups(config: Option<&Path>) -> Result<()> {
    let tree = load_tree(config)?;
    print_groups(&tree);
    Ok(())
}

pub fn run_plan(config: Option<&Path>, args: &PlanArgs) -> Result<PlanResult> {
    let tree = load_tree(config)?;
    let plan = plan_input(&tree, &args.input)?;
    if let Some(path) = &args.output {
        write_json(path, &plan.schema()).context("write schema map")?;
        info!(path = %path.display(), "wrote schema map");
    }
    Ok(PlanResult {
        input: args.input.clone(),
        summary: plan.summary(),
        schema_path: args.output.clone(),
    })
}

pub fn run_decompose(config: Option<&Path>, args: &DecomposeArgs) -> Result<DecomposeResult> {
    let tree = load_tree(config)?;
    let documents = read_documents(&args.input)?;
    let plan = plan_population(&tree, &documents).context("plan population")?;

    let span = info_span!("decompose", input = %args.input.display());
    let _guard = span.enter();
    let start = Instant::now();
    let policy = if args.skip_invalid {
        ErrorPolicy::SkipDocument
    } else {
        ErrorPolicy::FailFast
    };
    let output =
        decompose_population(&plan, &documents, policy).context("decompose population")?;
    let tables = write_tables(&plan, &output, &args.output_dir)?;
    info!(
        documents = output.documents,
        skipped = output.failures.len(),
        tables = tables.len(),
        duration_ms = start.elapsed().as_millis(),
        "decomposition complete"
    );
    Ok(DecomposeResult {
        input: args.input.clone(),
        output_dir: args.output_dir.clone(),
        documents: output.documents,
        tables,
        failures: output.failures,
    })
}

fn load_tree(config: Option<&Path>) -> Result<FieldGroupTree> {
    let path = resolve_config_path(config)?;
    load_field_groups(&path).with_context(|| format!("load field groups from {}", path.display()))
}

fn plan_input(tree: &FieldGroupTree, input: &Path) -> Result<Plan> {
    let documents = read_documents(input)?;
    plan_population(tree, &documents).context("plan population")
}
