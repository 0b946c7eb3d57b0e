use carmatch_core::CatalogueSummary;
use clap::Args;
use serde::Serialize;

use crate::commands::{bootstrap, CommandResult, RuntimeArgs};

const COMMAND: &str = "inspect";

#[derive(Debug, Clone, Default, Args)]
pub struct InspectArgs {
    #[arg(long, help = "Emit machine-readable JSON output")]
    pub json: bool,
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    catalogue_path: String,
    #[serde(flatten)]
    summary: CatalogueSummary,
    index_leaves: usize,
    index_paths: usize,
}

pub fn run(args: &InspectArgs) -> CommandResult {
    let runtime = match bootstrap(COMMAND, &args.runtime) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let index = runtime.recommender.filter();
    let report = InspectReport {
        catalogue_path: runtime.config.catalogue.path.display().to_string(),
        summary: runtime.recommender.summary(),
        index_leaves: index.leaf_count(),
        index_paths: index.path_count(),
    };

    if args.json {
        let message = format!("{} records", report.summary.records);
        return CommandResult::success_with_data(
            COMMAND,
            message,
            &runtime.correlation_id,
            &report,
        );
    }
    CommandResult::text(render_human(&report))
}

fn render_human(report: &InspectReport) -> String {
    let summary = &report.summary;
    let mut lines = vec![
        format!("catalogue: {}", report.catalogue_path),
        format!(
            "records: {} ({} indexable, {} unreachable through the decision index)",
            summary.records, summary.indexable, summary.unindexable
        ),
        format!(
            "decision index: {} leaves on {} distinct paths",
            report.index_leaves, report.index_paths
        ),
        format!("similarity graph: {} edges", summary.similarity_edges),
        format!(
            "ranking: preference formula {}, top {} similar cars",
            summary.preference_formula, summary.top_k
        ),
        "columns:".to_string(),
    ];
    for column in &summary.columns {
        lines.push(format!("  {:<14} min {:>12.2}  max {:>12.2}", column.column, column.min, column.max));
    }

    lines.push("engines:".to_string());
    for (engine, count) in &summary.engines {
        lines.push(format!("  {engine}: {count}"));
    }
    lines.push("car types:".to_string());
    for (car_type, count) in &summary.car_types {
        lines.push(format!("  {car_type}: {count}"));
    }
    lines.join("\n")
}
