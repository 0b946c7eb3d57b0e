use carmatch_core::config::AppConfig;
use carmatch_core::{Catalogue, Recommender};
use serde::Serialize;

use crate::commands::{CommandResult, RuntimeArgs, EXIT_CATALOGUE, EXIT_CONFIG};

/// Exit code when only the derived structure check fails.
pub const EXIT_INCONSISTENT: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exits 0 when every check passes, otherwise with the code of the first
/// failing check: config 2, catalogue 3, derived structures 1.
pub fn run(args: &RuntimeArgs, json_output: bool) -> CommandResult {
    let report = build_report(args);
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn exit_code(report: &DoctorReport) -> u8 {
    let first_failure = report.checks.iter().find(|check| check.status == CheckStatus::Fail);
    match first_failure.map(|check| check.name) {
        None => 0,
        Some("config_validation") => EXIT_CONFIG,
        Some("catalogue_load") => EXIT_CATALOGUE,
        Some(_) => EXIT_INCONSISTENT,
    }
}

fn build_report(args: &RuntimeArgs) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(args.load_options()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match Catalogue::load(&config.catalogue.path, config.catalogue_options()) {
                Ok(catalogue) => {
                    checks.push(check_catalogue(&config, &catalogue));
                    checks.push(check_derived_structures(&config, catalogue));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "catalogue_load",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("derived_structures", "catalogue did not load"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("catalogue_load", "configuration did not load"));
            checks.push(skipped("derived_structures", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: format!("skipped because {reason}"),
    }
}

fn check_catalogue(config: &AppConfig, catalogue: &Catalogue) -> DoctorCheck {
    if catalogue.is_empty() {
        return DoctorCheck {
            name: "catalogue_load",
            status: CheckStatus::Fail,
            details: format!("`{}` has a header but no records", config.catalogue.path.display()),
        };
    }

    let unindexable = catalogue.unindexable_count();
    let mut details =
        format!("loaded {} records from `{}`", catalogue.len(), config.catalogue.path.display());
    if unindexable > 0 {
        details.push_str(&format!(
            "; {unindexable} with unknown engine or car type cannot be matched by constraints"
        ));
    }
    DoctorCheck { name: "catalogue_load", status: CheckStatus::Pass, details }
}

fn check_derived_structures(config: &AppConfig, catalogue: Catalogue) -> DoctorCheck {
    let records = catalogue.len();
    let indexable = records - catalogue.unindexable_count();
    let recommender = Recommender::build(catalogue, config.recommender_options());

    let leaves = recommender.filter().leaf_count();
    let edges = recommender.graph().edge_count();
    let expected_edges = records * records.saturating_sub(1) / 2;
    let vectors = recommender.features().len();

    let consistent = leaves == indexable && edges == expected_edges && vectors == records;
    DoctorCheck {
        name: "derived_structures",
        status: if consistent { CheckStatus::Pass } else { CheckStatus::Fail },
        details: format!(
            "{vectors} feature vectors, {leaves}/{indexable} index leaves, {edges}/{expected_edges} similarity edges"
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
