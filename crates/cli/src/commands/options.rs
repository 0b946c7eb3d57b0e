use carmatch_core::ConstraintOptions;

use crate::commands::CommandResult;

/// Allowed values of every hard constraint, in display order.
pub fn run(json_output: bool) -> CommandResult {
    let options = ConstraintOptions::all();

    if json_output {
        return match serde_json::to_string_pretty(&options) {
            Ok(output) => CommandResult::text(output),
            Err(error) => CommandResult::failure("options", "serialization", error.to_string(), 1),
        };
    }

    let lines = [
        render_line("--engine", &options.engines),
        render_line("--hp", &options.horsepower),
        render_line("--price", &options.price),
        render_line("--torque", &options.torque),
        render_line("--car-type", &options.car_types),
    ];
    CommandResult::text(lines.join("\n"))
}

fn render_line(flag: &str, values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|value| format!("'{value}'")).collect();
    format!("{flag:<11} {}", quoted.join(" | "))
}
