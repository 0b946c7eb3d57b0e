use carmatch_core::RecommendError;
use clap::Args;
use tracing::{info, warn};

use crate::commands::{bootstrap, format_price, CommandResult, RuntimeArgs, EXIT_INPUT};

const COMMAND: &str = "similar";

#[derive(Debug, Clone, Default, Args)]
pub struct SimilarArgs {
    #[arg(help = "Exact catalogue name of the car")]
    pub name: String,
    #[arg(long, help = "Emit machine-readable JSON output")]
    pub json: bool,
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

pub fn run(args: &SimilarArgs) -> CommandResult {
    let runtime = match bootstrap(COMMAND, &args.runtime) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let correlation_id = runtime.correlation_id.as_str();
    let top_k = runtime.config.similarity.top_k;

    match runtime.recommender.similar(&args.name, top_k) {
        Ok(similar) => {
            info!(
                event_name = "cli.similar.completed",
                correlation_id,
                car = %args.name,
                returned = similar.len(),
                "similar command finished"
            );
            if args.json {
                let message = format!("{} cars similar to {}", similar.len(), args.name);
                return CommandResult::success_with_data(COMMAND, message, correlation_id, &similar);
            }

            let mut lines = vec![format!("cars similar to {}:", args.name)];
            if similar.is_empty() {
                lines.push("  none".to_string());
            }
            for (rank, car) in similar.iter().enumerate() {
                lines.push(format!(
                    "  {}. {} ({}% similar) {} {} | {} | image: {}",
                    rank + 1,
                    car.record.name,
                    car.similarity_percent,
                    car.record.engine,
                    car.record.car_type,
                    format_price(car.record.price),
                    car.image_path
                ));
            }
            CommandResult::text(lines.join("\n"))
        }
        Err(RecommendError::UnknownCar(name)) => {
            warn!(event_name = "cli.similar.unknown_car", correlation_id, car = %name, "unknown car");
            CommandResult::failure(
                COMMAND,
                "unknown_car",
                format!("no car named `{name}` in the catalogue"),
                EXIT_INPUT,
            )
        }
        Err(error) => {
            CommandResult::interface_failure(COMMAND, &error.into_interface(correlation_id), EXIT_INPUT)
        }
    }
}
