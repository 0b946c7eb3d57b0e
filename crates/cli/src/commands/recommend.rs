use carmatch_core::{HardConstraints, PreferenceWeights, RecommendOutcome, Recommendation};
use clap::Args;
use tracing::{info, warn};

use crate::commands::{bootstrap, format_price, CommandResult, RuntimeArgs, EXIT_INPUT};

const COMMAND: &str = "recommend";

#[derive(Debug, Clone, Default, Args)]
pub struct RecommendArgs {
    #[arg(long, help = "Engine: V4, V6, V8, V10, V12 or Electric")]
    pub engine: Option<String>,
    #[arg(long, help = "Horsepower range: 0-449, 450-620 or 620+")]
    pub hp: Option<String>,
    #[arg(long, help = "Price range, e.g. '$100,000-$199,999'")]
    pub price: Option<String>,
    #[arg(long, help = "Torque range: 0-499, 500-750 or 750+")]
    pub torque: Option<String>,
    #[arg(long = "car-type", help = "Car type: Sedan, SUV, Sports or Luxury")]
    pub car_type: Option<String>,
    #[arg(
        long,
        default_value = "50,50,50,50",
        help = "Importance of rating, reliability, 0-60 time and top speed, each 0-100"
    )]
    pub weights: String,
    #[arg(long, help = "Emit machine-readable JSON output")]
    pub json: bool,
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

impl RecommendArgs {
    fn constraints(&self) -> HardConstraints {
        HardConstraints {
            engine: self.engine.clone(),
            horsepower: self.hp.clone(),
            price: self.price.clone(),
            torque: self.torque.clone(),
            car_type: self.car_type.clone(),
        }
    }
}

pub fn run(args: &RecommendArgs) -> CommandResult {
    let runtime = match bootstrap(COMMAND, &args.runtime) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let correlation_id = runtime.correlation_id.as_str();

    let outcome = args
        .weights
        .parse::<PreferenceWeights>()
        .and_then(|weights| runtime.recommender.recommend(&args.constraints(), &weights));

    match outcome {
        Ok(outcome) => {
            info!(
                event_name = "cli.recommend.completed",
                correlation_id,
                matched = outcome.recommendation().is_some(),
                "recommend command finished"
            );
            if args.json {
                let message = match &outcome {
                    RecommendOutcome::Match(recommendation) => {
                        format!("best fit is {}", recommendation.best.record.name)
                    }
                    RecommendOutcome::NoMatch => "no car matches the selected constraints".into(),
                };
                CommandResult::success_with_data(COMMAND, message, correlation_id, &outcome)
            } else {
                CommandResult::text(render_human(&outcome))
            }
        }
        Err(error) => {
            warn!(
                event_name = "cli.recommend.rejected",
                correlation_id,
                error = %error,
                "recommend input rejected"
            );
            CommandResult::interface_failure(COMMAND, &error.into_interface(correlation_id), EXIT_INPUT)
        }
    }
}

fn render_human(outcome: &RecommendOutcome) -> String {
    match outcome {
        RecommendOutcome::NoMatch => {
            "no match: no car satisfies the selected constraints; try widening a range".to_string()
        }
        RecommendOutcome::Match(recommendation) => render_recommendation(recommendation),
    }
}

fn render_recommendation(recommendation: &Recommendation) -> String {
    let best = &recommendation.best;
    let car = &best.record;
    let mut lines = vec![
        format!("best fit: {}", car.name),
        format!(
            "  {} {} | {} hp | {} lb-ft | {}",
            car.engine,
            car.car_type,
            car.horsepower,
            car.torque,
            format_price(car.price)
        ),
        format!(
            "  0-60 {:.1}s | top speed {} mph | rating {:.1} | reliability {:.1}",
            car.zero_to_sixty, car.max_speed, car.rating, car.reliability
        ),
        format!(
            "  preference score {:.2} | performance score {}",
            best.preference_score, best.performance_score
        ),
        format!("  image: {}", best.image_path),
    ];

    if recommendation.similar.is_empty() {
        lines.push("similar cars: none".to_string());
    } else {
        lines.push("similar cars:".to_string());
        for (rank, similar) in recommendation.similar.iter().enumerate() {
            lines.push(format!(
                "  {}. {} ({}% similar) {} | image: {}",
                rank + 1,
                similar.record.name,
                similar.similarity_percent,
                format_price(similar.record.price),
                similar.image_path
            ));
        }
    }

    if recommendation.ranked.len() > 1 {
        lines.push(format!("other candidates: {}", recommendation.ranked.len() - 1));
    }
    lines.join("\n")
}
