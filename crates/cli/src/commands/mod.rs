pub mod config;
pub mod doctor;
pub mod inspect;
pub mod options;
pub mod recommend;
pub mod similar;

use std::path::PathBuf;

use carmatch_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use carmatch_core::{Catalogue, InterfaceError, Recommender};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOGUE: u8 = 3;
pub const EXIT_INPUT: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        correlation_id: &str,
        data: &impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: Some(correlation_id.to_string()),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Failure carrying the user-facing message, the underlying detail and
    /// the correlation id of the request.
    pub fn interface_failure(command: &str, error: &InterfaceError, exit_code: u8) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error.error_class().to_string()),
            message: format!("{} ({error})", error.user_message()),
            correlation_id: Some(error.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Flags shared by every command that needs a loaded catalogue.
#[derive(Debug, Clone, Default, Args)]
pub struct RuntimeArgs {
    #[arg(long, help = "Read configuration from this file instead of carmatch.toml")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Catalogue file, overriding catalogue.path")]
    pub catalogue: Option<PathBuf>,
    #[arg(long, help = "Number of similar cars to return, overriding similarity.top_k")]
    pub top_k: Option<usize>,
}

impl RuntimeArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                catalogue_path: self.catalogue.clone(),
                top_k: self.top_k,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub(crate) struct Runtime {
    pub config: AppConfig,
    pub recommender: Recommender,
    pub correlation_id: String,
}

/// Loads configuration and the catalogue, then builds every derived
/// structure. Failures come back as ready-to-print results.
pub(crate) fn bootstrap(command: &str, args: &RuntimeArgs) -> Result<Runtime, CommandResult> {
    let correlation_id = Uuid::new_v4().to_string();

    let config = AppConfig::load(args.load_options()).map_err(|error| {
        error!(
            event_name = "cli.bootstrap.config_failed",
            command,
            correlation_id = %correlation_id,
            error = %error,
            "configuration could not be loaded"
        );
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })?;

    let catalogue = Catalogue::load(&config.catalogue.path, config.catalogue_options())
        .map_err(|error| {
            error!(
                event_name = "cli.bootstrap.catalogue_failed",
                command,
                correlation_id = %correlation_id,
                error = %error,
                "catalogue could not be loaded"
            );
            CommandResult::interface_failure(
                command,
                &error.into_interface(correlation_id.clone()),
                EXIT_CATALOGUE,
            )
        })?;

    let recommender = Recommender::build(catalogue, config.recommender_options());
    info!(
        event_name = "cli.bootstrap.completed",
        command,
        correlation_id = %correlation_id,
        records = recommender.catalogue().len(),
        "runtime ready"
    );

    Ok(Runtime { config, recommender, correlation_id })
}

pub(crate) fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}")
}

#[cfg(test)]
mod tests {
    use super::{format_price, CommandResult};

    #[test]
    fn prices_are_grouped_by_thousands() {
        assert_eq!(format_price(0), "$0");
        assert_eq!(format_price(999), "$999");
        assert_eq!(format_price(120_000), "$120,000");
        assert_eq!(format_price(1_250_000), "$1,250,000");
    }

    #[test]
    fn success_payload_omits_empty_fields() {
        let result = CommandResult::success("options", "listed");
        assert_eq!(result.exit_code, 0);
        assert!(!result.output.contains("correlation_id"));
        assert!(result.output.contains("\"status\":\"ok\""));
    }
}
