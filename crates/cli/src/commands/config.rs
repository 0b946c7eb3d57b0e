use std::env;
use std::fs;
use std::path::Path;

use carmatch_core::config::{resolve_config_path, AppConfig};
use toml::Value;

use crate::commands::{CommandResult, RuntimeArgs, EXIT_CONFIG};

pub fn run(args: &RuntimeArgs) -> CommandResult {
    let config = match AppConfig::load(args.load_options()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: EXIT_CONFIG,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let config_file_path = resolve_config_path(args.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str], flag: Option<&str>| {
        field_source(key_path, env_keys, flag, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "catalogue.path",
        &config.catalogue.path.display().to_string(),
        source(
            "catalogue.path",
            &["CARMATCH_CATALOGUE_PATH"],
            args.catalogue.as_ref().map(|_| "--catalogue"),
        ),
    ));
    lines.push(render_line(
        "catalogue.strict_enums",
        &config.catalogue.strict_enums.to_string(),
        source("catalogue.strict_enums", &["CARMATCH_CATALOGUE_STRICT_ENUMS"], None),
    ));
    lines.push(render_line(
        "similarity.top_k",
        &config.similarity.top_k.to_string(),
        source(
            "similarity.top_k",
            &["CARMATCH_SIMILARITY_TOP_K"],
            args.top_k.map(|_| "--top-k"),
        ),
    ));
    lines.push(render_line(
        "ranking.preference_formula",
        config.ranking.preference_formula.as_str(),
        source("ranking.preference_formula", &["CARMATCH_RANKING_PREFERENCE_FORMULA"], None),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["CARMATCH_LOGGING_LEVEL", "CARMATCH_LOG_LEVEL"], None),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        source("logging.format", &["CARMATCH_LOGGING_FORMAT", "CARMATCH_LOG_FORMAT"], None),
    ));

    CommandResult::text(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    flag: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = flag {
        return format!("flag ({flag})");
    }

    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc: Value = "[ranking]\npreference_formula = \"v2\"\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "ranking.preference_formula"));
        assert!(!contains_path(&doc, "ranking.top_k"));
        assert_eq!(
            field_source("ranking.preference_formula", &[], None, Some(&doc), None),
            "file (config file)"
        );
    }

    #[test]
    fn flags_win_over_every_other_source() {
        assert_eq!(
            field_source("catalogue.path", &[], Some("--catalogue"), None, None),
            "flag (--catalogue)"
        );
        assert_eq!(field_source("catalogue.path", &[], None, None, None), "default");
    }
}
