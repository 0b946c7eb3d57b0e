use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalogue::CatalogueOptions;
use crate::ranking::PreferenceFormula;
use crate::recommender::RecommenderOptions;
use crate::similarity::DEFAULT_TOP_K;

pub const DEFAULT_CONFIG_FILE: &str = "carmatch.toml";
pub const NESTED_CONFIG_FILE: &str = "config/carmatch.toml";
pub const MAX_TOP_K: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub catalogue: CatalogueConfig,
    pub similarity: SimilarityConfig,
    pub ranking: RankingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogueConfig {
    pub path: PathBuf,
    pub strict_enums: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarityConfig {
    pub top_k: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankingConfig {
    pub preference_formula: PreferenceFormula,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalogue_path: Option<PathBuf>,
    pub strict_enums: Option<bool>,
    pub top_k: Option<usize>,
    pub preference_formula: Option<PreferenceFormula>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalogue: CatalogueConfig {
                path: PathBuf::from("car_data_set.csv"),
                strict_enums: false,
            },
            similarity: SimilarityConfig { top_k: DEFAULT_TOP_K },
            ranking: RankingConfig { preference_formula: PreferenceFormula::V1 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn catalogue_options(&self) -> CatalogueOptions {
        CatalogueOptions { strict_enums: self.catalogue.strict_enums }
    }

    pub fn recommender_options(&self) -> RecommenderOptions {
        RecommenderOptions {
            top_k: self.similarity.top_k,
            preference_formula: self.ranking.preference_formula,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalogue) = patch.catalogue {
            if let Some(path) = catalogue.path {
                self.catalogue.path = path;
            }
            if let Some(strict_enums) = catalogue.strict_enums {
                self.catalogue.strict_enums = strict_enums;
            }
        }

        if let Some(similarity) = patch.similarity {
            if let Some(top_k) = similarity.top_k {
                self.similarity.top_k = top_k;
            }
        }

        if let Some(ranking) = patch.ranking {
            if let Some(preference_formula) = ranking.preference_formula {
                self.ranking.preference_formula = preference_formula;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARMATCH_CATALOGUE_PATH") {
            self.catalogue.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("CARMATCH_CATALOGUE_STRICT_ENUMS") {
            self.catalogue.strict_enums = parse_bool("CARMATCH_CATALOGUE_STRICT_ENUMS", &value)?;
        }

        if let Some(value) = read_env("CARMATCH_SIMILARITY_TOP_K") {
            self.similarity.top_k = parse_usize("CARMATCH_SIMILARITY_TOP_K", &value)?;
        }

        if let Some(value) = read_env("CARMATCH_RANKING_PREFERENCE_FORMULA") {
            self.ranking.preference_formula = value.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "CARMATCH_RANKING_PREFERENCE_FORMULA".to_string(),
                    value: value.clone(),
                }
            })?;
        }

        let log_level =
            read_env("CARMATCH_LOGGING_LEVEL").or_else(|| read_env("CARMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARMATCH_LOGGING_FORMAT").or_else(|| read_env("CARMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.catalogue_path {
            self.catalogue.path = path;
        }
        if let Some(strict_enums) = overrides.strict_enums {
            self.catalogue.strict_enums = strict_enums;
        }
        if let Some(top_k) = overrides.top_k {
            self.similarity.top_k = top_k;
        }
        if let Some(preference_formula) = overrides.preference_formula {
            self.ranking.preference_formula = preference_formula;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalogue(&self.catalogue)?;
        validate_similarity(&self.similarity)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalogue(catalogue: &CatalogueConfig) -> Result<(), ConfigError> {
    if catalogue.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalogue.path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_similarity(similarity: &SimilarityConfig) -> Result<(), ConfigError> {
    if similarity.top_k == 0 || similarity.top_k > MAX_TOP_K {
        return Err(ConfigError::Validation(format!(
            "similarity.top_k must be in range 1..={MAX_TOP_K}"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    catalogue: Option<CataloguePatch>,
    similarity: Option<SimilarityPatch>,
    ranking: Option<RankingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CataloguePatch {
    path: Option<PathBuf>,
    strict_enums: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SimilarityPatch {
    top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    preference_formula: Option<PreferenceFormula>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
