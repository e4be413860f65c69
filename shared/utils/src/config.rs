use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

use crate::psl::DEFAULT_MAX_QUANTITY;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Name of the format variant used when none is given explicitly
    pub variant: String,
    /// Directory of additional YAML variant definitions
    pub variants_dir: Option<String>,
    pub skip_blank_rows: bool,
    /// Largest quantity a single row may expand into
    pub max_quantity: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Environment variables with PSL prefix, e.g. PSL__PARSER__VARIANT
            .add_source(Environment::with_prefix("PSL").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            variant: "generic".to_string(),
            variants_dir: None,
            skip_blank_rows: true,
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }
}
