use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
    /// Emit the grouper's per-row debug events
    pub row_events: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of additional `<vendor>.yaml` rule files
    pub rules_dir: Option<String>,
    /// Overrides the header scan depth of every loaded rule set
    pub header_scan_rows: Option<usize>,
    pub max_concurrent_sheets: usize,
    pub default_vendor: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
            row_events: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_dir: None,
            header_scan_rows: None,
            max_concurrent_sheets: 4,
            default_vendor: "lenovo".to_string(),
        }
    }
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
            // LCM__ENGINE__RULES_DIR=... style overrides
            .add_source(Environment::with_prefix("LCM").separator("__"));

        config.build()?.try_deserialize()
    }
}
