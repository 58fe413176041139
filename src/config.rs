use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;

/// Application configuration, read once at startup from `config.toml` with
/// environment-variable overrides (the `.env` file is loaded in `main`).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// IANA timezone used by every time tool.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Bound on tool-execution batches per query; must be >= 1.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_timezone() -> String {
    "US/Eastern".to_string()
}

fn default_max_tool_iterations() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl AppConfig {
    /// Load from `path` when present, otherwise start from defaults; then
    /// apply environment overrides and validate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?
        } else {
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OPENAI_BASE_URL") {
            self.provider.base_url = v;
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.provider.api_key = v;
        }
        if let Ok(v) = std::env::var("OPENAI_MODEL") {
            self.provider.model = v;
        }
        if let Ok(v) = std::env::var("TIMEZONE") {
            self.pipeline.timezone = v;
        }
        if let Ok(v) = std::env::var("MAX_TOOL_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.pipeline.max_tool_iterations = n;
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.pipeline.max_tool_iterations < 1 {
            anyhow::bail!("max_tool_iterations must be >= 1");
        }
        self.timezone()?;
        Ok(())
    }

    /// The configured timezone, parsed.
    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.pipeline
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown timezone '{}'", self.pipeline.timezone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.timezone, "US/Eastern");
        assert_eq!(config.pipeline.max_tool_iterations, 10);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [provider]
            model = "gpt-4o-mini"

            [pipeline]
            timezone = "Europe/Berlin"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(config.pipeline.timezone, "Europe/Berlin");
        assert!(config.timezone().is_ok());
    }

    #[test]
    fn rejects_zero_iterations_and_bad_timezone() {
        let mut config = AppConfig::default();
        config.pipeline.max_tool_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }
}
