use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub testing: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            testing: false,
        }
    }
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_words: default_max_words(),
        }
    }
}

fn default_provider() -> String {
    "mock".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}
fn default_max_words() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            job_timeout_secs: default_job_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}
fn default_job_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    2
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Deployment platforms commonly inject settings through the environment,
/// so a handful of keys can override the file after parsing.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(env) = std::env::var("PAGESUM_ENVIRONMENT") {
        config.app.environment = env;
    }
    if let Ok(testing) = std::env::var("PAGESUM_TESTING") {
        config.app.testing = matches!(testing.as_str(), "1" | "true" | "yes");
    }
    if let Ok(path) = std::env::var("PAGESUM_DB_PATH") {
        config.db.path = PathBuf::from(path);
    }
    if let Ok(provider) = std::env::var("PAGESUM_SUMMARIZER_PROVIDER") {
        config.summarizer.provider = provider;
    }
}

fn validate(config: &Config) -> Result<()> {
    match config.summarizer.provider.as_str() {
        "mock" | "live" => {}
        other => anyhow::bail!(
            "Unknown summarizer provider: '{}'. Must be mock or live.",
            other
        ),
    }

    if config.summarizer.provider == "live" && config.summarizer.model.is_none() {
        anyhow::bail!("summarizer.model must be specified when provider is 'live'");
    }

    if config.summarizer.timeout_secs == 0 {
        anyhow::bail!("summarizer.timeout_secs must be > 0");
    }

    if config.worker.queue_capacity == 0 {
        anyhow::bail!("worker.queue_capacity must be > 0");
    }

    if config.worker.max_attempts == 0 {
        anyhow::bail!("worker.max_attempts must be >= 1");
    }

    if config.worker.job_timeout_secs == 0 {
        anyhow::bail!("worker.job_timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Config {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(
            r#"
[db]
path = "./data/pagesum.sqlite"

[server]
bind = "127.0.0.1:7431"
"#,
        );

        assert_eq!(config.app.environment, "dev");
        assert!(!config.app.testing);
        assert_eq!(config.summarizer.provider, "mock");
        assert_eq!(config.summarizer.timeout_secs, 30);
        assert_eq!(config.worker.queue_capacity, 256);
        assert_eq!(config.worker.max_attempts, 2);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = parse(
            r#"
[db]
path = "x.sqlite"

[server]
bind = "127.0.0.1:0"

[summarizer]
provider = "anthropic"
"#,
        );

        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("Unknown summarizer provider"));
    }

    #[test]
    fn test_live_provider_requires_model() {
        let config = parse(
            r#"
[db]
path = "x.sqlite"

[server]
bind = "127.0.0.1:0"

[summarizer]
provider = "live"
"#,
        );

        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("summarizer.model"));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = parse(
            r#"
[app]
environment = "dev"

[db]
path = "x.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        );

        std::env::set_var("PAGESUM_ENVIRONMENT", "prod");
        std::env::set_var("PAGESUM_TESTING", "true");
        apply_env_overrides(&mut config);
        std::env::remove_var("PAGESUM_ENVIRONMENT");
        std::env::remove_var("PAGESUM_TESTING");

        assert_eq!(config.app.environment, "prod");
        assert!(config.app.testing);
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let config = parse(
            r#"
[db]
path = "x.sqlite"

[server]
bind = "127.0.0.1:0"

[worker]
queue_capacity = 0
"#,
        );

        assert!(validate(&config).is_err());
    }
}
