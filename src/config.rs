use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::CountryOrder;
use crate::report::OutputFormat;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub foodreport: FoodReportConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

/// Where [`Config::load_unvalidated`] found its values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Process-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct FoodReportConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for FoodReportConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            format: OutputFormat::default(),
        }
    }
}

/// Knowledge store (SPARQL endpoint) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// HTTP basic-auth user, for endpoints behind authentication
    #[serde(default)]
    pub username: Option<String>,
    /// Name of the environment variable holding the basic-auth password
    #[serde(default)]
    pub password_env: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            username: None,
            password_env: None,
        }
    }
}

/// What to report on and how to run the pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Local name of the recipe in the data namespace
    #[serde(default = "default_recipe")]
    pub recipe: String,
    /// Local name of the consuming country sourcing routes must ship to
    #[serde(default = "default_destination")]
    pub destination: String,
    /// Upper bound on concurrent per-ingredient sourcing queries
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Whole-run deadline; unset means no deadline
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default)]
    pub country_order: CountryOrder,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recipe: default_recipe(),
            destination: default_destination(),
            concurrency: default_concurrency(),
            deadline_secs: None,
            country_order: CountryOrder::default(),
        }
    }
}

/// Namespaces of the food-report ontology and its instance data
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default = "default_ontology_namespace")]
    pub ontology: String,
    #[serde(default = "default_data_namespace")]
    pub data: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            ontology: default_ontology_namespace(),
            data: default_data_namespace(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8080/fuseki/foodreport/sparql".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    2
}

fn default_recipe() -> String {
    "Spaghetti Bolognese".to_string()
}

fn default_destination() -> String {
    "Italy".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_ontology_namespace() -> String {
    "http://www.foodreport.be/ontology#".to_string()
}

fn default_data_namespace() -> String {
    "http://www.foodreport.be/data#".to_string()
}

impl Config {
    /// Load and validate configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. `explicit` (the `--config` flag)
    /// 2. Path specified in FOODREPORT_CONFIG environment variable
    /// 3. ./config.toml in current directory, falling back to defaults when absent
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, _) = Self::load_unvalidated(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Same lookup as [`Config::load`], without validation, so command-line
    /// overrides can be applied first. Also reports where the values came from.
    pub fn load_unvalidated(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let required = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("FOODREPORT_CONFIG").ok().map(PathBuf::from));

        match required {
            Some(path) => Ok((Self::from_file(&path)?, ConfigSource::File(path))),
            None => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Ok((Self::from_file(&path)?, ConfigSource::File(path)))
                } else {
                    Ok((Config::default(), ConfigSource::Defaults))
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.store.endpoint)
            .with_context(|| format!("store.endpoint is not a valid URL: {}", self.store.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            anyhow::bail!("store.endpoint must use http or https, got {}", endpoint.scheme());
        }

        if self.store.timeout_secs == 0 {
            anyhow::bail!("store.timeout_secs must be greater than 0");
        }

        if let Some(ref var) = self.store.password_env {
            std::env::var(var).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable with the store password.",
                    var
                )
            })?;
        }

        if self.report.recipe.trim().is_empty() {
            anyhow::bail!("report.recipe must not be empty");
        }

        if self.report.destination.trim().is_empty() {
            anyhow::bail!("report.destination must not be empty");
        }

        if self.report.concurrency == 0 {
            anyhow::bail!("report.concurrency must be greater than 0");
        }

        if self.report.deadline_secs == Some(0) {
            anyhow::bail!("report.deadline_secs must be greater than 0 when set");
        }

        for (name, namespace) in [
            ("vocabulary.ontology", &self.vocabulary.ontology),
            ("vocabulary.data", &self.vocabulary.data),
        ] {
            if !namespace.ends_with('#') && !namespace.ends_with('/') {
                anyhow::bail!("{} must end with '#' or '/': {}", name, namespace);
            }
        }

        Ok(())
    }

    /// Per-request store timeout
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Whole-run deadline, if configured
    pub fn deadline(&self) -> Option<Duration> {
        self.report.deadline_secs.map(Duration::from_secs)
    }

    /// Basic-auth credentials resolved from the environment
    pub fn store_credentials(&self) -> Option<(String, String)> {
        let username = self.store.username.clone()?;
        let password = self
            .store
            .password_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default();
        Some((username, password))
    }
}
