//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use needle_domain::{RecordSchema, SchemaRegistry};
use needle_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model provider
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Extra schemas on top of the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<RecordSchema>,
}

/// Which backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Provider connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Backend kind
    pub kind: ProviderKind,

    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model for extraction calls
    pub model: String,

    /// Model for verification calls (extraction model when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_model: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV file
    Csv,
    /// JSON file
    Json,
    /// CSV file plus a table on stdout
    Table,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".needle").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `~/.needle/config.toml` is
    /// used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| {
            CliError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Check the pipeline settings.
    pub fn validate(&self) -> Result<()> {
        self.extractor.validate().map_err(CliError::Config)?;
        if self.provider.model.trim().is_empty() {
            return Err(CliError::Config("provider.model must not be empty".into()));
        }
        Ok(())
    }

    /// Built-in schemas plus the ones declared here.
    pub fn registry(&self) -> SchemaRegistry {
        let mut registry = SchemaRegistry::with_builtins();
        for schema in &self.schemas {
            registry.register(schema.clone());
        }
        registry
    }

    /// Switch provider, resetting provider settings to that kind's defaults.
    pub fn use_provider(&mut self, kind: ProviderKind) {
        if self.provider.kind != kind {
            self.provider = ProviderSettings::for_kind(kind);
        }
    }

    /// Pipeline settings with provider models filled in.
    pub fn extractor_config(&self) -> ExtractorConfig {
        let mut config = self.extractor.clone();
        let gateway = &mut config.gateway;
        if gateway.extraction_model.is_none() {
            gateway.extraction_model = Some(self.provider.model.clone());
        }
        if gateway.verification_model.is_none() {
            gateway.verification_model = self.provider.verification_model.clone();
        }
        config
    }
}

impl ProviderSettings {
    /// Defaults for a provider kind.
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAi => Self {
                kind,
                endpoint: None,
                model: "gpt-4o-2024-08-06".to_string(),
                verification_model: Some("gpt-4o-mini".to_string()),
                api_key_env: default_api_key_env(),
            },
            ProviderKind::Ollama => Self {
                kind,
                endpoint: None,
                model: "llama3.1".to_string(),
                verification_model: None,
                api_key_env: default_api_key_env(),
            },
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::for_kind(ProviderKind::OpenAi)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Csv,
        }
    }
}

fn default_api_key_env() -> String {
    needle_llm::openai::DEFAULT_API_KEY_ENV.to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Csv
}
