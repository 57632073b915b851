//! Configuration loading, validation, and management for agentloop.
//!
//! Loads configuration from `~/.agentloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use agentloop_core::agent::{DEFAULT_MAX_ITERATIONS, EarlyStopping, RunConfig, ToolErrorPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.agentloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion; computed from the prompt when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Execution loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Memory settings
    #[serde(default)]
    pub memory: MemoryConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("memory", &self.memory)
            .finish()
    }
}

/// Which agent policy drives the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Single search tool, "Follow up:" / "So the final answer is:" markers
    #[default]
    SelfAskWithSearch,
    /// Any number of tools, "Action:" / "Final Answer:" markers
    ZeroShotReact,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfAskWithSearch => "self-ask-with-search",
            Self::ZeroShotReact => "zero-shot-react",
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self-ask-with-search" | "self-ask" => Ok(Self::SelfAskWithSearch),
            "zero-shot-react" | "react" => Ok(Self::ZeroShotReact),
            other => Err(ConfigError::ValidationError(format!(
                "unknown policy '{other}' (expected self-ask-with-search or zero-shot-react)"
            ))),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub policy: PolicyKind,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget per run in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_secs: Option<u64>,

    #[serde(default)]
    pub early_stopping: EarlyStopping,

    #[serde(default = "default_max_fixups")]
    pub max_fixups: u32,

    #[serde(default)]
    pub tool_errors: ToolErrorPolicy,

    /// Tools whose failures abort the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fatal_tools: Vec<String>,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_max_fixups() -> u32 {
    1
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            max_iterations: default_max_iterations(),
            max_execution_secs: None,
            early_stopping: EarlyStopping::default(),
            max_fixups: default_max_fixups(),
            tool_errors: ToolErrorPolicy::default(),
            fatal_tools: vec![],
        }
    }
}

impl AgentConfig {
    /// Convert into the loop's per-run configuration.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_iterations: self.max_iterations,
            max_execution_time: self.max_execution_secs.map(Duration::from_secs),
            early_stopping: self.early_stopping,
            max_fixups: self.max_fixups,
            tool_errors: self.tool_errors,
            fatal_tools: self.fatal_tools.clone(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// SerpAPI key for the search tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serpapi_api_key: Option<String>,

    /// Root directory for read_file / write_file
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Tools enabled for the zero-shot policy
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,
}

fn default_workspace_dir() -> PathBuf {
    AppConfig::workspace_dir()
}
fn default_enabled_tools() -> Vec<String> {
    vec!["search".into(), "read_file".into(), "write_file".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            serpapi_api_key: None,
            workspace_dir: default_workspace_dir(),
            enabled: default_enabled_tools(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("serpapi_api_key", &redact(&self.serpapi_api_key))
            .field("workspace_dir", &self.workspace_dir)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Keep entity summaries between questions in interactive mode
    #[serde(default = "default_true")]
    pub entities: bool,

    /// Number of recent exchanges shown to the entity extractor
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_history_turns() -> usize {
    3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            entities: true,
            history_turns: default_history_turns(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.agentloop/config.toml).
    ///
    /// Environment overrides:
    /// - `AGENTLOOP_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `AGENTLOOP_MODEL`, `AGENTLOOP_BASE_URL`
    /// - `SERPAPI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("AGENTLOOP_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(model) = lookup("AGENTLOOP_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("AGENTLOOP_BASE_URL") {
            self.base_url = url;
        }
        if self.tools.serpapi_api_key.is_none() {
            self.tools.serpapi_api_key = lookup("SERPAPI_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentloop")
    }

    /// Get the workspace directory path.
    pub fn workspace_dir() -> PathBuf {
        Self::config_dir().join("workspace")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.max_execution_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "agent.max_execution_secs must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
