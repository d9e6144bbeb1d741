//! Configuration management for the Helpdesk Assistant.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.helpdesk/config.yaml)
//!
//! String values in the config file may reference environment variables with
//! `${VAR_NAME}` or `${VAR_NAME:default}` syntax; references are expanded at
//! load time so secrets never have to live in the file itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .helpdesk/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider (e.g., "ollama", "claude", "openai")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Chat pipeline configuration
    pub chat: ChatConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

/// Configuration for the chat pipeline: classification, memory, retrieval,
/// SQL guarding, and collaborator timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Keywords that mark a question as a user-guide question
    #[serde(rename = "userGuideKeywords")]
    pub user_guide_keywords: Vec<String>,

    /// Keywords that mark a question as a contract question
    #[serde(rename = "contractKeywords")]
    pub contract_keywords: Vec<String>,

    /// Phrases recognized as greetings or small talk
    #[serde(rename = "greetingPatterns")]
    pub greeting_patterns: Vec<String>,

    /// How many past turns are rendered into the prompt
    #[serde(rename = "memoryWindow")]
    pub memory_window: usize,

    /// Maximum turns kept per session before FIFO eviction
    #[serde(rename = "memoryMaxTurns")]
    pub memory_max_turns: usize,

    /// Number of guide passages retrieved per question
    #[serde(rename = "retrievalTopK")]
    pub retrieval_top_k: usize,

    /// Upper bound for any single collaborator call, in seconds
    #[serde(rename = "collaboratorTimeoutSecs")]
    pub collaborator_timeout_secs: u64,

    /// System instructions prepended to every generated prompt
    #[serde(rename = "systemPrompt")]
    pub system_prompt: String,

    /// Directory containing user guide documents
    #[serde(rename = "guidesPath")]
    pub guides_path: PathBuf,

    /// Connection URL for the contracts database
    #[serde(rename = "databaseUrl")]
    pub database_url: String,

    /// Human-readable schema description given to the SQL generator
    #[serde(rename = "schemaDescription")]
    pub schema_description: String,

    /// SQL safety validator settings
    #[serde(rename = "sqlGuard", default)]
    pub sql_guard: SqlGuardConfig,
}

/// Settings for the SQL safety validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlGuardConfig {
    /// Keywords rejected anywhere in a statement, as standalone tokens
    #[serde(rename = "blockedKeywords")]
    pub blocked_keywords: Vec<String>,

    /// Schemas whose catalog tables may be referenced
    #[serde(rename = "allowedSchemas")]
    pub allowed_schemas: Vec<String>,

    /// Maximum accepted statement length in bytes
    #[serde(rename = "maxStatementLength")]
    pub max_statement_length: usize,
}

impl Default for SqlGuardConfig {
    fn default() -> Self {
        Self {
            blocked_keywords: [
                "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT",
                "EXEC",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_schemas: Vec::new(),
            max_statement_length: 2000,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            user_guide_keywords: [
                "how to", "how do", "guide", "tutorial", "instructions", "setup", "install",
                "configure", "export", "feature",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            contract_keywords: [
                "contract", "expire", "expiration", "renewal", "renew", "pricing", "cost",
                "invoice", "module", "purchased", "license",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            greeting_patterns: [
                "hello",
                "hi",
                "hey",
                "good morning",
                "good afternoon",
                "thanks",
                "thank you",
                "help",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            memory_window: 5,
            memory_max_turns: 10,
            retrieval_top_k: 3,
            collaborator_timeout_secs: 30,
            system_prompt: "You are a helpful customer service assistant for a software \
                            product. Answer clearly and courteously, and say so when you do \
                            not know the answer."
                .to_string(),
            guides_path: PathBuf::from("./data/user_guides"),
            database_url: "sqlite://contracts.db".to_string(),
            schema_description: "TABLE contracts (contract_id, customer_name, start_date, \
                                 expiration_date, pricing, status)\n\
                                 TABLE modules (module_id, module_name, description)\n\
                                 TABLE contract_modules (contract_id, module_id, purchased_date)"
                .to_string(),
            sql_guard: SqlGuardConfig::default(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    chat: Option<ChatConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `HELPDESK_WORKSPACE`: Override workspace path
    /// - `HELPDESK_CONFIG`: Path to config file
    /// - `HELPDESK_PROVIDER`: LLM provider
    /// - `HELPDESK_MODEL`: Model identifier
    /// - `HELPDESK_API_KEY`: API key
    /// - `HELPDESK_DATABASE_URL`: Contracts database URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        // Load from environment variables
        if let Ok(workspace) = std::env::var("HELPDESK_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("HELPDESK_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Validate workspace exists
        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".helpdesk/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("HELPDESK_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("HELPDESK_MODEL") {
            config.model = model;
        }

        if let Ok(db_url) = std::env::var("HELPDESK_DATABASE_URL") {
            config.chat.database_url = db_url;
        }

        config.api_key = std::env::var("HELPDESK_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    ///
    /// `${VAR}` and `${VAR:default}` references in string values are expanded
    /// against the process environment before deserialization.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let raw: serde_yaml::Value = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let expanded = substitute_env_vars(raw);

        let config_file: ConfigFile = serde_yaml::from_value(expanded).map_err(|e| {
            AppError::Config(format!("Invalid config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        // Merge workspace settings
        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        // Merge logging settings
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        // Merge LLM settings
        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = match provider_config {
                    ProviderConfig::OpenAI { model, .. } => model.clone(),
                    ProviderConfig::Claude { model, .. } => model.clone(),
                    ProviderConfig::Ollama { model, .. } => model.clone(),
                };
            }

            result.llm = Some(llm);
        }

        // Chat settings replace the defaults wholesale
        if let Some(chat) = config_file.chat {
            result.chat = chat;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .helpdesk directory.
    pub fn helpdesk_dir(&self) -> PathBuf {
        self.workspace.join(".helpdesk")
    }

    /// Get the active provider configuration.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Check explicit HELPDESK_API_KEY first
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        // Try provider-specific config
        if let Some(provider_config) = self.get_provider_config(provider) {
            let env_var = match provider_config {
                ProviderConfig::OpenAI { api_key_env, .. } => Some(api_key_env),
                ProviderConfig::Claude { api_key_env, .. } => Some(api_key_env),
                ProviderConfig::Ollama { .. } => None,
            };

            if let Some(env_var) = env_var {
                if let Ok(key) = std::env::var(&env_var) {
                    return Some(key);
                }
            }
        }

        None
    }

    /// Validate configuration for the active provider and chat pipeline.
    ///
    /// Invalid configuration is fatal at startup; nothing in the request path
    /// re-validates these values.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;
        let known_providers = ["ollama", "claude", "openai"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if let Some(provider_config) = self.get_provider_config(provider) {
            match provider_config {
                ProviderConfig::OpenAI { api_key_env, .. }
                | ProviderConfig::Claude { api_key_env, .. } => {
                    if self.api_key.is_none() && std::env::var(&api_key_env).is_err() {
                        return Err(AppError::Config(format!(
                            "API key not found in environment variable: {}",
                            api_key_env
                        )));
                    }
                }
                ProviderConfig::Ollama { .. } => {
                    // Ollama doesn't require API keys
                }
            }
        }

        let chat = &self.chat;
        if chat.memory_max_turns == 0 {
            return Err(AppError::Config(
                "memoryMaxTurns must be at least 1".to_string(),
            ));
        }
        if chat.memory_window > chat.memory_max_turns {
            return Err(AppError::Config(format!(
                "memoryWindow ({}) cannot exceed memoryMaxTurns ({})",
                chat.memory_window, chat.memory_max_turns
            )));
        }
        if chat.retrieval_top_k == 0 {
            return Err(AppError::Config(
                "retrievalTopK must be at least 1".to_string(),
            ));
        }
        if chat.collaborator_timeout_secs == 0 {
            return Err(AppError::Config(
                "collaboratorTimeoutSecs must be at least 1".to_string(),
            ));
        }
        if chat.sql_guard.max_statement_length == 0 {
            return Err(AppError::Config(
                "sqlGuard.maxStatementLength must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Recursively expand `${VAR}` / `${VAR:default}` references in string values.
fn substitute_env_vars(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Mapping(map) => serde_yaml::Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, substitute_env_vars(v)))
                .collect(),
        ),
        serde_yaml::Value::Sequence(seq) => {
            serde_yaml::Value::Sequence(seq.into_iter().map(substitute_env_vars).collect())
        }
        serde_yaml::Value::String(s) => serde_yaml::Value::String(substitute_string(&s)),
        other => other,
    }
}

/// Expand environment references in a single string.
fn substitute_string(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) => {
                let inner = &after[..end];
                let (name, default) = match inner.split_once(':') {
                    Some((name, default)) => (name, default),
                    None => (inner, ""),
                };
                match std::env::var(name) {
                    Ok(v) => result.push_str(&v),
                    Err(_) => result.push_str(default),
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated reference, keep it verbatim
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert_eq!(config.chat.retrieval_top_k, 3);
        assert_eq!(config.chat.memory_max_turns, 10);
    }

    #[test]
    fn test_helpdesk_dir() {
        let config = AppConfig::default();
        let dir = config.helpdesk_dir();
        assert!(dir.ends_with(".helpdesk"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("claude".to_string()),
            Some("claude-sonnet-4-20250514".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "claude");
        assert_eq!(overridden.model, "claude-sonnet-4-20250514");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_window_exceeds_max_turns() {
        let mut config = AppConfig::default();
        config.chat.memory_window = 20;
        config.chat.memory_max_turns = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_substitute_string_plain() {
        assert_eq!(substitute_string("no refs here"), "no refs here");
    }

    #[test]
    fn test_substitute_string_with_default() {
        assert_eq!(
            substitute_string("host=${HELPDESK_TEST_UNSET_VAR:localhost}"),
            "host=localhost"
        );
    }

    #[test]
    fn test_substitute_string_from_env() {
        std::env::set_var("HELPDESK_TEST_SET_VAR", "db.internal");
        assert_eq!(
            substitute_string("host=${HELPDESK_TEST_SET_VAR:localhost}"),
            "host=db.internal"
        );
        std::env::remove_var("HELPDESK_TEST_SET_VAR");
    }

    #[test]
    fn test_substitute_string_unterminated() {
        assert_eq!(substitute_string("broken ${REF"), "broken ${REF");
    }

    #[test]
    fn test_merge_yaml_chat_section() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
chat:
  userGuideKeywords: ["how to"]
  contractKeywords: ["contract"]
  greetingPatterns: ["hello"]
  memoryWindow: 2
  memoryMaxTurns: 4
  retrievalTopK: 5
  collaboratorTimeoutSecs: 10
  systemPrompt: "Be brief."
  guidesPath: "./guides"
  databaseUrl: "sqlite://test.db"
  schemaDescription: "TABLE contracts (contract_id)"
"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        let merged = config.merge_yaml(&path).unwrap();
        assert_eq!(merged.chat.retrieval_top_k, 5);
        assert_eq!(merged.chat.memory_window, 2);
        assert_eq!(merged.chat.system_prompt, "Be brief.");
    }
}
