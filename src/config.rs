//! Plugin Configuration
//!
//! TigerStyle: One immutable struct, loaded once at startup, every field
//! defaulted so a partial (or missing) TOML file still yields a usable config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default NapCat rename endpoint
pub const RENAME_API_URL_DEFAULT: &str = "http://127.0.0.1:3000/set_group_name";

/// Default rename request timeout in seconds
pub const RENAME_API_TIMEOUT_SECS_DEFAULT: u64 = 5;

/// Environment variable overriding the rename endpoint
pub const RENAME_API_URL_ENV: &str = "RENAME_API_URL";

/// Success message templates shipped with the plugin
pub const TEMPLATES_DEFAULT: [&str; 5] = [
    "好的，已将群名修改为 {new_name}，理由：{reason}",
    "收到，将群名修改为 {new_name}，因为{reason}",
    "明白了，群名已改为 {new_name}，原因是{reason}",
    "已将群名修改为 {new_name}，理由：{reason}",
    "群名修改完成，新群名为 {new_name}，原因：{reason}",
];

/// Error message templates (advertised, not used by the pipeline)
pub const ERROR_MESSAGES_DEFAULT: [&str; 3] = [
    "没有指定新群名呢~",
    "群名太长啦，不能超过20个字符哦~",
    "修改群名时出现问题~",
];

// =============================================================================
// Types
// =============================================================================

/// Complete plugin configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub plugin: PluginSection,
    pub components: ComponentsConfig,
    pub permissions: PermissionsConfig,
    pub change_name: ChangeNameConfig,
    pub smart_change_name: SmartChangeNameConfig,
    pub change_name_command: ChangeNameCommandConfig,
    pub logging: LoggingConfig,
    pub rename_api: RenameApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSection {
    /// Whether the host should load the plugin at all
    pub enabled: bool,
    pub config_version: String,
}

impl Default for PluginSection {
    fn default() -> Self {
        Self {
            enabled: false,
            config_version: "0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentsConfig {
    /// Register the autonomous (LLM-judged) rename action
    pub enable_smart_change_name: bool,
    /// Register the `/change_group_name` command
    pub enable_change_name_command: bool,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            enable_smart_change_name: true,
            enable_change_name_command: false,
        }
    }
}

/// Allow-lists of `"platform:id"` keys. Empty means unrestricted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Users allowed to run the command
    pub allowed_users: Vec<String>,
    /// Groups in which the autonomous action may rename
    pub allowed_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeNameConfig {
    pub enable_message_formatting: bool,
    pub log_change_name_history: bool,
    /// Success message templates with `{new_name}` and `{reason}` placeholders
    pub templates: Vec<String>,
    pub error_messages: Vec<String>,
}

impl Default for ChangeNameConfig {
    fn default() -> Self {
        Self {
            enable_message_formatting: true,
            log_change_name_history: true,
            templates: TEMPLATES_DEFAULT.iter().map(|s| s.to_string()).collect(),
            error_messages: ERROR_MESSAGES_DEFAULT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Keyword activation sensitivity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSensitivity {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartChangeNameConfig {
    pub strict_mode: bool,
    pub keyword_sensitivity: KeywordSensitivity,
    pub allow_parallel: bool,
}

impl Default for SmartChangeNameConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            keyword_sensitivity: KeywordSensitivity::Normal,
            allow_parallel: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeNameCommandConfig {
    pub max_batch_size: u32,
    /// Advertised to the host; not enforced here
    pub cooldown_seconds: u64,
}

impl Default for ChangeNameCommandConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 5,
            cooldown_seconds: 3,
        }
    }
}

/// Log level names as written in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Attached to every invocation span
    pub prefix: String,
    pub include_user_info: bool,
    pub include_action_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            prefix: "[ChangeGroupNamePlugin]".to_string(),
            include_user_info: true,
            include_action_info: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameApiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for RenameApiConfig {
    fn default() -> Self {
        Self {
            url: RENAME_API_URL_DEFAULT.to_string(),
            timeout_secs: RENAME_API_TIMEOUT_SECS_DEFAULT,
        }
    }
}

impl RenameApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Loading
// =============================================================================

impl PluginConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file path. A missing file yields the defaults.
    ///
    /// Does not log. The config picks the log level, so callers report
    /// [`Self::unmatchable_permission_entries`] after the subscriber is up.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Allow-list entries without a `platform:` prefix. They can never match.
    pub fn unmatchable_permission_entries(&self) -> Vec<&str> {
        self.permissions
            .allowed_users
            .iter()
            .chain(self.permissions.allowed_groups.iter())
            .filter(|entry| !entry.contains(':'))
            .map(String::as_str)
            .collect()
    }

    /// Apply `RENAME_API_URL` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = std::env::var(RENAME_API_URL_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            tracing::debug!(url = %url, "Rename API URL overridden from environment");
            self.rename_api.url = url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.change_name.templates.is_empty() {
            return Err(ConfigError::NoTemplates);
        }
        if self.rename_api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "rename_api.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("change_name.templates must contain at least one template")]
    NoTemplates,

    #[error("invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Tests
// =============================================================================
