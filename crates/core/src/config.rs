use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub support: SupportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct SupportConfig {
    pub enrich_with_model: bool,
    pub event_log_path: PathBuf,
    pub persist_policy: PersistPolicy,
    pub persist_timeout_ms: u64,
    pub knowledge_base_path: Option<PathBuf>,
    pub profiles_path: Option<PathBuf>,
    pub history_limit: u32,
    pub session_capacity: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Which decisions produce a persisted ticket record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    Escalated,
    All,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub enrich_with_model: Option<bool>,
    pub event_log_path: Option<PathBuf>,
    pub persist_policy: Option<PersistPolicy>,
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
            database: DatabaseConfig {
                url: "sqlite://fusion.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 5,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            support: SupportConfig {
                enrich_with_model: false,
                event_log_path: PathBuf::from("agent_logs.jsonl"),
                persist_policy: PersistPolicy::Escalated,
                persist_timeout_ms: 3_000,
                knowledge_base_path: None,
                profiles_path: None,
                history_limit: 10,
                session_capacity: 1_024,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama|disabled)"
            ))),
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

impl std::str::FromStr for PersistPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "escalated" => Ok(Self::Escalated),
            "all" => Ok(Self::All),
            other => Err(ConfigError::Validation(format!(
                "unsupported persist policy `{other}` (expected escalated|all)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Disabled => "disabled",
        }
    }
}

impl PersistPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Escalated => "escalated",
            Self::All => "all",
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fusion.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(support) = patch.support {
            if let Some(enrich_with_model) = support.enrich_with_model {
                self.support.enrich_with_model = enrich_with_model;
            }
            if let Some(event_log_path) = support.event_log_path {
                self.support.event_log_path = event_log_path;
            }
            if let Some(persist_policy) = support.persist_policy {
                self.support.persist_policy = persist_policy;
            }
            if let Some(persist_timeout_ms) = support.persist_timeout_ms {
                self.support.persist_timeout_ms = persist_timeout_ms;
            }
            if let Some(knowledge_base_path) = support.knowledge_base_path {
                self.support.knowledge_base_path = Some(knowledge_base_path);
            }
            if let Some(profiles_path) = support.profiles_path {
                self.support.profiles_path = Some(profiles_path);
            }
            if let Some(history_limit) = support.history_limit {
                self.support.history_limit = history_limit;
            }
            if let Some(session_capacity) = support.session_capacity {
                self.support.session_capacity = session_capacity;
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
        if let Some(value) = read_env("FUSION_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("FUSION_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("FUSION_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("FUSION_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("FUSION_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FUSION_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("FUSION_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FUSION_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("FUSION_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("FUSION_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("FUSION_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FUSION_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FUSION_SERVER_PORT") {
            self.server.port = parse_u16("FUSION_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("FUSION_SUPPORT_ENRICH_WITH_MODEL") {
            self.support.enrich_with_model = parse_bool("FUSION_SUPPORT_ENRICH_WITH_MODEL", &value)?;
        }
        if let Some(value) = read_env("FUSION_SUPPORT_EVENT_LOG_PATH") {
            self.support.event_log_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("FUSION_SUPPORT_PERSIST_POLICY") {
            self.support.persist_policy = value.parse()?;
        }
        if let Some(value) = read_env("FUSION_SUPPORT_PERSIST_TIMEOUT_MS") {
            self.support.persist_timeout_ms =
                parse_u64("FUSION_SUPPORT_PERSIST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("FUSION_SUPPORT_KNOWLEDGE_BASE_PATH") {
            self.support.knowledge_base_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("FUSION_SUPPORT_PROFILES_PATH") {
            self.support.profiles_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("FUSION_SUPPORT_HISTORY_LIMIT") {
            self.support.history_limit = parse_u32("FUSION_SUPPORT_HISTORY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("FUSION_SUPPORT_SESSION_CAPACITY") {
            self.support.session_capacity =
                parse_u32("FUSION_SUPPORT_SESSION_CAPACITY", &value)?;
        }

        let log_level = read_env("FUSION_LOGGING_LEVEL").or_else(|| read_env("FUSION_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FUSION_LOGGING_FORMAT").or_else(|| read_env("FUSION_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(enrich_with_model) = overrides.enrich_with_model {
            self.support.enrich_with_model = enrich_with_model;
        }
        if let Some(event_log_path) = overrides.event_log_path {
            self.support.event_log_path = event_log_path;
        }
        if let Some(persist_policy) = overrides.persist_policy {
            self.support.persist_policy = persist_policy;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm, self.support.enrich_with_model)?;
        validate_server(&self.server)?;
        validate_support(&self.support)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fusion.toml"), PathBuf::from("config/fusion.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig, enrichment_enabled: bool) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 60 {
        return Err(ConfigError::Validation("llm.timeout_secs must be in range 1..=60".to_string()));
    }

    // Credentials only matter when the model is actually called.
    if !enrichment_enabled {
        return Ok(());
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider when support.enrich_with_model is true"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::Disabled => {
            return Err(ConfigError::Validation(
                "support.enrich_with_model requires llm.provider other than disabled".to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    Ok(())
}

fn validate_support(support: &SupportConfig) -> Result<(), ConfigError> {
    if support.persist_timeout_ms == 0 || support.persist_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "support.persist_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }
    if support.history_limit == 0 {
        return Err(ConfigError::Validation(
            "support.history_limit must be greater than zero".to_string(),
        ));
    }
    if support.session_capacity == 0 {
        return Err(ConfigError::Validation(
            "support.session_capacity must be greater than zero".to_string(),
        ));
    }
    if support.event_log_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "support.event_log_path must not be empty".to_string(),
        ));
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

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().to_ascii_lowercase().parse::<bool>().map_err(|_| {
        ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    support: Option<SupportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct SupportPatch {
    enrich_with_model: Option<bool>,
    event_log_path: Option<PathBuf>,
    persist_policy: Option<PersistPolicy>,
    persist_timeout_ms: Option<u64>,
    knowledge_base_path: Option<PathBuf>,
    profiles_path: Option<PathBuf>,
    history_limit: Option<u32>,
    session_capacity: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, PersistPolicy};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.support.enrich_with_model, "model enrichment should be off by default")?;
        ensure(
            config.support.persist_policy == PersistPolicy::Escalated,
            "only escalations should be persisted by default",
        )?;
        ensure(config.support.persist_timeout_ms == 3_000, "persist timeout should be 3s")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FUSION_LLM_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fusion.toml");
            fs::write(
                &path,
                r#"
[llm]
provider = "open_ai"
api_key = "${TEST_FUSION_LLM_KEY}"
base_url = "https://api.openai.com/v1"

[support]
enrich_with_model = true
persist_policy = "all"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(config.support.enrich_with_model, "enrichment should be enabled from file")?;
            ensure(config.support.persist_policy == PersistPolicy::All, "policy from file")
        })();

        clear_vars(&["TEST_FUSION_LLM_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FUSION_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("FUSION_SUPPORT_EVENT_LOG_PATH", "env_events.jsonl");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fusion.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[support]
event_log_path = "file_events.jsonl"
history_limit = 25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.support.event_log_path == PathBuf::from("env_events.jsonl"),
                "env event log path should win over file",
            )?;
            ensure(config.support.history_limit == 25, "file history limit should apply")
        })();

        clear_vars(&["FUSION_DATABASE_URL", "FUSION_SUPPORT_EVENT_LOG_PATH"]);
        result
    }

    #[test]
    fn enrichment_with_openai_requires_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FUSION_LLM_PROVIDER", "openai");
        env::set_var("FUSION_SUPPORT_ENRICH_WITH_MODEL", "true");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["FUSION_LLM_PROVIDER", "FUSION_SUPPORT_ENRICH_WITH_MODEL"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FUSION_SUPPORT_PERSIST_TIMEOUT_MS", "soon");

        let result = (|| -> Result<(), String> {
            let is_invalid_override = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "FUSION_SUPPORT_PERSIST_TIMEOUT_MS"
            );
            ensure(is_invalid_override, "non-numeric timeout should be rejected")
        })();

        clear_vars(&["FUSION_SUPPORT_PERSIST_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn zero_session_capacity_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FUSION_SUPPORT_SESSION_CAPACITY", "0");

        let result = (|| -> Result<(), String> {
            let rejected = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::Validation(ref message)) if message.contains("session_capacity")
            );
            ensure(rejected, "zero session capacity should fail validation")
        })();

        clear_vars(&["FUSION_SUPPORT_SESSION_CAPACITY"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FUSION_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars(&["FUSION_LLM_API_KEY"]);
        result
    }
}
