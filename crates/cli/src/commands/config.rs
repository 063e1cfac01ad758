use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fusion_core::config::AppConfig;
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::support::load_config;

pub fn run() -> String {
    let config = match load_config() {
        Ok(config) => config,
        Err((_, message, _)) => return format!("config validation failed: {message}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

type ConfigEntry = (&'static str, String, &'static [&'static str]);

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigEntry {
    (key, value, env_keys)
}

fn effective_values(config: &AppConfig) -> Vec<ConfigEntry> {
    let optional_path = |path: Option<&PathBuf>| {
        path.map(|path| path.display().to_string()).unwrap_or_else(|| "<built-in>".to_string())
    };

    vec![
        entry("database.url", config.database.url.clone(), &["FUSION_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["FUSION_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["FUSION_DATABASE_TIMEOUT_SECS"],
        ),
        entry("llm.provider", config.llm.provider.as_str().to_string(), &["FUSION_LLM_PROVIDER"]),
        entry("llm.model", config.llm.model.clone(), &["FUSION_LLM_MODEL"]),
        entry(
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["FUSION_LLM_BASE_URL"],
        ),
        entry(
            "llm.api_key",
            redact_key(config.llm.api_key.as_ref().map(|key| key.expose_secret())),
            &["FUSION_LLM_API_KEY"],
        ),
        entry(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["FUSION_LLM_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["FUSION_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["FUSION_SERVER_PORT"]),
        entry(
            "support.enrich_with_model",
            config.support.enrich_with_model.to_string(),
            &["FUSION_SUPPORT_ENRICH_WITH_MODEL"],
        ),
        entry(
            "support.event_log_path",
            config.support.event_log_path.display().to_string(),
            &["FUSION_SUPPORT_EVENT_LOG_PATH"],
        ),
        entry(
            "support.persist_policy",
            config.support.persist_policy.as_str().to_string(),
            &["FUSION_SUPPORT_PERSIST_POLICY"],
        ),
        entry(
            "support.persist_timeout_ms",
            config.support.persist_timeout_ms.to_string(),
            &["FUSION_SUPPORT_PERSIST_TIMEOUT_MS"],
        ),
        entry(
            "support.knowledge_base_path",
            optional_path(config.support.knowledge_base_path.as_ref()),
            &["FUSION_SUPPORT_KNOWLEDGE_BASE_PATH"],
        ),
        entry(
            "support.profiles_path",
            optional_path(config.support.profiles_path.as_ref()),
            &["FUSION_SUPPORT_PROFILES_PATH"],
        ),
        entry(
            "support.history_limit",
            config.support.history_limit.to_string(),
            &["FUSION_SUPPORT_HISTORY_LIMIT"],
        ),
        entry(
            "support.session_capacity",
            config.support.session_capacity.to_string(),
            &["FUSION_SUPPORT_SESSION_CAPACITY"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["FUSION_LOGGING_LEVEL", "FUSION_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["FUSION_LOGGING_FORMAT", "FUSION_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["fusion.toml", "config/fusion.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: Option<&str>) -> String {
    match key.map(str::trim) {
        None => "<unset>".to_string(),
        Some("") => "<empty>".to_string(),
        Some(key) => match key.split_once('-') {
            Some((prefix, _)) => format!("{prefix}-***"),
            None => "<redacted>".to_string(),
        },
    }
}
