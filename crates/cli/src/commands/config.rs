use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use intake_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

impl Field {
    fn new(key: &'static str, env_key: &'static str, value: impl Into<String>) -> Self {
        Self { key, env_key, value: value.into() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let database = &config.database;
    let whatsapp = &config.whatsapp;
    let llm = &config.llm;
    let server = &config.server;
    let automation = &config.automation;

    vec![
        Field::new("database.url", "INTAKE_DATABASE_URL", &database.url),
        Field::new(
            "database.max_connections",
            "INTAKE_DATABASE_MAX_CONNECTIONS",
            database.max_connections.to_string(),
        ),
        Field::new(
            "database.timeout_secs",
            "INTAKE_DATABASE_TIMEOUT_SECS",
            database.timeout_secs.to_string(),
        ),
        Field::new(
            "whatsapp.access_token",
            "INTAKE_WHATSAPP_ACCESS_TOKEN",
            redact_token(whatsapp.access_token.expose_secret()),
        ),
        Field::new(
            "whatsapp.phone_number_id",
            "INTAKE_WHATSAPP_PHONE_NUMBER_ID",
            &whatsapp.phone_number_id,
        ),
        Field::new(
            "whatsapp.verify_token",
            "INTAKE_WHATSAPP_VERIFY_TOKEN",
            redact_token(whatsapp.verify_token.expose_secret()),
        ),
        Field::new(
            "whatsapp.app_secret",
            "INTAKE_WHATSAPP_APP_SECRET",
            redact_optional(whatsapp.app_secret.as_ref()),
        ),
        Field::new("whatsapp.api_base_url", "INTAKE_WHATSAPP_API_BASE_URL", &whatsapp.api_base_url),
        Field::new("whatsapp.api_version", "INTAKE_WHATSAPP_API_VERSION", &whatsapp.api_version),
        Field::new("llm.provider", "INTAKE_LLM_PROVIDER", format!("{:?}", llm.provider)),
        Field::new("llm.model", "INTAKE_LLM_MODEL", &llm.model),
        Field::new(
            "llm.base_url",
            "INTAKE_LLM_BASE_URL",
            llm.base_url.as_deref().unwrap_or("<unset>"),
        ),
        Field::new("llm.api_key", "INTAKE_LLM_API_KEY", redact_optional(llm.api_key.as_ref())),
        Field::new("llm.timeout_secs", "INTAKE_LLM_TIMEOUT_SECS", llm.timeout_secs.to_string()),
        Field::new("server.bind_address", "INTAKE_SERVER_BIND_ADDRESS", &server.bind_address),
        Field::new("server.port", "INTAKE_SERVER_PORT", server.port.to_string()),
        Field::new(
            "server.graceful_shutdown_secs",
            "INTAKE_SERVER_GRACEFUL_SHUTDOWN_SECS",
            server.graceful_shutdown_secs.to_string(),
        ),
        Field::new(
            "server.media_root",
            "INTAKE_SERVER_MEDIA_ROOT",
            server.media_root.display().to_string(),
        ),
        Field::new(
            "server.admin_token",
            "INTAKE_SERVER_ADMIN_TOKEN",
            redact_optional(server.admin_token.as_ref()),
        ),
        Field::new(
            "business.agent_phone_number",
            "INTAKE_BUSINESS_AGENT_PHONE_NUMBER",
            &config.business.agent_phone_number,
        ),
        Field::new("automation.enabled", "INTAKE_AUTOMATION_ENABLED", automation.enabled.to_string()),
        Field::new(
            "automation.webhook_url",
            "INTAKE_AUTOMATION_WEBHOOK_URL",
            automation.webhook_url.as_deref().unwrap_or("<unset>"),
        ),
        Field::new(
            "dialogue.apply_budget_suffix",
            "INTAKE_DIALOGUE_APPLY_BUDGET_SUFFIX",
            config.dialogue.apply_budget_suffix.to_string(),
        ),
        Field::new(
            "dialogue.record_budget_interactions",
            "INTAKE_DIALOGUE_RECORD_BUDGET_INTERACTIONS",
            config.dialogue.record_budget_interactions.to_string(),
        ),
        Field::new("logging.level", "INTAKE_LOGGING_LEVEL", &config.logging.level),
        Field::new("logging.format", "INTAKE_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |current, key| current.get(key)).is_some()
}

/// Keeps a short prefix of long tokens so operators can tell them apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.get(..4) {
        Some(prefix) if trimmed.len() > 12 => format!("{prefix}***"),
        _ => "<redacted>".to_string(),
    }
}

fn redact_optional(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) => redact_token(secret.expose_secret()),
        None => "<unset>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token};

    #[test]
    fn redaction_keeps_only_a_short_prefix() {
        assert_eq!(redact_token("EAAGm0PX4ZCpsBAKZCqX"), "EAAG***");
        assert_eq!(redact_token("short"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: Value = "[whatsapp]\nphone_number_id = \"1\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "whatsapp.phone_number_id"));
        assert!(!contains_path(&doc, "whatsapp.access_token"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}
