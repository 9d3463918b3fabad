use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_CANDIDATES: &[&str] = &["intake.toml", "config/intake.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub whatsapp: WhatsAppConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub business: BusinessConfig,
    pub automation: AutomationConfig,
    pub dialogue: DialogueConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub access_token: SecretString,
    pub phone_number_id: String,
    pub verify_token: SecretString,
    pub app_secret: Option<SecretString>,
    pub api_base_url: String,
    pub api_version: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    /// Provider endpoint override; each provider has its own default.
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub media_root: PathBuf,
    /// Bearer token for the listing admin API. The create route is not
    /// mounted without one.
    pub admin_token: Option<SecretString>,
}

/// Contact details and promotional links quoted in customer replies.
#[derive(Clone, Debug)]
pub struct BusinessConfig {
    pub agent_phone_number: String,
    pub whatsapp_channel_link: String,
    pub instagram_link: String,
}

#[derive(Clone, Debug)]
pub struct AutomationConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogueConfig {
    /// Scale `k`/`m` budget suffixes by a thousand/million.
    pub apply_budget_suffix: bool,
    /// Record a `budget_sharing` interaction when a budget is saved.
    pub record_budget_interactions: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub whatsapp_access_token: Option<String>,
    pub whatsapp_phone_number_id: Option<String>,
    pub whatsapp_verify_token: Option<String>,
    pub media_root: Option<PathBuf>,
    pub automation_enabled: Option<bool>,
    pub automation_webhook_url: Option<String>,
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
                url: "sqlite://intake.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            whatsapp: WhatsAppConfig {
                access_token: String::new().into(),
                phone_number_id: String::new(),
                verify_token: String::new().into(),
                app_secret: None,
                api_base_url: "https://graph.facebook.com".to_string(),
                api_version: "v18.0".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                media_root: PathBuf::from("media"),
                admin_token: None,
            },
            business: BusinessConfig {
                agent_phone_number: String::new(),
                whatsapp_channel_link: String::new(),
                instagram_link: String::new(),
            },
            automation: AutomationConfig { enabled: false, webhook_url: None },
            dialogue: DialogueConfig::default(),
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
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|ollama)"
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("intake.toml"));
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

        if let Some(whatsapp) = patch.whatsapp {
            if let Some(access_token) = whatsapp.access_token {
                self.whatsapp.access_token = secret_value(access_token);
            }
            if let Some(phone_number_id) = whatsapp.phone_number_id {
                self.whatsapp.phone_number_id = phone_number_id;
            }
            if let Some(verify_token) = whatsapp.verify_token {
                self.whatsapp.verify_token = secret_value(verify_token);
            }
            if let Some(app_secret) = whatsapp.app_secret {
                self.whatsapp.app_secret = Some(secret_value(app_secret));
            }
            if let Some(api_base_url) = whatsapp.api_base_url {
                self.whatsapp.api_base_url = api_base_url;
            }
            if let Some(api_version) = whatsapp.api_version {
                self.whatsapp.api_version = api_version;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
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
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(media_root) = server.media_root {
                self.server.media_root = media_root;
            }
            if let Some(admin_token) = server.admin_token {
                self.server.admin_token = Some(secret_value(admin_token));
            }
        }

        if let Some(business) = patch.business {
            if let Some(agent_phone_number) = business.agent_phone_number {
                self.business.agent_phone_number = agent_phone_number;
            }
            if let Some(whatsapp_channel_link) = business.whatsapp_channel_link {
                self.business.whatsapp_channel_link = whatsapp_channel_link;
            }
            if let Some(instagram_link) = business.instagram_link {
                self.business.instagram_link = instagram_link;
            }
        }

        if let Some(automation) = patch.automation {
            if let Some(enabled) = automation.enabled {
                self.automation.enabled = enabled;
            }
            if let Some(webhook_url) = automation.webhook_url {
                self.automation.webhook_url = Some(webhook_url);
            }
        }

        if let Some(dialogue) = patch.dialogue {
            if let Some(apply_budget_suffix) = dialogue.apply_budget_suffix {
                self.dialogue.apply_budget_suffix = apply_budget_suffix;
            }
            if let Some(record_budget_interactions) = dialogue.record_budget_interactions {
                self.dialogue.record_budget_interactions = record_budget_interactions;
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
        if let Some(value) = read_env("INTAKE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("INTAKE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("INTAKE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("INTAKE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("INTAKE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("INTAKE_WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = secret_value(value);
        }
        if let Some(value) = read_env("INTAKE_WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = value;
        }
        if let Some(value) = read_env("INTAKE_WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = secret_value(value);
        }
        if let Some(value) = read_env("INTAKE_WHATSAPP_APP_SECRET") {
            self.whatsapp.app_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("INTAKE_WHATSAPP_API_BASE_URL") {
            self.whatsapp.api_base_url = value;
        }
        if let Some(value) = read_env("INTAKE_WHATSAPP_API_VERSION") {
            self.whatsapp.api_version = value;
        }

        if let Some(value) = read_env("INTAKE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("INTAKE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("INTAKE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("INTAKE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("INTAKE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("INTAKE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("INTAKE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("INTAKE_SERVER_PORT") {
            self.server.port = parse_u16("INTAKE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("INTAKE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("INTAKE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("INTAKE_SERVER_MEDIA_ROOT") {
            self.server.media_root = PathBuf::from(value);
        }
        if let Some(value) = read_env("INTAKE_SERVER_ADMIN_TOKEN") {
            self.server.admin_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("INTAKE_BUSINESS_AGENT_PHONE_NUMBER") {
            self.business.agent_phone_number = value;
        }
        if let Some(value) = read_env("INTAKE_BUSINESS_WHATSAPP_CHANNEL_LINK") {
            self.business.whatsapp_channel_link = value;
        }
        if let Some(value) = read_env("INTAKE_BUSINESS_INSTAGRAM_LINK") {
            self.business.instagram_link = value;
        }

        if let Some(value) = read_env("INTAKE_AUTOMATION_ENABLED") {
            self.automation.enabled = parse_bool("INTAKE_AUTOMATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("INTAKE_AUTOMATION_WEBHOOK_URL") {
            self.automation.webhook_url = Some(value);
        }

        if let Some(value) = read_env("INTAKE_DIALOGUE_APPLY_BUDGET_SUFFIX") {
            self.dialogue.apply_budget_suffix =
                parse_bool("INTAKE_DIALOGUE_APPLY_BUDGET_SUFFIX", &value)?;
        }
        if let Some(value) = read_env("INTAKE_DIALOGUE_RECORD_BUDGET_INTERACTIONS") {
            self.dialogue.record_budget_interactions =
                parse_bool("INTAKE_DIALOGUE_RECORD_BUDGET_INTERACTIONS", &value)?;
        }

        let log_level = read_env("INTAKE_LOGGING_LEVEL").or_else(|| read_env("INTAKE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("INTAKE_LOGGING_FORMAT").or_else(|| read_env("INTAKE_LOG_FORMAT"));
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
        if let Some(access_token) = overrides.whatsapp_access_token {
            self.whatsapp.access_token = secret_value(access_token);
        }
        if let Some(phone_number_id) = overrides.whatsapp_phone_number_id {
            self.whatsapp.phone_number_id = phone_number_id;
        }
        if let Some(verify_token) = overrides.whatsapp_verify_token {
            self.whatsapp.verify_token = secret_value(verify_token);
        }
        if let Some(media_root) = overrides.media_root {
            self.server.media_root = media_root;
        }
        if let Some(enabled) = overrides.automation_enabled {
            self.automation.enabled = enabled;
        }
        if let Some(webhook_url) = overrides.automation_webhook_url {
            self.automation.webhook_url = Some(webhook_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_whatsapp(&self.whatsapp)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_automation(&self.automation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.iter().map(PathBuf::from).find(|path| path.exists())
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

fn validate_whatsapp(whatsapp: &WhatsAppConfig) -> Result<(), ConfigError> {
    if whatsapp.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "whatsapp.access_token is required. Get it from Meta for Developers > Your App > WhatsApp > API Setup".to_string(),
        ));
    }

    let phone_number_id = whatsapp.phone_number_id.trim();
    if phone_number_id.is_empty() {
        return Err(ConfigError::Validation(
            "whatsapp.phone_number_id is required (the sender phone number ID, not the phone number itself)".to_string(),
        ));
    }
    if !phone_number_id.chars().all(|c| c.is_ascii_digit()) {
        let hint = if phone_number_id.starts_with('+') {
            " (hint: you may have used the phone number instead of its ID)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "whatsapp.phone_number_id must be numeric{hint}"
        )));
    }

    if whatsapp.verify_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "whatsapp.verify_token is required to answer the webhook verification handshake"
                .to_string(),
        ));
    }

    let base_url = whatsapp.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "whatsapp.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for gemini/openai providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {}
    }

    if let Some(base_url) = llm.base_url.as_deref().map(str::trim) {
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

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.media_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation("server.media_root must not be empty".to_string()));
    }

    if server.admin_token.as_ref().is_some_and(|token| token.expose_secret().trim().is_empty()) {
        return Err(ConfigError::Validation(
            "server.admin_token must not be blank when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_automation(automation: &AutomationConfig) -> Result<(), ConfigError> {
    if !automation.enabled {
        return Ok(());
    }

    match automation.webhook_url.as_deref().map(str::trim) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
        Some(_) => Err(ConfigError::Validation(
            "automation.webhook_url must start with http:// or https://".to_string(),
        )),
        None => Err(ConfigError::Validation(
            "automation.enabled is true but automation.webhook_url is not configured".to_string(),
        )),
    }
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
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    whatsapp: Option<WhatsAppPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    business: Option<BusinessPatch>,
    automation: Option<AutomationPatch>,
    dialogue: Option<DialoguePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppPatch {
    access_token: Option<String>,
    phone_number_id: Option<String>,
    verify_token: Option<String>,
    app_secret: Option<String>,
    api_base_url: Option<String>,
    api_version: Option<String>,
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
    graceful_shutdown_secs: Option<u64>,
    media_root: Option<PathBuf>,
    admin_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BusinessPatch {
    agent_phone_number: Option<String>,
    whatsapp_channel_link: Option<String>,
    instagram_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AutomationPatch {
    enabled: Option<bool>,
    webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DialoguePatch {
    apply_budget_suffix: Option<bool>,
    record_budget_interactions: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
