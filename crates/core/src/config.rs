use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub calendar: CalendarConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub calendar_id: String,
    pub events_window_days: i64,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub history_limit: usize,
    pub default_duration_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
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
    Anthropic,
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
    pub calendar_client_id: Option<String>,
    pub calendar_client_secret: Option<String>,
    pub calendar_refresh_token: Option<String>,
    pub calendar_id: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
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
            calendar: CalendarConfig {
                client_id: String::new(),
                client_secret: String::new().into(),
                refresh_token: String::new().into(),
                calendar_id: "primary".to_string(),
                events_window_days: 7,
                timeout_secs: 15,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            agent: AgentConfig { history_limit: 12, default_duration_minutes: 30 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
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
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bookly.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(calendar) = patch.calendar {
            if let Some(client_id) = calendar.client_id {
                self.calendar.client_id = client_id;
            }
            if let Some(calendar_client_secret_value) = calendar.client_secret {
                self.calendar.client_secret = secret_value(calendar_client_secret_value);
            }
            if let Some(calendar_refresh_token_value) = calendar.refresh_token {
                self.calendar.refresh_token = secret_value(calendar_refresh_token_value);
            }
            if let Some(calendar_id) = calendar.calendar_id {
                self.calendar.calendar_id = calendar_id;
            }
            if let Some(events_window_days) = calendar.events_window_days {
                self.calendar.events_window_days = events_window_days;
            }
            if let Some(timeout_secs) = calendar.timeout_secs {
                self.calendar.timeout_secs = timeout_secs;
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
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(history_limit) = agent.history_limit {
                self.agent.history_limit = history_limit;
            }
            if let Some(default_duration_minutes) = agent.default_duration_minutes {
                self.agent.default_duration_minutes = default_duration_minutes;
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
        if let Some(value) = read_env("BOOKLY_CALENDAR_CLIENT_ID") {
            self.calendar.client_id = value;
        }
        if let Some(value) = read_env("BOOKLY_CALENDAR_CLIENT_SECRET") {
            self.calendar.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("BOOKLY_CALENDAR_REFRESH_TOKEN") {
            self.calendar.refresh_token = secret_value(value);
        }
        if let Some(value) = read_env("BOOKLY_CALENDAR_ID") {
            self.calendar.calendar_id = value;
        }
        if let Some(value) = read_env("BOOKLY_CALENDAR_EVENTS_WINDOW_DAYS") {
            self.calendar.events_window_days =
                parse_i64("BOOKLY_CALENDAR_EVENTS_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("BOOKLY_CALENDAR_TIMEOUT_SECS") {
            self.calendar.timeout_secs = parse_u64("BOOKLY_CALENDAR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKLY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("BOOKLY_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("BOOKLY_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("BOOKLY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("BOOKLY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("BOOKLY_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOKLY_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("BOOKLY_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("BOOKLY_AGENT_HISTORY_LIMIT") {
            self.agent.history_limit = parse_usize("BOOKLY_AGENT_HISTORY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("BOOKLY_AGENT_DEFAULT_DURATION_MINUTES") {
            self.agent.default_duration_minutes =
                parse_i64("BOOKLY_AGENT_DEFAULT_DURATION_MINUTES", &value)?;
        }

        if let Some(value) = read_env("BOOKLY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BOOKLY_SERVER_PORT") {
            self.server.port = parse_u16("BOOKLY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("BOOKLY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BOOKLY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("BOOKLY_LOGGING_LEVEL").or_else(|| read_env("BOOKLY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BOOKLY_LOGGING_FORMAT").or_else(|| read_env("BOOKLY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(client_id) = overrides.calendar_client_id {
            self.calendar.client_id = client_id;
        }
        if let Some(client_secret) = overrides.calendar_client_secret {
            self.calendar.client_secret = secret_value(client_secret);
        }
        if let Some(refresh_token) = overrides.calendar_refresh_token {
            self.calendar.refresh_token = secret_value(refresh_token);
        }
        if let Some(calendar_id) = overrides.calendar_id {
            self.calendar.calendar_id = calendar_id;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_calendar(&self.calendar)?;
        validate_llm(&self.llm)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bookly.toml"), PathBuf::from("config/bookly.toml")]
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

fn validate_calendar(calendar: &CalendarConfig) -> Result<(), ConfigError> {
    if calendar.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "calendar.client_id is required. Create OAuth credentials in the Google Cloud console and enable the Calendar API".to_string(),
        ));
    }
    if calendar.client_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "calendar.client_secret is required alongside calendar.client_id".to_string(),
        ));
    }
    if calendar.refresh_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "calendar.refresh_token is required. Grant the app calendar access once to obtain it"
                .to_string(),
        ));
    }
    if calendar.calendar_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "calendar.calendar_id must not be empty (use `primary` for the account's default calendar)"
                .to_string(),
        ));
    }
    if calendar.events_window_days <= 0 || calendar.events_window_days > 365 {
        return Err(ConfigError::Validation(
            "calendar.events_window_days must be in range 1..=365".to_string(),
        ));
    }
    if calendar.timeout_secs == 0 || calendar.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "calendar.timeout_secs must be in range 1..=120".to_string(),
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
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
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
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.history_limit == 0 {
        return Err(ConfigError::Validation(
            "agent.history_limit must be greater than zero".to_string(),
        ));
    }
    if agent.default_duration_minutes <= 0 || agent.default_duration_minutes > 24 * 60 {
        return Err(ConfigError::Validation(
            "agent.default_duration_minutes must be in range 1..=1440".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    calendar: Option<CalendarPatch>,
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    calendar_id: Option<String>,
    events_window_days: Option<i64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    history_limit: Option<usize>,
    default_duration_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            calendar_client_id: Some("client-id".to_string()),
            calendar_client_secret: Some("client-secret".to_string()),
            calendar_refresh_token: Some("refresh-token".to_string()),
            calendar_id: Some("team@example.com".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn defaults_fail_fast_without_calendar_credentials() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            ..LoadOptions::default()
        })
        .expect_err("missing credentials must be rejected at startup");

        let message = error.to_string();
        assert!(message.contains("calendar.client_id"), "unexpected diagnostic: {message}");
    }

    #[test]
    fn overrides_satisfy_validation() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: valid_overrides(),
            ..LoadOptions::default()
        })
        .expect("valid overrides should load");

        assert_eq!(config.calendar.calendar_id, "team@example.com");
        assert_eq!(config.calendar.client_secret.expose_secret(), "client-secret");
        // Ollama default needs no api key.
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
    }

    #[test]
    fn hosted_provider_requires_api_key() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::OpenAi),
                ..valid_overrides()
            },
            ..LoadOptions::default()
        })
        .expect_err("openai without api key must fail");

        assert!(error.to_string().contains("llm.api_key"));
    }

    #[test]
    fn config_file_patch_is_applied() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[calendar]
client_id = "file-client"
client_secret = "file-secret"
refresh_token = "file-token"
calendar_id = "ops@example.com"
events_window_days = 14

[llm]
provider = "anthropic"
api_key = "sk-ant-test"
model = "claude-sonnet"

[server]
port = 9100

[logging]
level = "debug"
format = "json"
"#
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect("file-backed config should load");

        assert_eq!(config.calendar.client_id, "file-client");
        assert_eq!(config.calendar.events_window_days, 14);
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.model, "claude-sonnet");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn required_file_missing_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("definitely-missing.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing required file");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn interpolation_rejects_unterminated_expression() {
        let error = super::interpolate_env_vars("token = \"${UNTERMINATED")
            .expect_err("unterminated interpolation");
        assert!(matches!(error, ConfigError::UnterminatedInterpolation));
    }

    #[test]
    fn interpolation_substitutes_known_variables() {
        std::env::set_var("BOOKLY_TEST_INTERP_VALUE", "swapped");
        let output = super::interpolate_env_vars("id = \"${BOOKLY_TEST_INTERP_VALUE}\"")
            .expect("interpolation should succeed");
        assert_eq!(output, "id = \"swapped\"");
        std::env::remove_var("BOOKLY_TEST_INTERP_VALUE");
    }

    #[test]
    fn provider_parsing_accepts_known_names_only() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("bard".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let mut config = AppConfig::default();
        config.calendar.client_id = "x".into();
        config.calendar.client_secret = "y".to_string().into();
        config.calendar.refresh_token = "z".to_string().into();
        config.agent.default_duration_minutes = 0;

        let error = config.validate().expect_err("zero duration must fail");
        assert!(error.to_string().contains("default_duration_minutes"));
    }
}
