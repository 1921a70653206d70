use std::sync::Arc;

use bookly_agent::{BookingAgent, SessionStore};
use bookly_calendar::{CalendarClient, CalendarError, GoogleCalendarClient};
use bookly_core::config::{AppConfig, ConfigError, LoadOptions};
use bookly_llm::{HttpLlmClient, LlmClient, LlmError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub sessions: Arc<SessionStore>,
    pub agent: Arc<BookingAgent>,
    pub calendar: Arc<dyn CalendarClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("calendar client initialization failed: {0}")]
    Calendar(#[source] CalendarError),
    #[error("llm client initialization failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let calendar: Arc<dyn CalendarClient> = Arc::new(
        GoogleCalendarClient::new(config.calendar.clone()).map_err(BootstrapError::Calendar)?,
    );
    let llm: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::new(config.llm.clone()).map_err(BootstrapError::Llm)?);

    let agent = Arc::new(BookingAgent::new(llm, calendar.clone(), &config.agent));
    let sessions = Arc::new(SessionStore::new(config.agent.history_limit));

    info!(
        event_name = "system.bootstrap.ready",
        llm_provider = ?config.llm.provider,
        calendar_id = %config.calendar.calendar_id,
        "clients initialized"
    );

    Ok(Application { config, sessions, agent, calendar })
}

#[cfg(test)]
mod tests {
    use bookly_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn calendar_overrides() -> ConfigOverrides {
        ConfigOverrides {
            calendar_client_id: Some("client-id.apps.googleusercontent.com".to_string()),
            calendar_client_secret: Some("client-secret".to_string()),
            calendar_refresh_token: Some("refresh-token".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_calendar_credentials() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                calendar_client_id: Some("client-id.apps.googleusercontent.com".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("missing secret should fail validation").to_string();
        assert!(message.contains("calendar.client_secret"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_succeeds_with_valid_overrides() {
        let app = bootstrap(LoadOptions {
            overrides: calendar_overrides(),
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with full credentials");

        assert_eq!(app.sessions.len().await, 0);
        assert_eq!(app.config.calendar.calendar_id, "primary");
    }
}
