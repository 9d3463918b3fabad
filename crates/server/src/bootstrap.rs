use std::sync::Arc;

use intake_agent::listings::NotifyError;
use intake_agent::prompts::PromptError;
use intake_agent::{
    build_client, DetailExtractor, DialogueError, DialogueRouter, HttpListingNotifier,
    IntentClassifier, ListingNotifier, ListingService, LlmError, NoopNotifier, PromptLibrary,
    SentimentExtractor, Stores,
};
use intake_core::config::{AppConfig, ConfigError, LoadOptions};
use intake_db::repositories::{
    SqlCustomerRepository, SqlInteractionRepository, SqlPropertyRepository,
};
use intake_db::{connect_with_settings, migrations, DbPool};
use intake_whatsapp::{CloudApiSender, SendError};
use thiserror::Error;
use tracing::info;

use crate::app::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("prompt templates failed to load: {0}")]
    Prompts(#[from] PromptError),
    #[error("language model client could not be built: {0}")]
    Llm(#[from] LlmError),
    #[error("messaging client could not be built: {0}")]
    Messaging(#[from] SendError),
    #[error("automation notifier could not be built: {0}")]
    Notifier(#[from] NotifyError),
    #[error("dialogue router could not be built: {0}")]
    Dialogue(#[from] DialogueError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let stores = Stores {
        customers: Arc::new(SqlCustomerRepository::new(db_pool.clone())),
        properties: Arc::new(SqlPropertyRepository::new(db_pool.clone())),
        interactions: Arc::new(SqlInteractionRepository::new(db_pool.clone())),
    };

    let llm = build_client(&config.llm)?;
    let prompts = Arc::new(PromptLibrary::new()?);
    let sender = Arc::new(CloudApiSender::new(&config.whatsapp)?);
    info!(
        event_name = "system.bootstrap.integrations_ready",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        llm_model = %config.llm.model,
        messaging_endpoint = %sender.endpoint(),
        "language model and messaging clients initialized"
    );

    let dialogue = DialogueRouter::new(
        stores.clone(),
        IntentClassifier::new(llm.clone(), prompts.clone()),
        DetailExtractor::new(llm.clone(), prompts.clone()),
        SentimentExtractor::new(llm, prompts),
        sender,
        config.business.clone(),
        config.dialogue.clone(),
    )?;

    let notifier: Arc<dyn ListingNotifier> = match config.automation.webhook_url.as_deref() {
        Some(url) if config.automation.enabled => {
            Arc::new(HttpListingNotifier::new(url, config.server.media_root.clone())?)
        }
        _ => Arc::new(NoopNotifier),
    };
    let listings = ListingService::new(stores.properties.clone(), notifier);

    let state = AppState {
        dialogue: Arc::new(dialogue),
        listings: Arc::new(listings),
        verify_token: config.whatsapp.verify_token.clone(),
        app_secret: config.whatsapp.app_secret.clone(),
        admin_token: config.server.admin_token.clone(),
    };

    Ok(Application { config, db_pool, state })
}
