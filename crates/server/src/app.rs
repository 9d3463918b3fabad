use std::path::Path;
use std::sync::Arc;

use axum::Router;
use intake_agent::{DialogueRouter, ListingService};
use intake_db::DbPool;
use secrecy::SecretString;
use tower_http::services::ServeDir;

use crate::{health, properties, webhook};

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub dialogue: Arc<DialogueRouter>,
    pub listings: Arc<ListingService>,
    pub verify_token: SecretString,
    /// When set, inbound webhook bodies must be signed with it.
    pub app_secret: Option<SecretString>,
    /// Bearer token guarding listing creation.
    pub admin_token: Option<SecretString>,
}

pub fn router(state: AppState, db_pool: DbPool, media_root: &Path) -> Router {
    Router::new()
        .merge(webhook::router(state.clone()))
        .merge(properties::router(state))
        .merge(health::router(db_pool))
        .nest_service("/media", ServeDir::new(media_root))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use intake_agent::{
        DetailExtractor, DialogueRouter, IntentClassifier, ListingService, PromptLibrary,
        RecordingNotifier, ScriptedLlm, SentimentExtractor, Stores,
    };
    use intake_core::config::{AppConfig, DialogueConfig};
    use intake_core::{Interaction, InteractionKind};
    use intake_db::demo_listings;
    use intake_db::repositories::{
        CustomerRepository, InteractionRepository,
        InMemoryCustomerRepository, InMemoryInteractionRepository, InMemoryPropertyRepository,
        PropertyRepository,
    };
    use intake_whatsapp::RecordingSender;

    use super::AppState;

    pub const VERIFY_TOKEN: &str = "verify-me";
    pub const ADMIN_TOKEN: &str = "admin-token";

    pub struct TestApp {
        pub state: AppState,
        pub llm: Arc<ScriptedLlm>,
        pub sender: Arc<RecordingSender>,
        pub notifier: Arc<RecordingNotifier>,
        pub customers: Arc<InMemoryCustomerRepository>,
        pub interactions: Arc<InMemoryInteractionRepository>,
    }

    pub async fn test_app(app_secret: Option<&str>) -> TestApp {
        let llm = Arc::new(ScriptedLlm::default());
        let prompts = Arc::new(PromptLibrary::new().expect("templates"));
        let sender = Arc::new(RecordingSender::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let customers = Arc::new(InMemoryCustomerRepository::default());
        let properties = Arc::new(InMemoryPropertyRepository::default());
        let interactions = Arc::new(InMemoryInteractionRepository::default());

        for listing in demo_listings() {
            properties.insert(listing.into_property(&mut rand::thread_rng())).await.expect("seed");
        }

        let stores = Stores {
            customers: customers.clone(),
            properties: properties.clone(),
            interactions: interactions.clone(),
        };
        let dialogue = DialogueRouter::new(
            stores,
            IntentClassifier::new(llm.clone(), prompts.clone()),
            DetailExtractor::new(llm.clone(), prompts.clone()),
            SentimentExtractor::new(llm.clone(), prompts),
            sender.clone(),
            AppConfig::default().business,
            DialogueConfig::default(),
        )
        .expect("router");

        let state = AppState {
            dialogue: Arc::new(dialogue),
            listings: Arc::new(ListingService::new(properties, notifier.clone())),
            verify_token: VERIFY_TOKEN.to_string().into(),
            app_secret: app_secret.map(|secret| secret.to_string().into()),
            admin_token: Some(ADMIN_TOKEN.to_string().into()),
        };

        TestApp { state, llm, sender, notifier, customers, interactions }
    }

    impl TestApp {
        pub async fn latest(&self, phone: &str, kind: InteractionKind) -> Option<Interaction> {
            let customer = self.customers.find_by_phone(phone).await.expect("lookup")?;
            self.interactions.latest_for_customer(&customer.id, kind).await.expect("lookup")
        }
    }
}
