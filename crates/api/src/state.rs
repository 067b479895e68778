use std::sync::Arc;

use convo_config::Settings;
use convo_db::DocumentStore;
use convo_services::SubtreeDeleter;
use convo_services::auth::AuthService;
use convo_services::membership::MembershipService;
use convo_services::trigger::EmptyConversationTrigger;

/// Everything a request handler needs, built once by the process entry point.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<AuthService>,
    pub membership: Arc<MembershipService>,
    pub empty_conversations: Arc<EmptyConversationTrigger>,
}

impl AppState {
    pub fn new(settings: &Settings, store: Arc<dyn DocumentStore>) -> Self {
        let deleter = SubtreeDeleter::new(store.clone(), settings.cleanup.page_size);

        Self {
            auth: Arc::new(AuthService::new(&settings.jwt)),
            membership: Arc::new(MembershipService::new(store.clone(), deleter.clone())),
            empty_conversations: Arc::new(EmptyConversationTrigger::new(store.clone(), deleter)),
            store,
        }
    }
}
