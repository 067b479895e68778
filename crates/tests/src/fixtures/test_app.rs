use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bson::{DateTime, doc};
use convo_api::{build_router, state::AppState};
use convo_config::Settings;
use convo_db::models::{Conversation, Message};
use convo_db::{DocumentRef, DocumentStore, MemoryStore};
use convo_services::trigger::TriggerDispatcher;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running server over a fresh in-memory store, with the write-trigger
/// dispatcher attached.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    tasks: Vec<JoinHandle<()>>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Settings::default()).await
    }

    /// Only the callable path runs; direct writes are never swept.
    pub async fn spawn_without_triggers() -> Self {
        let mut settings = Settings::default();
        settings.triggers.enabled = false;
        Self::spawn_with(settings).await
    }

    pub async fn spawn_with(settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::new(settings.triggers.channel_capacity));
        let state = AppState::new(&settings, store.clone());

        let mut tasks = Vec::new();
        if settings.triggers.enabled {
            tasks.push(
                TriggerDispatcher::new(state.empty_conversations.clone()).spawn(store.changes()),
            );
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tasks.push(tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        }));

        Self {
            addr,
            client: reqwest::Client::new(),
            store,
            state,
            tasks,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token(&self, uid: &str) -> String {
        self.state.auth.issue_token(uid).unwrap()
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
    }

    /// Invokes `delete_conversation` as `uid` (anonymously when `None`).
    pub async fn remove_member(&self, data: Value, uid: Option<&str>) -> (u16, Value) {
        let body = serde_json::json!({ "data": data });
        let request = match uid {
            Some(uid) => self.auth_post("/api/fn/delete_conversation", &self.token(uid)),
            None => self.client.post(self.url("/api/fn/delete_conversation")),
        };

        let resp = request.json(&body).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Creates `conversations/{id}` with `members` and `messages` message
    /// documents beneath it.
    pub async fn seed_conversation(
        &self,
        id: &str,
        members: &[&str],
        messages: usize,
    ) -> DocumentRef {
        let conversation = Conversation::reference(id).unwrap();
        self.store
            .set(&conversation, doc! { "members": members, "title": id })
            .await
            .unwrap();

        let collection = conversation.collection(Message::COLLECTION).unwrap();
        for i in 0..messages {
            let message = Message {
                author_id: members.first().copied().unwrap_or("nobody").to_string(),
                content: format!("message {i}"),
                created_at: DateTime::now(),
            };
            self.store
                .set(
                    &collection.doc(&format!("m{i:04}")).unwrap(),
                    bson::to_document(&message).unwrap(),
                )
                .await
                .unwrap();
        }
        conversation
    }

    pub async fn members(&self, conversation: &DocumentRef) -> Option<Vec<String>> {
        let snapshot = self.store.get(conversation).await.unwrap()?;
        Some(snapshot.decode::<Conversation>().unwrap().member_ids())
    }

    /// Number of stored documents at or beneath `conversation`.
    pub fn subtree_size(&self, conversation: &DocumentRef) -> usize {
        let own = self.store.paths_under(conversation.path());
        own.iter()
            .filter(|path| {
                path.as_str() == conversation.path()
                    || path.starts_with(&format!("{}/", conversation.path()))
            })
            .count()
    }

    /// Polls until nothing is left at or beneath `conversation`.
    pub async fn wait_until_gone(&self, conversation: &DocumentRef) -> bool {
        for _ in 0..200 {
            if self.subtree_size(conversation) == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
