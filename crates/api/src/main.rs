use std::sync::Arc;

use convo_api::{build_router, state::AppState};
use convo_config::{Settings, StoreBackend};
use convo_db::{DocumentStore, MemoryStore, MongoStore};
use convo_services::trigger::TriggerDispatcher;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    let capacity = settings.triggers.channel_capacity;

    let mut background: Vec<JoinHandle<()>> = Vec::new();

    let store: Arc<dyn DocumentStore> = match settings.database.backend {
        StoreBackend::Mongo => {
            let db = convo_db::connect(&settings.database).await?;
            convo_db::indexes::ensure_indexes(&db).await?;
            let store = MongoStore::new(&db, capacity);
            if settings.triggers.watch_changes {
                background.push(store.spawn_change_stream());
            }
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory document store, data is lost on exit");
            Arc::new(MemoryStore::new(capacity))
        }
    };

    if settings.trigger_has_no_source() {
        warn!(
            "Write trigger enabled without a change stream; only \
             POST /api/trigger deliveries will reach it"
        );
    }

    let state = AppState::new(&settings, store);

    if settings.triggers.enabled {
        let dispatcher = TriggerDispatcher::new(state.empty_conversations.clone());
        background.push(dispatcher.spawn(state.store.changes()));
    }

    let app = build_router(state);
    let listener = TcpListener::bind((settings.app.host.as_str(), settings.app.port)).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in background {
        task.abort();
    }
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(%e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(%e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
