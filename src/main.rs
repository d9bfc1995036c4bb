//! Jukebox Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox_back::{
    config::AppConfig,
    dao::ledger_store::{LedgerStore, memory::MemoryLedgerStore},
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    tokio::spawn(run_storage(app_state.clone()));
    tokio::spawn(jukebox_back::services::change_events::run_degraded_notifier(
        app_state.clone(),
    ));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick a ledger store backend and hand it to the supervisor loop.
///
/// `MEMORY_STORE=1` runs without a database, which is handy for local
/// development and demos; everything lives in process memory and is lost on
/// restart.
async fn run_storage(state: SharedState) {
    if env::var("MEMORY_STORE").is_ok_and(|value| value == "1") {
        info!("using in-memory ledger store (MEMORY_STORE=1)");
        storage_supervisor::run(state, || async {
            Ok(Arc::new(MemoryLedgerStore::new()) as Arc<dyn LedgerStore>)
        })
        .await;
        return;
    }

    #[cfg(feature = "mongo-store")]
    {
        use jukebox_back::dao::ledger_store::mongodb::{MongoConfig, MongoLedgerStore};

        let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
        let db_name = env::var("MONGO_DB").ok();

        storage_supervisor::run(state, move || {
            let uri = uri.clone();
            let db_name = db_name.clone();
            async move {
                let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
                let store = MongoLedgerStore::connect(config).await?;
                Ok(Arc::new(store) as Arc<dyn LedgerStore>)
            }
        })
        .await;
    }

    #[cfg(not(feature = "mongo-store"))]
    {
        info!("no database backend compiled in; falling back to the in-memory store");
        storage_supervisor::run(state, || async {
            Ok(Arc::new(MemoryLedgerStore::new()) as Arc<dyn LedgerStore>)
        })
        .await;
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    jukebox_back::routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
