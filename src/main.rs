//! e4s-index service entry point: loads `e4s.toml`, builds the engine over
//! the configured backends, and serves the HTTP surface from `e4s-api`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use e4s_api::{build_router, AppState};
use e4s_core::config::{E4sConfig, CONFIG_FILE_NAME};
use e4s_engine::IndexEngine;
use e4s_storage::{InMemoryKvStore, KvStoreClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("e4s_index=info")))
        .init();

    let config_path = std::env::var("E4S_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME));
    E4sConfig::write_default_if_missing(&config_path)?;
    let config = E4sConfig::from_file(&config_path)?;
    tracing::info!(path = %config_path.display(), "loaded configuration");

    let kv: Arc<dyn KvStoreClient> = build_kv_store()?;
    let durable = build_durable_store(&config)?;

    let engine = IndexEngine::new(&config, kv, durable);
    let state = AppState::new(engine);
    let app = build_router(state);

    let addr = std::env::var("E4S_LISTEN_ADDR")
        .ok()
        .and_then(|s| s.parse::<SocketAddr>().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 7420)));
    tracing::info!(%addr, "e4s-index listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(not(feature = "redis-backend"))]
fn build_kv_store() -> anyhow::Result<Arc<dyn KvStoreClient>> {
    Ok(Arc::new(InMemoryKvStore::new()))
}

#[cfg(feature = "redis-backend")]
fn build_kv_store() -> anyhow::Result<Arc<dyn KvStoreClient>> {
    match std::env::var("E4S_REDIS_URL") {
        Ok(url) => Ok(Arc::new(e4s_storage::RedisKvStore::connect(&url)?)),
        Err(_) => Ok(Arc::new(InMemoryKvStore::new())),
    }
}

#[cfg(not(feature = "sqlite-backend"))]
fn build_durable_store(
    config: &E4sConfig,
) -> anyhow::Result<Option<Arc<dyn e4s_durability::DurableStoreClient>>> {
    if config.index.persistence.enabled {
        tracing::warn!(
            "index.persistence.enabled is true but this binary was built without the \
             sqlite-backend feature; falling back to the in-memory durable store"
        );
        return Ok(Some(Arc::new(e4s_durability::MemoryDurableStore::new())));
    }
    Ok(None)
}

#[cfg(feature = "sqlite-backend")]
fn build_durable_store(
    config: &E4sConfig,
) -> anyhow::Result<Option<Arc<dyn e4s_durability::DurableStoreClient>>> {
    if !config.index.persistence.enabled {
        return Ok(None);
    }
    let path = std::env::var("E4S_SQLITE_PATH").unwrap_or_else(|_| "e4s_index.sqlite3".to_string());
    let store = e4s_durability::SqliteDurableStore::open(&path)?;
    Ok(Some(Arc::new(store)))
}
