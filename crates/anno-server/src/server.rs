use std::sync::Arc;

use anno_store::{InMemoryKvStore, KvStore, LogConfig, LogKvStore};
use tokio::net::TcpListener;

use crate::config::{ServerConfig, StorageConfig};
use crate::error::ServerResult;
use crate::router::build_router;
use crate::service::AnnotationService;

/// Open the key-value backend named by the configuration.
pub fn open_store(config: &StorageConfig) -> ServerResult<Arc<dyn KvStore>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryKvStore::new())),
        StorageConfig::Log { path, sync } => {
            let store = LogKvStore::open(path, LogConfig { sync_mode: *sync })?;
            tracing::info!(path = %path.display(), keys = store.len(), "opened store log");
            Ok(Arc::new(store))
        }
    }
}

/// Annotation server.
pub struct AnnoServer {
    config: ServerConfig,
    service: Arc<AnnotationService>,
}

impl AnnoServer {
    /// Open the configured store and wire the service to it.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = open_store(&config.storage)?;
        Ok(Self::with_store(config, store))
    }

    /// Serve from an already opened store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            config,
            service: Arc::new(AnnotationService::new(store)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<AnnotationService> {
        &self.service
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.service), &self.config)
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("anno server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("anno server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
