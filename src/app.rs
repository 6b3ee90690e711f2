// 組裝：依設定選擇儲存後端、建立 ViaCEP client、啟動 HTTP 服務

use crate::adapters::{InMemoryStore, SqliteStore, ViaCepClient};
use crate::config::ServiceConfig;
use crate::core::{AddressService, AddressStore};
use crate::http;
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn build_store(config: &ServiceConfig) -> Result<Arc<dyn AddressStore>> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("🗄️  Using SQLite store");
            let store = SqliteStore::connect(url, config.max_connections).await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No database URL configured, using in-memory store (data is not persisted)");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

pub async fn build_service(config: &ServiceConfig) -> Result<Arc<AddressService>> {
    let store = build_store(config).await?;
    let origin = ViaCepClient::new(config.viacep())?;
    tracing::info!(
        "📡 ViaCEP origin: {} (timeout {}s)",
        config.viacep_url,
        config.viacep_timeout_secs
    );
    Ok(Arc::new(AddressService::new(store, Arc::new(origin))))
}

pub async fn serve(config: &ServiceConfig) -> Result<()> {
    let service = build_service(config).await?;
    let router = http::router(service);

    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
