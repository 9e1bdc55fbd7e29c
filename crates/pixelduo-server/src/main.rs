//! PixelDuo relay server entry point.

use std::sync::Arc;

use clap::Parser;
use pixelduo_server::{router, RoomRegistry, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixelduo_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    let registry = Arc::new(RoomRegistry::new());
    let app = router(registry);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("PixelDuo relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    info!("Rooms are created when the first member joins");

    axum::serve(listener, app).await
}
