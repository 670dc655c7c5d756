use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ragbot::core;
use ragbot::core::config::AppPaths;
use ragbot::server;
use ragbot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    core::logging::init(&paths);

    let state = AppState::initialize(paths)
        .await
        .context("Failed to initialize application state")?;

    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("RAGBOT_ADDR={}", addr);
    tracing::info!("Listening on {}", addr);
    tracing::info!("Uploads are stored in {}", state.paths.upload_dir.display());

    let app: Router = server::router::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
