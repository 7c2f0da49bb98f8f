use axum::{Json, Router, http::StatusCode, routing::get};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::broadcast};

use crate::{
    api::routes,
    config::ServerConfig,
    error::{StreamError, StreamResult},
    state::AppState,
    websocket::handler,
};

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(30);

pub struct Server {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(&config));
        Self { state, config }
    }

    /// Uses a prebuilt state, e.g. one with a custom message source.
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        let mut app = Router::new()
            .route("/ws", get(handler::ws_handler))
            .with_state(self.state.clone());

        if self.state.admin_token.is_some() {
            app = app.merge(routes::configure_api_routes(self.state.clone()));
        } else {
            tracing::warn!("no admin token configured, admin routes disabled");
        }

        app.fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "NOT_FOUND" })),
            )
        })
    }

    /// Binds all interfaces on the configured port and serves until Ctrl-C.
    pub async fn run(self) -> StreamResult<()> {
        let url = format!("0.0.0.0:{}", self.config.port);
        let listener = TcpListener::bind(&url).await?;
        tracing::info!(addr = %url, "listening");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` with the broadcast engine and housekeeping
    /// running alongside, until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> StreamResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, _) = broadcast::channel(1);

        let engine = tokio::spawn(self.state.engine.clone().run(shutdown_tx.subscribe()));
        let housekeeping = tokio::spawn(housekeeping(
            self.state.clone(),
            self.config.idle_timeout,
            shutdown_tx.subscribe(),
        ));

        let app = self.router();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        let _ = shutdown_tx.send(());
        let _ = engine.await;
        let _ = housekeeping.await;
        tracing::info!("server stopped");

        result.map_err(StreamError::from)
    }
}

/// Sweeps idle clients (when an idle timeout is set) and prunes expired
/// rate-limit windows.
async fn housekeeping(
    state: Arc<AppState>,
    idle_timeout: Option<Duration>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let period = idle_timeout
        .map(|timeout| (timeout / 2).max(Duration::from_millis(250)))
        .unwrap_or(HOUSEKEEPING_INTERVAL);
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(timeout) = idle_timeout {
                    let swept = state.registry.sweep_idle(timeout).await;
                    if !swept.is_empty() {
                        tracing::info!(count = swept.len(), "swept idle clients");
                    }
                }
                state.rate_limiter.prune().await;
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
