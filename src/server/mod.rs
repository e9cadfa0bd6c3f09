//! HTTP backend exposing the AI services.

mod extract;
mod middleware;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServiceError;
use crate::openrouter::{ChatCompletion, OpenRouterClient};
use crate::services::{LearningPathService, QaService, SummarizationService};

pub use extract::ValidatedJson;
pub use middleware::{ALLOWED_ORIGINS, PROCESS_TIME_HEADER, cors, log_requests};

/// Shared per-process state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub summarization: Arc<SummarizationService>,
    pub qa: Arc<QaService>,
    pub learning_path: Arc<LearningPathService>,
    pub api_key_configured: bool,
}

impl AppState {
    pub fn new(client: Arc<dyn ChatCompletion>, api_key_configured: bool) -> Self {
        Self {
            summarization: Arc::new(SummarizationService::new(client.clone())),
            qa: Arc::new(QaService::new(client.clone())),
            learning_path: Arc::new(LearningPathService::new(client)),
            api_key_configured,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ServiceError> {
        let client = OpenRouterClient::new(
            config.api_key().map(str::to_string),
            &config.openrouter_base_url,
            &config.model,
        )?;
        if !client.has_api_key() {
            warn!("OPENAI_API_KEY is not configured; AI endpoints will fail until it is set");
        }
        Ok(Self::new(Arc::new(client), config.api_key_configured()))
    }
}

pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(axum::middleware::from_fn(cors))
        .layer(axum::middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serves `app` on an already bound listener until ctrl-c.
pub async fn run(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[tracing::instrument(skip(config))]
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::from_config(&config).context("Failed to configure services")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "AI Microservices API listening on http://{} (model {})",
        addr, config.model
    );
    run(listener, state).await.context("Server error")
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires; never resolves if it cannot be installed.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            error!("Failed to listen for ctrl-c, graceful shutdown disabled: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
