use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use fraud_scoring_api::{
    app::{self, envy::Envy},
    classifier::{pipeline::PipelineModel, Classifier},
    scoring::service::ScoringService,
    transactions::sink::{PersistenceSink, PgTransactionSink},
    AppState,
};
use tracing_subscriber::EnvFilter;

static PERSISTENCE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // before tracing, the file may set RUST_LOG
    let dotenv = Envy::load_dotenv();

    // tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fraud_scoring_api=info,tower_http=info")),
        )
        .init();

    // environment
    let envy = Envy::load().context("invalid configuration")?;
    tracing::info!(
        app_env = envy.app_env.as_deref().unwrap_or("development"),
        dotenv = ?dotenv,
        "configuration loaded"
    );

    // model
    let model = PipelineModel::load_with_threads(envy.model_path(), envy.model_threads())
        .with_context(|| format!("failed to load model from {}", envy.model_path()))?;
    let model_name = model.name().to_string();

    // persistence
    let sink = PersistenceSink::new(Arc::new(PgTransactionSink::new(
        envy.database_url(),
        envy.database_max_connections,
    )));
    tracing::info!(persistence = %sink.describe(), "persistence configured");
    sink.ensure_schema().await;

    let state = AppState {
        scoring: ScoringService::new(Arc::new(model), sink.clone()),
    };

    // app
    let app = app::router::build(state, &envy);

    let addr = SocketAddr::from(([0, 0, 0, 0], envy.port()));
    tracing::info!(model = %model_name, "listening on {}", addr);

    axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // answered requests may still have rows in flight
    sink.drain(PERSISTENCE_DRAIN_TIMEOUT).await;

    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(%e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("shutdown signal received");
}
