use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use implodesc_api::config::ServerConfig;
use implodesc_engine::AnalysisEngine;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;
    implodesc_observability::init(&config.log);

    if config.engine.provider.openai_api_key.is_none() && config.engine.provider.anthropic_api_key.is_none() {
        tracing::warn!("no provider API keys configured; analyses use the reference model unless a session supplies keys");
    }

    let engine = Arc::new(AnalysisEngine::new(config.engine.clone()));

    let sweeper = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = engine.sweep_expired() {
                    tracing::error!(error = %e, "session sweep failed");
                }
            }
        })
    };

    let app = implodesc_api::app::build_app(engine);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(address = %listener.local_addr()?, "listening");

    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served.context("server error")
}
